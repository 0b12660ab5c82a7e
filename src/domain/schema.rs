//! Static description of the queryable funding dataset.
//!
//! The descriptor grounds every prompt the pipeline sends. It is built once
//! at startup and shared read-only between requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Text,
    Integer,
    Numeric,
    Boolean,
    Date,
}

impl SemanticType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SemanticType::Text => "TEXT",
            SemanticType::Integer => "INTEGER",
            SemanticType::Numeric => "NUMERIC",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Date => "DATE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub semantic_type: SemanticType,
    pub nullable: bool,
    pub restricted: bool,
    pub primary_key: bool,
}

impl ColumnSchema {
    fn new(name: &str, semantic_type: SemanticType) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            nullable: true,
            restricted: false,
            primary_key: false,
        }
    }

    fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    /// Alternative name the domain uses for the table.
    pub alias: Option<String>,
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub preamble: String,
    pub tables: Vec<TableSchema>,
    pub foreign_keys: Vec<ForeignKey>,
    pub dialect_notes: Vec<String>,
}

impl SchemaDescriptor {
    /// Schema of the startup funding dataset: companies and their funding
    /// rounds ("deals").
    pub fn funding_dataset() -> Self {
        use SemanticType::*;

        let companies = TableSchema {
            name: "companies".to_string(),
            alias: None,
            columns: vec![
                ColumnSchema::new("code", Text).primary_key().restricted(),
                ColumnSchema {
                    nullable: false,
                    ..ColumnSchema::new("title", Text)
                },
                ColumnSchema::new("industry", Text),
                ColumnSchema::new("vertical", Text).restricted(),
                ColumnSchema::new("canton", Text),
                ColumnSchema::new("spin_offs", Text),
                ColumnSchema::new("city", Text),
                ColumnSchema::new("year", Integer),
                ColumnSchema::new("highlights", Text),
                ColumnSchema::new("gender_ceo", Text),
                ColumnSchema::new("oob", Boolean),
                ColumnSchema::new("funded", Boolean),
                ColumnSchema::new("comment", Text),
            ],
        };

        let deals = TableSchema {
            name: "deals".to_string(),
            alias: Some("funding_rounds".to_string()),
            columns: vec![
                ColumnSchema::new("id", Text).primary_key().restricted(),
                ColumnSchema::new("investors", Text),
                ColumnSchema::new("amount", Numeric),
                ColumnSchema::new("valuation", Numeric),
                ColumnSchema::new("comment", Text),
                ColumnSchema::new("url", Text),
                ColumnSchema::new("confidential", Boolean),
                ColumnSchema::new("amount_confidential", Boolean),
                ColumnSchema::new("date_of_the_funding_round", Date),
                ColumnSchema::new("type", Text),
                ColumnSchema::new("phase", Text),
                ColumnSchema::new("canton", Text),
                ColumnSchema::new("company", Text),
                ColumnSchema::new("gender_ceo", Text),
                ColumnSchema::new("company_code", Text).restricted(),
            ],
        };

        Self {
            preamble: "You are working with a startup funding database.".to_string(),
            tables: vec![companies, deals],
            foreign_keys: vec![ForeignKey {
                table: "deals".to_string(),
                column: "company_code".to_string(),
                references_table: "companies".to_string(),
                references_column: "code".to_string(),
            }],
            dialect_notes: vec![
                "Use CURRENT_DATE for current date".to_string(),
                "Use INTERVAL for date arithmetic".to_string(),
                "Example for last 5 years: date_of_the_funding_round >= CURRENT_DATE - INTERVAL '5 years'"
                    .to_string(),
            ],
        }
    }

    /// Names of every column flagged restricted, across all tables.
    pub fn restricted_columns(&self) -> BTreeSet<String> {
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter())
            .filter(|c| c.restricted)
            .map(|c| c.name.clone())
            .collect()
    }

    fn foreign_key_for(&self, table: &str, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.table == table && fk.column == column)
    }

    /// Column annotation as it appears in prompts, e.g. `TEXT (PRIMARY KEY)`.
    pub fn describe_column(&self, table: &str, column: &ColumnSchema) -> String {
        let mut line = format!("{}: {}", column.name, column.semantic_type.as_sql());
        if column.primary_key {
            line.push_str(" (PRIMARY KEY)");
        } else if let Some(fk) = self.foreign_key_for(table, &column.name) {
            let _ = write!(
                line,
                " (Foreign key references {}.{})",
                fk.references_table, fk.references_column
            );
        }
        line
    }

    /// Renders the schema as prompt text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.preamble);
        out.push_str("\n\n");

        for table in &self.tables {
            match &table.alias {
                Some(alias) => {
                    let _ = writeln!(out, "Table: {} ({})", table.name, alias);
                }
                None => {
                    let _ = writeln!(out, "Table: {}", table.name);
                }
            }
            out.push_str("Columns:\n");
            for column in &table.columns {
                let _ = writeln!(out, "- {}", self.describe_column(&table.name, column));
            }
            out.push('\n');
        }

        if !self.dialect_notes.is_empty() {
            out.push_str("Important notes for date handling:\n");
            for note in &self.dialect_notes {
                let _ = writeln!(out, "- {}", note);
            }
        }

        out
    }
}

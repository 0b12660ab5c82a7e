use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One result row: column name to scalar value, in store column order.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_ATTEMPT_BUDGET: u32 = 3;
pub const DEFAULT_MAX_WORDS: u32 = 100;

pub const NO_DATA_EXPLANATION: &str = "No data found to explain.";
pub const NO_DATA_ANSWER: &str = "Unable to provide a specific answer due to lack of data.";

/// Which extraction rule isolated a statement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionRule {
    FencedSqlBlock,
    BacktickStatement,
    BareSelect,
}

impl ExtractionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionRule::FencedSqlBlock => "fenced_sql_block",
            ExtractionRule::BacktickStatement => "backtick_statement",
            ExtractionRule::BareSelect => "bare_select",
        }
    }
}

/// A single extracted, not yet executed SELECT statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateStatement {
    sql: String,
    rule: ExtractionRule,
}

impl CandidateStatement {
    /// Fails unless the trimmed text starts with `SELECT` (any case).
    pub fn new(sql: impl Into<String>, rule: ExtractionRule) -> Result<Self> {
        let sql = sql.into().trim().to_string();
        if !starts_with_select(&sql) {
            return Err(AppError::ExtractionFailed(format!(
                "Extracted text is not a SELECT statement: {}",
                preview(&sql)
            )));
        }
        Ok(Self { sql, rule })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn rule(&self) -> ExtractionRule {
        self.rule
    }
}

pub fn starts_with_select(sql: &str) -> bool {
    sql.trim()
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(60).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Maximum number of generate/extract/execute cycles for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AttemptBudget(u32);

impl AttemptBudget {
    pub fn new(attempts: u32) -> Result<Self> {
        if attempts == 0 {
            return Err(AppError::ValidationError(
                "Attempt budget must be at least 1".to_string(),
            ));
        }
        Ok(Self(attempts))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for AttemptBudget {
    fn default() -> Self {
        Self(DEFAULT_ATTEMPT_BUDGET)
    }
}

impl TryFrom<u32> for AttemptBudget {
    type Error = AppError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AttemptBudget> for u32 {
    fn from(budget: AttemptBudget) -> Self {
        budget.0
    }
}

/// Result handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub query: Option<String>,
    pub result: Vec<ResultRow>,
    pub attempts: u32,
    /// Which extraction rule isolated `query`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_rule: Option<ExtractionRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnalysisOutcome {
    pub fn found(statement: &CandidateStatement, rows: Vec<ResultRow>, attempts: u32) -> Self {
        Self {
            query: Some(statement.sql().to_string()),
            result: rows,
            attempts,
            extraction_rule: Some(statement.rule()),
            explanation: None,
            specific_answer: None,
            message: None,
        }
    }

    pub fn empty(attempts: u32) -> Self {
        Self {
            query: None,
            result: Vec::new(),
            attempts,
            extraction_rule: None,
            explanation: None,
            specific_answer: None,
            message: Some(format!("No results found after {} attempts", attempts)),
        }
    }

    pub fn has_rows(&self) -> bool {
        !self.result.is_empty()
    }

    pub fn with_narrative(mut self, explanation: String, specific_answer: String) -> Self {
        self.explanation = Some(explanation);
        self.specific_answer = Some(specific_answer);
        self
    }
}

/// Request shape accepted from a transport layer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
    #[validate(range(min = 1, max = 10))]
    pub max_retries: Option<u32>,
    #[validate(range(min = 10, max = 1000))]
    pub max_words: Option<u32>,
}

impl AnalysisRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_retries: None,
            max_words: None,
        }
    }

    /// Requested budget, or `default` when the request leaves it out.
    pub fn budget_or(&self, default: AttemptBudget) -> Result<AttemptBudget> {
        match self.max_retries {
            Some(n) => AttemptBudget::new(n),
            None => Ok(default),
        }
    }

    pub fn max_words_or(&self, default: u32) -> u32 {
        self.max_words.unwrap_or(default)
    }
}

/// Example questions the dataset answers well.
pub const SAMPLE_QUESTIONS: &[&str] = &[
    "Show all companies in the biotech industry that received funding after 2020.",
    "What are the top 5 largest funding rounds by amount and which companies received them?",
    "List all ICT companies with female CEOs that received venture capital funding.",
    "Calculate the total funding amount per industry and sort by highest to lowest.",
    "Find companies that received both Seed and Early Stage funding, and show their total funding amount.",
    "Which cantons have the most funded startups, and what is the average funding amount in each?",
    "List companies that received EXIT type funding and show their acquisition values when available.",
    "Compare the number of funding rounds and average amounts between spin-offs and non-spin-offs.",
    "Show companies founded after 2020 that received funding within their first year of operation.",
    "Identify investors who participated in multiple funding rounds and list the companies they invested in.",
];

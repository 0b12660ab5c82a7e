//! Prompt text for every model call the analysis pipeline makes.

use crate::domain::analysis::ResultRow;
use crate::domain::pipeline_config::RestrictedColumns;
use crate::domain::schema::SchemaDescriptor;
use std::fmt::Write;

pub fn build_gate_system_prompt() -> String {
    r#"You are a context validator for a Swiss startup funding database.

Determine if the following query is relevant to:
1. Swiss startups
2. Startup funding and investments
3. Company analysis in Switzerland
4. Startup ecosystem metrics
5. Investment trends and patterns

Respond only with "true" if the query is relevant to the context, or "false" if it's off-topic."#
        .to_string()
}

pub fn build_gate_user_prompt(question: &str) -> String {
    format!("Query: {}", question.trim())
}

const SQL_GUIDELINES: &[&str] = &[
    "Do not use escape sequences like \\n in your SQL",
    "Write the full query on a single line or use regular line breaks, not escape sequences",
    "Use proper SQL formatting with spaces between clauses",
    "Always end your query with a semicolon",
    "For numeric columns (amount, valuation) always filter out NULL values when sorting with ORDER BY, comparing values (top N, max, min, average) or aggregating (SUM, AVG)",
    "Example: \"SELECT d.company, d.amount FROM deals d WHERE d.amount IS NOT NULL ORDER BY d.amount DESC LIMIT 5;\"",
    "For percentage calculations, cast numbers as float: CAST(count(*) AS FLOAT)",
    "Always use table aliases and qualify column names with table aliases",
    "When multiple tables are involved, always specify which table each column belongs to",
];

pub fn build_sql_system_prompt(schema: &SchemaDescriptor, schema_text: &str, restricted: &RestrictedColumns) -> String {
    let mut prompt = String::new();
    prompt.push_str(schema_text);
    prompt.push_str(
        "\nWrite a SQL query to answer the user's question.\n\
         Return ONLY the final SQL query without explanation, surrounded by triple backticks tagged sql.\n\n\
         Important guidelines:\n",
    );
    for guideline in SQL_GUIDELINES {
        let _ = writeln!(prompt, "- {}", guideline);
    }

    prompt.push_str("\nNever use the following columns in your query:\n");
    for table in &schema.tables {
        for column in table.columns.iter().filter(|c| restricted.contains(&c.name)) {
            let _ = writeln!(
                prompt,
                "- {}.{}",
                table.name,
                schema.describe_column(&table.name, column)
            );
        }
    }
    prompt
}

pub fn build_sql_user_prompt(question: &str) -> String {
    format!("Question: {}", question.trim())
}

pub fn format_rows_json(rows: &[ResultRow]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
}

pub fn build_explain_system_prompt(schema_text: &str, max_words: u32) -> String {
    format!(
        r#"{schema_text}
Analyze query results with a focus on startup ecosystem insights for Swiss startups and investors.
- Identify emerging trends in funding, valuations, or sector growth
- Highlight notable patterns that would be valuable for benchmarking
- Compare performance metrics where possible (by canton, industry, year, etc.)
- Note any significant outliers or changes that indicate market shifts
- Consider both the investor perspective (opportunity identification) and the startup perspective (benchmarking)

Format requirements:
- Write in a clear, professional tone suitable for startup founders and investors
- Use simple paragraph format with plain text only (no bullet points or special formatting)
- Focus on actionable insights rather than just describing the data
- Write no more than {max_words} words
- Do not mention SQL, queries, or the technical aspects of data retrieval"#
    )
}

pub fn build_explain_user_prompt(statement: &str, rows: &[ResultRow]) -> String {
    format!(
        "The following SQL query was executed:\n```sql\n{}\n```\n\nAnd it returned the following results (JSON format):\n{}",
        statement,
        format_rows_json(rows)
    )
}

pub fn build_answer_system_prompt() -> String {
    r#"You are an AI assistant specializing in Swiss startup ecosystem analysis.

Provide a direct, specific answer to the user's question based on the data.
Requirements for the answer:
1. Start with a clear, direct statement that answers the main question
2. Include specific numbers and facts from the data
3. Keep it concise but informative (2-3 sentences)
4. Focus only on the most relevant information to answer the question
5. Use precise language and avoid generalizations

Format: Provide only the final answer without any additional explanations or metadata."#
        .to_string()
}

pub fn build_answer_user_prompt(question: &str, rows: &[ResultRow]) -> String {
    format!(
        "Original user question: {}\n\nData from analysis (JSON format):\n{}",
        question.trim(),
        format_rows_json(rows)
    )
}

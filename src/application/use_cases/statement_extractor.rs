//! Isolates one executable statement from free-form model output.
//!
//! Rules are tried in order and the first match wins:
//! 1. a fenced block tagged `sql`
//! 2. a single-backtick span holding `SELECT ... ;`
//! 3. a bare `SELECT ... ;` anywhere in the text
//!
//! No match means failure; the extractor never guesses.

use crate::domain::analysis::{CandidateStatement, ExtractionRule};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::response::clean_llm_response;
use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_SQL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```sql\s+(.*?)\s*```").unwrap());

static BACKTICK_STATEMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)`(SELECT\b[^`]*?;)`").unwrap());

static BARE_SELECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bSELECT\b.*?;").unwrap());

static FENCE_MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```(sql)?").unwrap());

const NO_MATCH_MESSAGE: &str = "Could not extract SQL query from model response";

/// Why no candidate came out of a model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionFailure {
    NoMatch,
    /// A rule matched, but the isolated text is not a SELECT.
    NotSelect { rule: ExtractionRule, reason: AppError },
}

impl ExtractionFailure {
    pub fn rule(&self) -> Option<ExtractionRule> {
        match self {
            ExtractionFailure::NoMatch => None,
            ExtractionFailure::NotSelect { rule, .. } => Some(*rule),
        }
    }
}

impl From<ExtractionFailure> for AppError {
    fn from(failure: ExtractionFailure) -> Self {
        match failure {
            ExtractionFailure::NoMatch => AppError::ExtractionFailed(NO_MATCH_MESSAGE.to_string()),
            ExtractionFailure::NotSelect { reason, .. } => reason,
        }
    }
}

pub fn extract(raw_text: &str) -> Result<CandidateStatement> {
    try_extract(raw_text).map_err(AppError::from)
}

/// Like [`extract`], but keeps the matching rule when the candidate is
/// refused.
pub fn try_extract(raw_text: &str) -> std::result::Result<CandidateStatement, ExtractionFailure> {
    let text = clean_llm_response(raw_text);
    let rules: [(ExtractionRule, &Regex); 3] = [
        (ExtractionRule::FencedSqlBlock, &*FENCED_SQL_PATTERN),
        (ExtractionRule::BacktickStatement, &*BACKTICK_STATEMENT_PATTERN),
        (ExtractionRule::BareSelect, &*BARE_SELECT_PATTERN),
    ];

    for (rule, pattern) in rules {
        let Some(captures) = pattern.captures(&text) else {
            continue;
        };
        let matched = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str())
            .unwrap_or_default();

        let statement = first_statement(&normalize(matched));
        return CandidateStatement::new(statement, rule)
            .map_err(|reason| ExtractionFailure::NotSelect { rule, reason });
    }

    Err(ExtractionFailure::NoMatch)
}

/// Drops fence markers, turns literal `\n` escapes into spaces and trims.
fn normalize(matched: &str) -> String {
    let without_fences = FENCE_MARKER_PATTERN.replace_all(matched, "");
    without_fences.replace("\\n", " ").trim().to_string()
}

/// Cuts the text after its first statement terminator outside a string
/// literal, so a block holding several statements yields only the first.
fn first_statement(sql: &str) -> String {
    let mut in_literal = false;
    for (idx, ch) in sql.char_indices() {
        match ch {
            '\'' => in_literal = !in_literal,
            ';' if !in_literal => return sql[..=idx].trim().to_string(),
            _ => {}
        }
    }
    sql.trim().to_string()
}

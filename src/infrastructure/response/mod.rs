use once_cell::sync::Lazy;
use regex::Regex;

static REASONING_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(think|thinking|reasoning)>.*?</(think|thinking|reasoning)>|<think\s*/>")
        .unwrap()
});

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Removes reasoning blocks some models prepend to their answer and
/// normalizes surrounding whitespace.
pub fn clean_llm_response(response: &str) -> String {
    let cleaned = REASONING_BLOCK_PATTERN.replace_all(response, "");
    let cleaned = cleaned.trim();
    MULTIPLE_NEWLINES_PATTERN
        .replace_all(cleaned, "\n\n")
        .to_string()
}

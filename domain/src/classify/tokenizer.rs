//! Whole-token tokenizer for rule-based classification
//!
//! Keyword matching operates on whole tokens, never on substrings: the
//! token "app" must not match inside "application". Multi-word keywords
//! match as consecutive token windows.

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Check whether `phrase` (one or more space-separated words) occurs as a
/// run of consecutive whole tokens.
pub fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(words.len())
        .any(|window| window.iter().map(String::as_str).eq(words.iter().copied()))
}

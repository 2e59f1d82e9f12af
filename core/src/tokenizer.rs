use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Tokens shorter than this (in chars) are dropped.
pub const MIN_TOKEN_CHARS: usize = 2;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}']+").expect("valid regex");
}

/// Per-char case fold shared by tokenizing and line scanning. Final sigma folds
/// to `σ` so `ς`, `σ` and `Σ` all compare equal.
pub fn fold_char(c: char) -> std::char::ToLowercase {
    let c = if c == 'ς' { 'σ' } else { c };
    c.to_lowercase()
}

pub fn fold_case(text: &str) -> String {
    text.chars().flat_map(fold_char).collect()
}

/// Case-fold, split on anything that is not a letter, digit or apostrophe, trim
/// apostrophes from both ends and drop short tokens. Each token is returned once,
/// in order of first occurrence.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = fold_case(text);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&lowered) {
        let token = mat.as_str().trim_matches('\'');
        if token.chars().count() < MIN_TOKEN_CHARS {
            continue;
        }
        if seen.insert(token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

//! Placeholder substitution engine.
//!
//! Replaces `{{name}}` tokens in arbitrary text using a caller-supplied
//! lookup. Substitution is a single pass: a resolved value that itself
//! contains `{{...}}` is inserted verbatim and never expanded again.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Cached regex pattern for matching `{{variableName}}` with optional whitespace.
/// The name is any run of characters not containing `}`.
static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Failed to compile variable regex"));

/// Substitutes every `{{name}}` token in `text`.
///
/// The name is trimmed before it is passed to `lookup`. Tokens the lookup
/// does not know are left unchanged. Each distinct token is looked up once,
/// so repeated occurrences always receive the same value.
///
/// # Examples
///
/// ```
/// use rest_workbench::variables::substitute;
///
/// let result = substitute("GET {{ baseUrl }}/users/{{id}}", |name| match name {
///     "baseUrl" => Some("https://api.example.com".to_string()),
///     _ => None,
/// });
/// assert_eq!(result, "GET https://api.example.com/users/{{id}}");
/// ```
pub fn substitute<F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    // Fast path: if there are no variable markers at all, return original text
    if text.is_empty() || !text.contains("{{") {
        return text.to_string();
    }

    let mut resolved: HashMap<String, Option<String>> = HashMap::new();

    VARIABLE_REGEX
        .replace_all(text, |caps: &Captures| {
            let token = &caps[0];
            let value = resolved
                .entry(token.to_string())
                .or_insert_with(|| lookup(caps[1].trim()));
            match value {
                Some(v) => v.clone(),
                None => token.to_string(),
            }
        })
        .into_owned()
}

/// Returns the trimmed names of all placeholders in `text`, in order of
/// first appearance and without duplicates.
pub fn placeholder_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in VARIABLE_REGEX.captures_iter(text) {
        let name = cap[1].trim().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Checks whether `text` still contains at least one placeholder.
pub fn has_placeholders(text: &str) -> bool {
    VARIABLE_REGEX.is_match(text)
}

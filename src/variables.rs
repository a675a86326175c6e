//! Placeholder scanning for `{{ ... }}` expressions.
//!
//! Extraction is lexical: everything between the braces up to the first `|`
//! is taken as the variable name, trimmed. Dotted paths and sub-expressions
//! are kept whole, so `{{ user.name }}` yields `user.name` and `{{ a + b }}`
//! yields `a + b`. Schema keys are expected to match these captures exactly.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// `{{`, name (no `}` or `|`), optional `|filter...` pipeline, `}}`.
/// Padding whitespace is ASCII only; the captured name is trimmed afterwards.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{[\t\n\f\r ]*([^}|]+)(?:\|[^}]*)?[\t\n\f\r ]*\}\}")
        .expect("placeholder pattern is valid")
});

/// Extracts the variable names referenced by `{{ }}` placeholders.
///
/// Names are returned in order of first appearance without duplicates.
/// Filter pipelines such as `|floatformat:0` are dropped and placeholders
/// that are blank after trimming are ignored.
///
/// # Examples
///
/// ```
/// use prompt_schema::extract_variables;
///
/// let vars = extract_variables("{{ name }} scored {{ score|floatformat:1 }} ({{ name }})");
/// assert_eq!(vars, vec!["name", "score"]);
/// ```
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut seen = HashSet::new();

    for captures in PLACEHOLDER.captures_iter(template) {
        let Some(capture) = captures.get(1) else {
            continue;
        };
        let name = capture.as_str().trim();
        if name.is_empty() || seen.contains(name) {
            continue;
        }
        seen.insert(name.to_string());
        variables.push(name.to_string());
    }

    debug!(count = variables.len(), "Extracted template variables");
    variables
}

//! Detection of `{% for x in items %}` loop constructs.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Whitespace accepted between loop tokens. ASCII only.
const SPACE: &str = r"[\t\n\f\r ]";

/// `{% for <iterator> in <source> %}` where the source is a bare identifier.
/// The iterator and source are ASCII identifiers.
static FOR_LOOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\{{%{SPACE}*for{SPACE}+[0-9A-Za-z_]+{SPACE}+in{SPACE}+([a-zA-Z_][a-zA-Z0-9_]*){SPACE}*%\}}"
    ))
    .expect("for-loop pattern is valid")
});

/// Extracts the names of the arrays iterated by `for` loops.
///
/// Only bare identifiers are recognized as loop sources; `{% for x in a.b %}`
/// is not matched. Names are returned in order of appearance and duplicates
/// are kept.
///
/// # Examples
///
/// ```
/// use prompt_schema::extract_for_loop_arrays;
///
/// let arrays = extract_for_loop_arrays("{% for task in tasks %}{{ task }}{% endfor %}");
/// assert_eq!(arrays, vec!["tasks"]);
/// ```
pub fn extract_for_loop_arrays(template: &str) -> Vec<String> {
    let arrays: Vec<String> = FOR_LOOP
        .captures_iter(template)
        .filter_map(|captures| captures.get(1))
        .map(|source| source.as_str().to_string())
        .collect();

    debug!(count = arrays.len(), "Extracted for-loop arrays");
    arrays
}

/// Returns true if `name` is the iterator variable of any `for` loop in the template.
pub fn is_loop_iterator(name: &str, template: &str) -> bool {
    let pattern = format!(
        r"\{{%{SPACE}*for{SPACE}+{}{SPACE}+in{SPACE}+",
        regex::escape(name)
    );

    match Regex::new(&pattern) {
        Ok(regex) => regex.is_match(template),
        Err(err) => {
            debug!("Failed to build loop iterator pattern for {}: {}", name, err);
            false
        }
    }
}

/// Returns true if `variable` is one of the loop arrays.
pub fn is_array_variable(variable: &str, for_loop_arrays: &[String]) -> bool {
    for_loop_arrays.iter().any(|array| array == variable)
}

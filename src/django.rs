//! Django template compatibility for the minijinja engine.
//!
//! Prompts are often written for Django-flavoured engines (pongo2, Django
//! itself) which differ from Jinja in a few places that matter for prompts:
//!
//! - filter arguments use a colon: `{{ price|floatformat:2 }}`
//! - pongo2 accepts `||` and `&&` for `or` and `and`
//! - the loop object is `forloop` with `Counter`/`counter` style attributes
//! - filters such as `floatformat` and `capfirst` are not part of Jinja
//!
//! [`normalize`] rewrites the syntax inside tags and [`register_filters`]
//! installs the missing filters on an [`Environment`].

use minijinja::{Environment, Value};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

/// A `{{ ... }}` or `{% ... %}` tag.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("tag pattern is valid")
});

/// `|name:arg` where arg is a quoted string or a bare token.
static COLON_FILTER_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\|\s*([A-Za-z_][A-Za-z0-9_]*):("[^"]*"|'[^']*'|[^\s|}%]+)"#)
        .expect("filter argument pattern is valid")
});

static FORLOOP_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bforloop\.(revcounter0|revcounter|counter0|counter|first|last)\b")
        .expect("forloop pattern is valid")
});

/// Rewrites Django filter arguments, `forloop` attributes and `||`/`&&`
/// operators into minijinja syntax.
///
/// Only text inside tags is touched. The input is returned borrowed when the
/// template has no tags.
///
/// # Examples
///
/// ```
/// use prompt_schema::django::normalize;
///
/// assert_eq!(
///     normalize("{{ forloop.Counter }}. {{ score|floatformat:1 }}"),
///     "{{ loop.index }}. {{ score|floatformat(1) }}"
/// );
/// ```
pub fn normalize(template: &str) -> Cow<'_, str> {
    TAG.replace_all(template, |captures: &Captures| normalize_tag(&captures[0]))
}

fn normalize_tag(tag: &str) -> String {
    let tag = rewrite_boolean_operators(tag);
    let tag = COLON_FILTER_ARG.replace_all(&tag, "|${1}(${2})");
    FORLOOP_ATTR
        .replace_all(&tag, |captures: &Captures| {
            let attr = match captures[1].to_ascii_lowercase().as_str() {
                "counter" => "index",
                "counter0" => "index0",
                "revcounter" => "revindex",
                "revcounter0" => "revindex0",
                "first" => "first",
                _ => "last",
            };
            format!("loop.{}", attr)
        })
        .into_owned()
}

/// `||` becomes `or` and `&&` becomes `and`, except inside string literals.
fn rewrite_boolean_operators(tag: &str) -> Cow<'_, str> {
    if !tag.contains("||") && !tag.contains("&&") {
        return Cow::Borrowed(tag);
    }

    let mut out = String::with_capacity(tag.len() + 8);
    let mut quote: Option<char> = None;
    let mut chars = tag.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(open) = quote {
            out.push(ch);
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        let keyword = match ch {
            '"' | '\'' => {
                quote = Some(ch);
                None
            }
            '|' if chars.peek() == Some(&'|') => Some("or"),
            '&' if chars.peek() == Some(&'&') => Some("and"),
            _ => None,
        };
        match keyword {
            Some(keyword) => {
                chars.next();
                if !out.ends_with(char::is_whitespace) {
                    out.push(' ');
                }
                out.push_str(keyword);
                if !chars.peek().is_some_and(|next| next.is_whitespace()) {
                    out.push(' ');
                }
            }
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Installs the Django filters that minijinja lacks.
pub fn register_filters(env: &mut Environment<'_>) {
    env.add_filter("floatformat", floatformat);
    env.add_filter("capfirst", capfirst);
}

/// Django's `floatformat`.
///
/// With no argument one decimal place is shown, but only when the value has a
/// fractional part. A positive argument always shows that many places, a
/// negative one only when there is a fractional part, and `0` rounds to an
/// integer. Rounding is half away from zero. Values that are not numbers
/// render as an empty string.
pub fn floatformat(value: Value, places: Option<Value>) -> String {
    let Some(number) = to_f64(&value) else {
        return String::new();
    };
    // -0.0 prints as "-0"
    let number = if number == 0.0 { 0.0 } else { number };
    let places = match places {
        None => -1,
        Some(arg) => match to_i64(&arg) {
            Some(places) => places.clamp(-15, 15),
            None => return value.to_string(),
        },
    };

    let digits = places.unsigned_abs() as usize;
    if places < 0 && number.fract() == 0.0 {
        return format!("{:.0}", number);
    }

    let factor = 10f64.powi(digits as i32);
    let rounded = match (number * factor).round() / factor {
        rounded if !rounded.is_finite() => number,
        rounded if rounded == 0.0 => 0.0,
        rounded => rounded,
    };
    format!("{:.*}", digits, rounded)
}

/// Django's `capfirst`: uppercases the first character.
pub fn capfirst(value: Value) -> String {
    let text = value.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value.as_str() {
        Some(text) => text.trim().parse().ok(),
        None => f64::try_from(value.clone()).ok(),
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    match value.as_str() {
        Some(text) => text.trim().parse().ok(),
        None => i64::try_from(value.clone()).ok(),
    }
}

//! Literal values appearing as call arguments
//!
//! A literal is the decoded form of one argument segment. Decoding is lenient:
//! text that is not recognizably a number, boolean, quoted string or JSON
//! structure is kept as a raw string instead of being rejected.

use std::fmt;

use serde_json::Value;

/// A decoded argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `None`
    Null,
    /// `true` / `false` in any letter case
    Bool(bool),
    /// Integer without a decimal point
    Int(i64),
    /// Number with a decimal point, or an integer too large for `i64`
    Float(f64),
    /// Quoted string with its quotes removed, or unrecognized raw text
    Str(String),
    /// JSON object or array
    Json(Value),
}

impl Literal {
    /// Decode one argument segment
    ///
    /// The checks run in a fixed priority order on the trimmed text; the first
    /// that matches wins. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use mongo_dispatch::parser::Literal;
    ///
    /// assert_eq!(Literal::parse("42"), Literal::Int(42));
    /// assert_eq!(Literal::parse("TRUE"), Literal::Bool(true));
    /// assert_eq!(Literal::parse("'a,b'"), Literal::Str("a,b".into()));
    /// assert_eq!(Literal::parse("None"), Literal::Null);
    /// ```
    pub fn parse(text: &str) -> Literal {
        let text = text.trim();

        if text == "None" {
            return Literal::Null;
        }

        if text.eq_ignore_ascii_case("true") {
            return Literal::Bool(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Literal::Bool(false);
        }

        if let Some(number) = parse_number(text) {
            return number;
        }

        if let Some(inner) = strip_matching_quotes(text) {
            return Literal::Str(unescape(inner));
        }

        if text.starts_with('{') || text.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(text) {
                return Literal::Json(value);
            }
            let normalized = normalize_python_literal(text);
            if let Ok(value) = serde_json::from_str::<Value>(&normalized) {
                return Literal::Json(value);
            }
        }

        Literal::Str(text.to_string())
    }

    /// Name of the literal kind, used in conversion errors
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Null => "None",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
            Literal::Json(Value::Array(_)) => "list",
            Literal::Json(_) => "dict",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "None"),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Json(v) => write!(f, "{v}"),
        }
    }
}

/// Optional leading `-`, ASCII digits, at most one `.`, at least one digit
fn parse_number(text: &str) -> Option<Literal> {
    let body = text.strip_prefix('-').unwrap_or(text);
    if body.is_empty() {
        return None;
    }

    let mut dots = 0;
    let mut digits = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }

    if dots == 0 {
        match text.parse::<i64>() {
            Ok(n) => Some(Literal::Int(n)),
            Err(_) => text.parse::<f64>().ok().map(Literal::Float),
        }
    } else {
        // "1." and ".5" are accepted by the float grammar of Rust as well
        text.parse::<f64>().ok().map(Literal::Float)
    }
}

fn strip_matching_quotes(text: &str) -> Option<&str> {
    if text.len() < 2 {
        return None;
    }
    let first = text.chars().next()?;
    if (first == '"' || first == '\'') && text.ends_with(first) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// Resolve `\\ \" \' \n \t \r`; other escapes are kept verbatim
fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Rewrite a Python container literal into JSON text
///
/// Tuples become arrays, single-quoted strings become double-quoted,
/// `True`/`False`/`None` become their JSON spellings and trailing commas are
/// dropped. Text inside strings is left alone apart from quote escaping.
pub(crate) fn normalize_python_literal(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '"' | '\'' => pos = copy_string(&chars, pos, &mut out),
            '(' => {
                out.push('[');
                pos += 1;
            }
            ')' => {
                out.push(']');
                pos += 1;
            }
            ',' => {
                let mut next = pos + 1;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                let closes = next < chars.len() && matches!(chars[next], '}' | ']' | ')');
                if !closes {
                    out.push(',');
                }
                pos += 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    _ => &word,
                });
            }
            _ => {
                out.push(c);
                pos += 1;
            }
        }
    }

    out
}

/// Copy a quoted string starting at `start` as a JSON string; returns the
/// position after the closing quote (or the end of input)
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    let mut pos = start + 1;
    out.push('"');

    while pos < chars.len() {
        let c = chars[pos];
        if c == '\\' && pos + 1 < chars.len() {
            let escaped = chars[pos + 1];
            if escaped == '\'' {
                out.push('\'');
            } else {
                out.push('\\');
                out.push(escaped);
            }
            pos += 2;
            continue;
        }
        if c == quote {
            out.push('"');
            return pos + 1;
        }
        if c == '"' {
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
        pos += 1;
    }

    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_none_and_null() {
        assert_eq!(Literal::parse("None"), Literal::Null);
        assert_eq!(Literal::parse("  None "), Literal::Null);
        // only the Python spelling is a null; "null" stays a raw string
        assert_eq!(Literal::parse("null"), Literal::Str("null".into()));
        assert_eq!(Literal::parse("none"), Literal::Str("none".into()));
    }

    #[test]
    fn test_booleans_any_case() {
        assert_eq!(Literal::parse("true"), Literal::Bool(true));
        assert_eq!(Literal::parse("True"), Literal::Bool(true));
        assert_eq!(Literal::parse("FALSE"), Literal::Bool(false));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(Literal::parse("42"), Literal::Int(42));
        assert_eq!(Literal::parse("-7"), Literal::Int(-7));
        assert_eq!(Literal::parse("3.5"), Literal::Float(3.5));
        assert_eq!(Literal::parse("-0.25"), Literal::Float(-0.25));
        assert_eq!(Literal::parse("1."), Literal::Float(1.0));
        assert_eq!(Literal::parse(".5"), Literal::Float(0.5));
    }

    #[test]
    fn test_non_numbers_stay_strings() {
        assert_eq!(Literal::parse("1.2.3"), Literal::Str("1.2.3".into()));
        assert_eq!(Literal::parse("-"), Literal::Str("-".into()));
        assert_eq!(Literal::parse("."), Literal::Str(".".into()));
        assert_eq!(Literal::parse("1e5"), Literal::Str("1e5".into()));
        assert_eq!(Literal::parse("+3"), Literal::Str("+3".into()));
    }

    #[test]
    fn test_integer_overflow_becomes_float() {
        match Literal::parse("99999999999999999999") {
            Literal::Float(f) => assert!(f > 9.9e19),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_quoted_strings() {
        assert_eq!(Literal::parse("\"users\""), Literal::Str("users".into()));
        assert_eq!(Literal::parse("'a,b'"), Literal::Str("a,b".into()));
        assert_eq!(Literal::parse("''"), Literal::Str(String::new()));
        assert_eq!(
            Literal::parse(r#""say \"hi\"\n""#),
            Literal::Str("say \"hi\"\n".into())
        );
        assert_eq!(Literal::parse(r"'it\'s'"), Literal::Str("it's".into()));
    }

    #[test]
    fn test_mismatched_quotes_are_raw() {
        assert_eq!(Literal::parse("'abc\""), Literal::Str("'abc\"".into()));
        assert_eq!(Literal::parse("\""), Literal::Str("\"".into()));
    }

    #[test]
    fn test_json_object_and_array() {
        assert_eq!(
            Literal::parse(r#"{"age": {"$gt": 30}}"#),
            Literal::Json(json!({"age": {"$gt": 30}}))
        );
        assert_eq!(
            Literal::parse(r#"[{"$match": {}}]"#),
            Literal::Json(json!([{"$match": {}}]))
        );
    }

    #[test]
    fn test_python_literals_are_normalized() {
        assert_eq!(
            Literal::parse(r#"[("email", 1)]"#),
            Literal::Json(json!([["email", 1]]))
        );
        assert_eq!(
            Literal::parse("{'active': True, 'deleted': None,}"),
            Literal::Json(json!({"active": true, "deleted": null}))
        );
        assert_eq!(
            Literal::parse(r#"{'quote': 'say "x"', 'it': 'it\'s'}"#),
            Literal::Json(json!({"quote": "say \"x\"", "it": "it's"}))
        );
    }

    #[test]
    fn test_malformed_json_is_raw_string() {
        assert_eq!(
            Literal::parse("{not json"),
            Literal::Str("{not json".into())
        );
    }

    #[test]
    fn test_unrecognized_text_is_raw_string() {
        assert_eq!(Literal::parse("users"), Literal::Str("users".into()));
        assert_eq!(Literal::parse(" a b "), Literal::Str("a b".into()));
    }

    #[test]
    fn test_display_uses_source_spelling() {
        assert_eq!(Literal::Null.to_string(), "None");
        assert_eq!(Literal::Bool(true).to_string(), "True");
        assert_eq!(Literal::Str("a".into()).to_string(), "\"a\"");
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Literal::parse("[1]").kind(), "list");
        assert_eq!(Literal::parse("{}").kind(), "dict");
        assert_eq!(Literal::parse("x").kind(), "str");
    }
}

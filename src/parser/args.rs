//! Argument list splitting
//!
//! Splits the text between the parentheses of a call into positional and
//! keyword literals. Like the literal decoder this never rejects input:
//! unbalanced quotes or brackets only change where segments end.

use std::collections::BTreeMap;

use super::literal::Literal;
use crate::utils::string::is_identifier;

/// Arguments of one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    /// Positional values in source order
    pub positional: Vec<Literal>,
    /// Keyword values; the last occurrence of a key wins
    pub keyword: BTreeMap<String, Literal>,
}

impl ParsedArgs {
    /// True when no argument was given
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

/// Character scanner tracking quote and nesting state
///
/// Shared by segment splitting, keyword detection and call recognition so
/// they agree on what "top level" means.
pub(crate) struct Scanner {
    quote: Option<char>,
    escaped: bool,
    depth: usize,
}

impl Scanner {
    pub(crate) fn new() -> Self {
        Self {
            quote: None,
            escaped: false,
            depth: 0,
        }
    }

    /// Feed one character; returns true when it sits at top level, outside
    /// quotes and at nesting depth zero *before* the character is applied
    pub(crate) fn step(&mut self, c: char) -> bool {
        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == quote {
                self.quote = None;
            }
            return false;
        }

        let top = self.depth == 0;
        match c {
            '"' | '\'' => self.quote = Some(c),
            '{' | '[' | '(' => self.depth += 1,
            '}' | ']' | ')' => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        top
    }

    pub(crate) fn in_quote(&self) -> bool {
        self.quote.is_some()
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

/// Parse the raw argument text of a call
///
/// # Examples
///
/// ```
/// use mongo_dispatch::parser::{parse_arguments, Literal};
///
/// let args = parse_arguments(r#""users", {"age": {"$gt": 30}}, limit=2"#);
/// assert_eq!(args.positional.len(), 2);
/// assert_eq!(args.keyword["limit"], Literal::Int(2));
/// ```
pub fn parse_arguments(raw: &str) -> ParsedArgs {
    let mut args = ParsedArgs::default();
    if raw.trim().is_empty() {
        return args;
    }

    for segment in split_top_level(raw) {
        if segment.trim().is_empty() {
            continue;
        }

        match split_keyword(segment) {
            Some((key, value)) => {
                args.keyword.insert(key.to_string(), Literal::parse(value));
            }
            None => args.positional.push(Literal::parse(segment)),
        }
    }

    args
}

/// Split on commas outside quotes and at nesting depth zero
fn split_top_level(raw: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut scanner = Scanner::new();
    let mut start = 0;

    for (idx, c) in raw.char_indices() {
        if scanner.step(c) && c == ',' {
            segments.push(&raw[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    segments.push(&raw[start..]);

    segments
}

/// Find a top-level `=` that is an assignment and whose left side is an
/// identifier
fn split_keyword(segment: &str) -> Option<(&str, &str)> {
    let mut scanner = Scanner::new();
    let mut prev: Option<char> = None;
    let mut chars = segment.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let top = scanner.step(c);
        if top && c == '=' {
            let next = chars.peek().map(|(_, n)| *n);
            let comparison = matches!(prev, Some('=' | '!' | '<' | '>')) || next == Some('=');
            if !comparison {
                let key = segment[..idx].trim();
                return is_identifier(key).then(|| (key, &segment[idx + 1..]));
            }
        }
        prev = Some(c);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input() {
        assert!(parse_arguments("").is_empty());
        assert!(parse_arguments("   \t").is_empty());
    }

    #[test]
    fn test_query_with_limit() {
        let args = parse_arguments(r#""users", {"age": {"$gt": 30}}, limit=2"#);
        assert_eq!(
            args.positional,
            vec![
                Literal::Str("users".into()),
                Literal::Json(json!({"age": {"$gt": 30}})),
            ]
        );
        assert_eq!(args.keyword.len(), 1);
        assert_eq!(args.keyword["limit"], Literal::Int(2));
    }

    #[test]
    fn test_tuple_list_and_python_bool() {
        let args = parse_arguments(r#""users", [("email", 1)], unique=True"#);
        assert_eq!(args.positional[0], Literal::Str("users".into()));
        assert_eq!(args.positional[1], Literal::Json(json!([["email", 1]])));
        assert_eq!(args.keyword["unique"], Literal::Bool(true));
    }

    #[test]
    fn test_comma_inside_quotes() {
        let args = parse_arguments("'a,b'");
        assert_eq!(args.positional, vec![Literal::Str("a,b".into())]);
        assert!(args.keyword.is_empty());
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let args = parse_arguments(r#""a\",b", 2"#);
        assert_eq!(args.positional.len(), 2);
        assert_eq!(args.positional[0], Literal::Str("a\",b".into()));
    }

    #[test]
    fn test_single_scalars() {
        assert_eq!(parse_arguments("42").positional, vec![Literal::Int(42)]);
        assert_eq!(parse_arguments("true").positional, vec![Literal::Bool(true)]);
    }

    #[test]
    fn test_empty_segments_are_ignored() {
        let args = parse_arguments(",1,,2,");
        assert_eq!(args.positional, vec![Literal::Int(1), Literal::Int(2)]);
    }

    #[test]
    fn test_last_keyword_wins() {
        let args = parse_arguments("limit=1, limit=5");
        assert_eq!(args.keyword.len(), 1);
        assert_eq!(args.keyword["limit"], Literal::Int(5));
    }

    #[test]
    fn test_keyword_value_keeps_its_commas() {
        let args = parse_arguments(r#"collection_name="orders", query={"a": 1, "b": 2}"#);
        assert_eq!(args.keyword["collection_name"], Literal::Str("orders".into()));
        assert_eq!(args.keyword["query"], Literal::Json(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_comparisons_are_not_keywords() {
        let args = parse_arguments("a==b, c!=d, e<=f, g>=h");
        assert!(args.keyword.is_empty());
        assert_eq!(args.positional.len(), 4);
        assert_eq!(args.positional[0], Literal::Str("a==b".into()));
    }

    #[test]
    fn test_equals_inside_string_is_positional() {
        let args = parse_arguments("'x=1'");
        assert_eq!(args.positional, vec![Literal::Str("x=1".into())]);
    }

    #[test]
    fn test_non_identifier_left_side_is_positional() {
        let args = parse_arguments("\"k\"=1");
        assert!(args.keyword.is_empty());
        assert_eq!(args.positional, vec![Literal::Str("\"k\"=1".into())]);
    }

    #[test]
    fn test_positional_order_preserved_around_keywords() {
        let args = parse_arguments("1, x=2, 3");
        assert_eq!(args.positional, vec![Literal::Int(1), Literal::Int(3)]);
        assert_eq!(args.keyword["x"], Literal::Int(2));
    }

    #[test]
    fn test_unbalanced_closing_does_not_underflow() {
        let args = parse_arguments("], 1");
        assert_eq!(args.positional.len(), 2);
        assert_eq!(args.positional[1], Literal::Int(1));
    }

    #[test]
    fn test_nested_parentheses_group() {
        let args = parse_arguments("[(1, 2), (3, 4)], 5");
        assert_eq!(args.positional.len(), 2);
        assert_eq!(args.positional[0], Literal::Json(json!([[1, 2], [3, 4]])));
    }

    #[test]
    fn test_scanner_depth_tracking() {
        let mut scanner = Scanner::new();
        for c in "{\"a\": [1".chars() {
            scanner.step(c);
        }
        assert_eq!(scanner.depth(), 2);
        assert!(!scanner.in_quote());
    }
}

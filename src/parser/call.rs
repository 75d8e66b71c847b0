//! Recognition of `name(args)` lines
//!
//! A line is a call only when the whole trimmed line is one call: an
//! operation name, an opening parenthesis, balanced argument text and the
//! closing parenthesis as the last character. Everything else is plain text.

use super::args::Scanner;
use crate::utils::string::is_word_char;

/// A call recognized on one line, borrowing from that line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallExpression<'a> {
    /// The trimmed line
    pub text: &'a str,
    /// Operation name
    pub name: &'a str,
    /// Text between the outer parentheses, possibly empty
    pub raw_arguments: &'a str,
}

impl<'a> CallExpression<'a> {
    /// Recognize a single-line call
    ///
    /// # Examples
    ///
    /// ```
    /// use mongo_dispatch::parser::CallExpression;
    ///
    /// let call = CallExpression::recognize("count_documents(\"orders\")").unwrap();
    /// assert_eq!(call.name, "count_documents");
    /// assert_eq!(call.raw_arguments, "\"orders\"");
    ///
    /// assert!(CallExpression::recognize("print(x) + 1").is_none());
    /// assert!(CallExpression::recognize("find_one(\"users\",").is_none());
    /// ```
    pub fn recognize(line: &'a str) -> Option<Self> {
        let text = line.trim();
        let open = text.find('(')?;
        let name = &text[..open];

        if name.is_empty() || !name.chars().all(is_word_char) {
            return None;
        }

        let inner = text[open + 1..].strip_suffix(')')?;
        if !is_balanced(inner) {
            return None;
        }

        Some(Self {
            text,
            name,
            raw_arguments: inner,
        })
    }
}

/// Parentheses outside quotes never close more than they opened, all of them
/// are closed at the end, and no quote is left open
fn is_balanced(inner: &str) -> bool {
    let mut scanner = Scanner::new();
    let mut parens: usize = 0;

    for c in inner.chars() {
        let quoted = scanner.in_quote();
        scanner.step(c);
        if quoted {
            continue;
        }
        match c {
            '(' => parens += 1,
            ')' => match parens.checked_sub(1) {
                Some(depth) => parens = depth,
                None => return false,
            },
            _ => {}
        }
    }

    parens == 0 && !scanner.in_quote()
}

/// True for lines that are never dispatched: blank lines and comments
pub fn is_comment_or_blank(line: &str, marker: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || (!marker.is_empty() && trimmed.starts_with(marker))
}

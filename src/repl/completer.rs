//! Completer for reedline - completes operation names

use reedline::{Completer, Span, Suggestion};

use crate::utils::string::is_word_char;

/// Completes the operation name at the start of a line
pub struct OperationCompleter {
    /// Registered operation names with their summaries
    operations: Vec<(String, String)>,
}

impl OperationCompleter {
    pub fn new(operations: Vec<(String, String)>) -> Self {
        Self { operations }
    }
}

impl Completer for OperationCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let before = &line[..pos.min(line.len())];
        let start = before.len() - before.trim_start().len();
        let word = &before[start..];

        // Only the name is completed; arguments are free text
        if !word.chars().all(is_word_char) {
            return Vec::new();
        }

        self.operations
            .iter()
            .filter(|(name, _)| name.starts_with(word))
            .map(|(name, summary)| Suggestion {
                value: format!("{name}("),
                description: Some(summary.clone()),
                style: None,
                extra: None,
                span: Span::new(start, pos),
                append_whitespace: false,
                match_indices: None,
            })
            .collect()
    }
}

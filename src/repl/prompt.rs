//! Custom prompt implementation for mongo-dispatch

use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};
use std::borrow::Cow;

/// Prompt showing the database and whether writes are enabled
pub struct DispatchPrompt {
    /// Database name
    database: String,
    /// Whether connected to database
    connected: bool,
    /// Whether write operations are registered
    writes: bool,
}

impl DispatchPrompt {
    pub fn new(database: String, connected: bool, writes: bool) -> Self {
        Self {
            database,
            connected,
            writes,
        }
    }
}

impl Prompt for DispatchPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let mode = if self.writes { " [rw]" } else { "" };
        if self.connected {
            format!("{}{}> ", self.database, mode).into()
        } else {
            format!("{}{} (disconnected)> ", self.database, mode).into()
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        "".into()
    }

    /// Empty; the indicator is part of the left prompt
    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        "".into()
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        "... ".into()
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_prompt() {
        let prompt = DispatchPrompt::new("shop".to_string(), true, false);
        assert_eq!(prompt.render_prompt_left(), "shop> ");
    }

    #[test]
    fn test_disconnected_prompt() {
        let prompt = DispatchPrompt::new("shop".to_string(), false, false);
        assert_eq!(prompt.render_prompt_left(), "shop (disconnected)> ");
    }

    #[test]
    fn test_write_mode_prompt() {
        let prompt = DispatchPrompt::new("shop".to_string(), true, true);
        assert_eq!(prompt.render_prompt_left(), "shop [rw]> ");
    }

    #[test]
    fn test_indicators() {
        let prompt = DispatchPrompt::new("shop".to_string(), true, false);
        assert_eq!(prompt.render_prompt_right(), "");
        assert_eq!(prompt.render_prompt_indicator(PromptEditMode::Default), "");
        assert_eq!(prompt.render_prompt_multiline_indicator(), "... ");
    }
}

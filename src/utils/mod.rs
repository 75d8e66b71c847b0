//! Utility functions and helpers
//!
//! - String helpers shared by the parser and log previews
//! - File system helpers for config and history paths
//! - Conversion helpers for status output

use std::path::PathBuf;

/// String utilities
pub mod string {
    /// Truncate string to at most `max_len` characters
    ///
    /// # Arguments
    /// * `s` - String to truncate
    /// * `max_len` - Maximum length in characters
    ///
    /// # Returns
    /// * `String` - Truncated string with ellipsis if needed
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            return s.to_string();
        }
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }

    /// Check if a character may appear in an operation name
    pub fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    /// Check if string is a valid keyword-argument identifier
    ///
    /// # Arguments
    /// * `s` - String to check
    ///
    /// # Returns
    /// * `bool` - True if `s` starts with a letter or `_` and holds only word characters
    pub fn is_identifier(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) if first.is_alphabetic() || first == '_' => chars.all(is_word_char),
            _ => false,
        }
    }

    /// Collapse a possibly multi-line text into one line for logs
    pub fn one_line(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// File system utilities
pub mod fs {
    use super::PathBuf;

    /// Expand `~` at the start of a path
    pub fn expand_home(path: &str) -> PathBuf {
        match path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(path)),
            None => PathBuf::from(path),
        }
    }
}

/// Conversion utilities
pub mod convert {
    /// Format bytes as human-readable size
    ///
    /// # Arguments
    /// * `bytes` - Number of bytes
    ///
    /// # Returns
    /// * `String` - Formatted size (e.g., "1.50 MB")
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(string::truncate("hello", 10), "hello");
        assert_eq!(string::truncate("hello world", 8), "hello...");
        assert_eq!(string::truncate("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_is_identifier() {
        assert!(string::is_identifier("collection_name"));
        assert!(string::is_identifier("_private"));
        assert!(string::is_identifier("limit2"));
        assert!(!string::is_identifier(""));
        assert!(!string::is_identifier("2fast"));
        assert!(!string::is_identifier("a b"));
        assert!(!string::is_identifier("\"key\""));
        assert!(!string::is_identifier("$gt"));
    }

    #[test]
    fn test_one_line() {
        assert_eq!(string::one_line("a\n  b\tc"), "a b c");
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(fs::expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(convert::format_bytes(512), "512 B");
        assert_eq!(convert::format_bytes(1536), "1.50 KB");
        assert_eq!(convert::format_bytes(1024 * 1024), "1.00 MB");
    }
}

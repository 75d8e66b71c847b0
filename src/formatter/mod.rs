//! Result text formatting
//!
//! Operations return display text, not structured data. This module holds
//! the pieces they compose it from:
//! - `table`: documents as a text table with shell-style cell values
//! - `json`: pretty and inline relaxed extended JSON

pub mod json;
pub mod table;

pub use json::{JsonFormatter, inline_document, inline_value, inline_values};
pub use table::{TableFormatter, shell_value};

use mongodb::bson::Document;

/// Render a document list as a counted table
///
/// `label` names the producer ("Query", "Aggregation"). At most `display_rows`
/// documents are shown; the remainder is reported as a count.
///
/// ```
/// use mongo_dispatch::formatter::{summarize_documents, TableFormatter};
///
/// let text = summarize_documents("Query", &[], 10, &TableFormatter::new());
/// assert_eq!(text, "Query returned no results.");
/// ```
pub fn summarize_documents(
    label: &str,
    docs: &[Document],
    display_rows: usize,
    table: &TableFormatter,
) -> String {
    if docs.is_empty() {
        return format!("{label} returned no results.");
    }

    let shown = &docs[..docs.len().min(display_rows)];
    let mut out = format!(
        "{label} returned {} {}.\n",
        docs.len(),
        plural(docs.len(), "document", "documents")
    );
    out.push_str(&table.format_documents(shown));

    if docs.len() > shown.len() {
        out.push_str(&format!(
            "\n... and {} more documents",
            docs.len() - shown.len()
        ));
    }

    out
}

/// Pick the singular or plural noun for `count`
pub fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

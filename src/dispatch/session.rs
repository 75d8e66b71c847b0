//! Per-conversation state handed to every operation

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::formatter::TableFormatter;
use crate::store::DataSource;

/// Limits applied when operations build their display text
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLimits {
    /// Default `limit` of `execute_query`
    pub default_query_limit: i64,
    /// Rows shown in result tables
    pub display_rows: usize,
    /// Default document count of samples
    pub sample_size: i64,
    /// Distinct values listed before truncating
    pub distinct_display_limit: usize,
    /// Width cap of a table column
    pub max_column_width: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DisplayLimits {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            default_query_limit: config.default_query_limit,
            display_rows: config.display_rows,
            sample_size: config.sample_size,
            distinct_display_limit: config.distinct_display_limit,
            max_column_width: config.max_column_width,
        }
    }
}

/// State owned by one conversation
///
/// The exploration notes live here rather than in a global so that two
/// sessions never see each other's notes. Operations get `&mut Session`,
/// which makes the running operation the only writer.
pub struct Session {
    store: Arc<dyn DataSource>,
    notes: Option<String>,
    limits: DisplayLimits,
}

impl Session {
    pub fn new(store: Arc<dyn DataSource>) -> Self {
        Self {
            store,
            notes: None,
            limits: DisplayLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: DisplayLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> &dyn DataSource {
        self.store.as_ref()
    }

    pub fn limits(&self) -> &DisplayLimits {
        &self.limits
    }

    /// Notes of the last exploration, if any
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn set_notes(&mut self, notes: String) {
        self.notes = Some(notes);
    }

    /// Table formatter honoring the configured column width
    pub fn table(&self) -> TableFormatter {
        TableFormatter::new().with_max_column_width(self.limits.max_column_width)
    }
}

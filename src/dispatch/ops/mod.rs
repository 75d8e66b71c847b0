//! Whitelisted operations
//!
//! Every operation is an async function taking the session and its bound
//! arguments and returning display text. Operations are grouped by concern:
//! - `explore`: database survey, exploration notes, connection status
//! - `read`: queries, aggregations, counts and samples
//! - `write`: inserts, updates and deletes (opt-in)
//! - `index`: index listing and maintenance

mod explore;
mod index;
mod read;
mod write;

use super::registry::OperationSpec;
use super::session::Session;
use crate::error::{ExecutionError, Result};

/// Operations that never change data
pub fn read_operations() -> Vec<OperationSpec> {
    let mut ops = explore::operations();
    ops.extend(read::operations());
    ops.extend(index::read_operations());
    ops
}

/// Operations that change data or indexes
pub fn write_operations() -> Vec<OperationSpec> {
    let mut ops = write::operations();
    ops.extend(index::write_operations());
    ops
}

/// Fail unless `collection` exists in the session's database
pub(crate) async fn require_collection(session: &Session, collection: &str) -> Result<()> {
    let collections = session.store().list_collections().await?;
    if collections.iter().any(|c| c == collection) {
        Ok(())
    } else {
        Err(ExecutionError::CollectionNotFound(collection.to_string()).into())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::dispatch::{Dispatcher, Session, Whitelist};
    use crate::store::memory::MemoryStore;

    /// Session over `store` with default display limits
    pub(crate) fn session(store: &Arc<MemoryStore>) -> Session {
        Session::new(store.clone())
    }

    /// Dispatch one line with writes enabled and return its result text
    pub(crate) async fn call(session: &mut Session, line: &str) -> String {
        let dispatcher = Dispatcher::new(Whitelist::with_writes());
        let report = dispatcher.dispatch(session, line).await;
        report
            .calls()
            .next()
            .map(|call| call.outcome.display_text())
            .unwrap_or_default()
    }
}

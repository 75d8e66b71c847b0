//! Data source abstraction
//!
//! Operations reach the database only through [`DataSource`]. The production
//! implementation is [`MongoStore`]; [`OfflineStore`] stands in when no
//! connection was requested, and tests run against an in-memory store.

mod mongo;
mod offline;

#[cfg(test)]
pub(crate) mod memory;

pub use mongo::MongoStore;
pub use offline::OfflineStore;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::error::Result;

/// Parameters of a find query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    /// Maximum number of documents; `None` or `0` means no limit.
    /// Never negative when set through [`FindSpec::with_limit`].
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

impl FindSpec {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// A negative limit counts as its absolute value, as the driver reads it
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.saturating_abs());
        self
    }

    pub fn with_sort(mut self, sort: Option<Document>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_projection(mut self, projection: Option<Document>) -> Self {
        self.projection = projection;
        self
    }
}

/// Outcome of an update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<Bson>,
}

/// Index to create
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub keys: Document,
    pub unique: bool,
    pub name: Option<String>,
}

/// Database operations consumed by the whitelisted operations
///
/// Collection arguments are plain names inside the configured database.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name of the database the store is bound to
    fn database_name(&self) -> &str;

    /// Check that the server answers
    async fn ping(&self) -> Result<bool>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>>;

    async fn find_many(&self, collection: &str, spec: FindSpec) -> Result<Vec<Document>>;

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64>;

    async fn distinct(&self, collection: &str, field: &str, filter: Document)
    -> Result<Vec<Bson>>;

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>>;

    /// Insert one document; returns its `_id`
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson>;

    /// Insert documents; returns their `_id`s in input order
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        ordered: bool,
    ) -> Result<Vec<Bson>>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateSummary>;

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateSummary>;

    /// Returns the number of deleted documents
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64>;

    /// Returns the number of deleted documents
    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64>;

    /// Returns the name of the created index
    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<String>;

    /// Index descriptions, each with at least `name` and `key`
    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>>;

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()>;

    /// Output of the `dbStats` command
    async fn database_stats(&self) -> Result<Document>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_limit_is_made_positive() {
        assert_eq!(FindSpec::default().with_limit(-3).limit, Some(3));
        assert_eq!(FindSpec::default().with_limit(0).limit, Some(0));
        assert_eq!(FindSpec::default().with_limit(i64::MIN).limit, Some(i64::MAX));
    }
}

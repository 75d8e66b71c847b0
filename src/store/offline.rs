//! [`DataSource`] used when no connection was requested
//!
//! Every data call fails with `NotConnected`, so dispatch passes still run
//! and report the missing connection inline next to each call.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use super::{DataSource, FindSpec, IndexSpec, UpdateSummary};
use crate::error::{ConnectionError, Result};

pub struct OfflineStore {
    name: String,
}

impl OfflineStore {
    pub fn new(database: &str) -> Self {
        Self {
            name: database.to_string(),
        }
    }
}

fn offline<T>() -> Result<T> {
    Err(ConnectionError::NotConnected.into())
}

#[async_trait]
impl DataSource for OfflineStore {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<bool> {
        Ok(false)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        offline()
    }

    async fn find_one(
        &self,
        _collection: &str,
        _filter: Document,
        _projection: Option<Document>,
    ) -> Result<Option<Document>> {
        offline()
    }

    async fn find_many(&self, _collection: &str, _spec: FindSpec) -> Result<Vec<Document>> {
        offline()
    }

    async fn count_documents(&self, _collection: &str, _filter: Document) -> Result<u64> {
        offline()
    }

    async fn distinct(
        &self,
        _collection: &str,
        _field: &str,
        _filter: Document,
    ) -> Result<Vec<Bson>> {
        offline()
    }

    async fn aggregate(
        &self,
        _collection: &str,
        _pipeline: Vec<Document>,
    ) -> Result<Vec<Document>> {
        offline()
    }

    async fn insert_one(&self, _collection: &str, _document: Document) -> Result<Bson> {
        offline()
    }

    async fn insert_many(
        &self,
        _collection: &str,
        _documents: Vec<Document>,
        _ordered: bool,
    ) -> Result<Vec<Bson>> {
        offline()
    }

    async fn update_one(
        &self,
        _collection: &str,
        _filter: Document,
        _update: Document,
        _upsert: bool,
    ) -> Result<UpdateSummary> {
        offline()
    }

    async fn update_many(
        &self,
        _collection: &str,
        _filter: Document,
        _update: Document,
        _upsert: bool,
    ) -> Result<UpdateSummary> {
        offline()
    }

    async fn delete_one(&self, _collection: &str, _filter: Document) -> Result<u64> {
        offline()
    }

    async fn delete_many(&self, _collection: &str, _filter: Document) -> Result<u64> {
        offline()
    }

    async fn create_index(&self, _collection: &str, _index: IndexSpec) -> Result<String> {
        offline()
    }

    async fn list_indexes(&self, _collection: &str) -> Result<Vec<Document>> {
        offline()
    }

    async fn drop_index(&self, _collection: &str, _name: &str) -> Result<()> {
        offline()
    }

    async fn database_stats(&self) -> Result<Document> {
        offline()
    }
}

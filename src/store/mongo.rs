//! [`DataSource`] over the MongoDB driver

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, DateTime, Document, doc};
use mongodb::options::{FindOneOptions, FindOptions, IndexOptions, InsertManyOptions, UpdateOptions};
use mongodb::{Collection, Database, IndexModel};
use tracing::debug;

use super::{DataSource, FindSpec, IndexSpec, UpdateSummary};
use crate::connection::ConnectionManager;
use crate::error::Result;

/// Store bound to one database of a connected client
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    name: String,
}

impl MongoStore {
    /// Bind to `database` on an already connected manager
    ///
    /// # Returns
    /// * `Result<Self>` - Store, or `NotConnected` before `connect()`
    pub fn new(manager: &ConnectionManager, database: &str) -> Result<Self> {
        Ok(Self {
            db: manager.get_database(database)?,
            name: database.to_string(),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

#[async_trait]
impl DataSource for MongoStore {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<bool> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(true)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names = self.db.list_collection_names().await?;
        names.sort();
        Ok(names)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>> {
        let mut options = FindOneOptions::default();
        options.projection = projection;

        Ok(self
            .collection(collection)
            .find_one(filter)
            .with_options(options)
            .await?)
    }

    async fn find_many(&self, collection: &str, spec: FindSpec) -> Result<Vec<Document>> {
        debug!("find on '{}' with filter: {:?}", collection, spec.filter);

        let mut options = FindOptions::default();
        options.projection = spec.projection;
        options.sort = spec.sort;
        options.limit = spec.limit.filter(|limit| *limit > 0);
        options.skip = spec.skip.filter(|skip| *skip > 0);

        let cursor = self
            .collection(collection)
            .find(spec.filter)
            .with_options(options)
            .await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Document,
    ) -> Result<Vec<Bson>> {
        Ok(self.collection(collection).distinct(field, filter).await?)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        debug!("aggregate on '{}' with {} stages", collection, pipeline.len());
        let cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson> {
        stamp_created(&mut document, DateTime::now());
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        mut documents: Vec<Document>,
        ordered: bool,
    ) -> Result<Vec<Bson>> {
        let now = DateTime::now();
        for document in documents.iter_mut() {
            stamp_created(document, now);
        }

        let mut options = InsertManyOptions::default();
        options.ordered = Some(ordered);

        let result = self
            .collection(collection)
            .insert_many(documents)
            .with_options(options)
            .await?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(position, _)| *position);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateSummary> {
        let mut options = UpdateOptions::default();
        options.upsert = Some(upsert);

        let result = self
            .collection(collection)
            .update_one(filter, stamp_updated(update, DateTime::now()))
            .with_options(options)
            .await?;

        Ok(UpdateSummary {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateSummary> {
        let mut options = UpdateOptions::default();
        options.upsert = Some(upsert);

        let result = self
            .collection(collection)
            .update_many(filter, stamp_updated(update, DateTime::now()))
            .with_options(options)
            .await?;

        Ok(UpdateSummary {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<String> {
        debug!(
            "Creating index on collection '{}' with keys: {:?}",
            collection, index.keys
        );

        let mut options = IndexOptions::default();
        options.unique = index.unique.then_some(true);
        options.name = index.name;

        let model = IndexModel::builder()
            .keys(index.keys)
            .options(Some(options))
            .build();

        let result = self.collection(collection).create_index(model).await?;
        Ok(result.index_name)
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>> {
        let mut cursor = self.collection(collection).list_indexes().await?;

        let mut indexes = Vec::new();
        while let Some(index) = cursor.try_next().await? {
            indexes.push(mongodb::bson::to_document(&index)?);
        }
        Ok(indexes)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        self.collection(collection).drop_index(name).await?;
        Ok(())
    }

    async fn database_stats(&self) -> Result<Document> {
        Ok(self.db.run_command(doc! { "dbStats": 1 }).await?)
    }
}

/// Add `createdAt` unless the document already carries one
fn stamp_created(document: &mut Document, now: DateTime) {
    if !document.contains_key("createdAt") {
        document.insert("createdAt", now);
    }
}

/// Add `updatedAt` to the `$set` stage of an operator update
///
/// Replacement-style documents (no `$` keys) are returned unchanged and left
/// for the server to reject.
fn stamp_updated(mut update: Document, now: DateTime) -> Document {
    if !update.keys().any(|key| key.starts_with('$')) {
        return update;
    }

    if let Some(Bson::Document(set)) = update.get_mut("$set") {
        set.insert("updatedAt", now);
        return update;
    }
    update.insert("$set", doc! { "updatedAt": now });
    update
}

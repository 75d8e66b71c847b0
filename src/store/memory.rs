//! In-memory [`DataSource`] for tests
//!
//! Supports top-level equality and the common comparison operators in
//! filters, which is all the dispatcher tests need. Every trait call is
//! recorded so tests can assert that nothing was invoked.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};

use super::{DataSource, FindSpec, IndexSpec, UpdateSummary};
use crate::error::{ExecutionError, Result};

#[derive(Default)]
pub(crate) struct MemoryStore {
    name: String,
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
    indexes: Mutex<BTreeMap<String, Vec<Document>>>,
    calls: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl MemoryStore {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Seed a collection
    pub(crate) fn with_collection(self, name: &str, documents: Vec<Document>) -> Self {
        self.collections
            .lock()
            .unwrap()
            .insert(name.to_string(), documents);
        self
    }

    /// Make every data call fail with `message`
    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Names of the trait methods called so far, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        match &self.failure {
            Some(message) => Err(ExecutionError::QueryFailed(message.clone()).into()),
            None => Ok(()),
        }
    }

    fn matching(&self, collection: &str, filter: &Document) -> Vec<Document> {
        self.documents(collection)
            .into_iter()
            .filter(|doc| matches_filter(doc, filter))
            .collect()
    }
}

#[async_trait]
impl DataSource for MemoryStore {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<bool> {
        self.record("ping")?;
        Ok(true)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.record("list_collections")?;
        Ok(self.collections.lock().unwrap().keys().cloned().collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>> {
        self.record("find_one")?;
        Ok(self
            .matching(collection, &filter)
            .into_iter()
            .next()
            .map(|doc| project(doc, projection.as_ref())))
    }

    async fn find_many(&self, collection: &str, spec: FindSpec) -> Result<Vec<Document>> {
        self.record("find_many")?;
        let mut docs = self.matching(collection, &spec.filter);

        if let Some(sort) = &spec.sort {
            docs.sort_by(|a, b| compare_by_sort(a, b, sort));
        }

        let skip = spec.skip.unwrap_or(0) as usize;
        let limit = match spec.limit {
            Some(limit) if limit > 0 => limit as usize,
            _ => usize::MAX,
        };

        Ok(docs
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(doc, spec.projection.as_ref()))
            .collect())
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
        self.record("count_documents")?;
        Ok(self.matching(collection, &filter).len() as u64)
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Document,
    ) -> Result<Vec<Bson>> {
        self.record("distinct")?;
        let mut values: Vec<Bson> = Vec::new();
        for doc in self.matching(collection, &filter) {
            if let Some(value) = doc.get(field) {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        Ok(values)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        self.record("aggregate")?;
        let mut docs = self.documents(collection);
        for stage in pipeline {
            if let Ok(filter) = stage.get_document("$match") {
                docs.retain(|doc| matches_filter(doc, filter));
            } else if let Ok(limit) = stage.get_i32("$limit") {
                docs.truncate(limit.max(0) as usize);
            }
        }
        Ok(docs)
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson> {
        self.record("insert_one")?;
        let id = ensure_id(&mut document);
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        _ordered: bool,
    ) -> Result<Vec<Bson>> {
        self.record("insert_many")?;
        let mut ids = Vec::with_capacity(documents.len());
        let mut collections = self.collections.lock().unwrap();
        let target = collections.entry(collection.to_string()).or_default();
        for mut document in documents {
            ids.push(ensure_id(&mut document));
            target.push(document);
        }
        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        _upsert: bool,
    ) -> Result<UpdateSummary> {
        self.record("update_one")?;
        Ok(self.apply_update(collection, &filter, &update, Some(1)))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        _upsert: bool,
    ) -> Result<UpdateSummary> {
        self.record("update_many")?;
        Ok(self.apply_update(collection, &filter, &update, None))
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        self.record("delete_one")?;
        let mut collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|doc| matches_filter(doc, &filter)) {
            Some(position) => {
                docs.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
        self.record("delete_many")?;
        let mut collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches_filter(doc, &filter));
        Ok((before - docs.len()) as u64)
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<String> {
        self.record("create_index")?;
        let name = index.name.unwrap_or_else(|| {
            index
                .keys
                .iter()
                .map(|(field, direction)| format!("{field}_{direction}"))
                .collect::<Vec<_>>()
                .join("_")
        });
        let mut description = doc! { "v": 2, "key": index.keys, "name": name.clone() };
        if index.unique {
            description.insert("unique", true);
        }
        self.indexes
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(description);
        Ok(name)
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>> {
        self.record("list_indexes")?;
        let mut indexes = vec![doc! { "v": 2, "key": { "_id": 1 }, "name": "_id_" }];
        if let Some(extra) = self.indexes.lock().unwrap().get(collection) {
            indexes.extend(extra.iter().cloned());
        }
        Ok(indexes)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        self.record("drop_index")?;
        let mut indexes = self.indexes.lock().unwrap();
        let list = indexes.entry(collection.to_string()).or_default();
        let before = list.len();
        list.retain(|index| index.get_str("name").ok() != Some(name));
        if list.len() == before {
            let message = format!("index not found with name [{name}]");
            return Err(ExecutionError::QueryFailed(message).into());
        }
        Ok(())
    }

    async fn database_stats(&self) -> Result<Document> {
        self.record("database_stats")?;
        let collections = self.collections.lock().unwrap();
        let objects: usize = collections.values().map(Vec::len).sum();
        Ok(doc! {
            "db": self.name.clone(),
            "collections": (collections.len() as i64),
            "objects": (objects as i64),
            "storageSize": 4096_i64,
            "indexes": (collections.len() as i64),
        })
    }
}

impl MemoryStore {
    fn apply_update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        max: Option<usize>,
    ) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        let mut collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get_mut(collection) else {
            return summary;
        };

        for doc in docs.iter_mut().filter(|doc| matches_filter(doc, filter)) {
            if max.is_some_and(|max| summary.matched as usize >= max) {
                break;
            }
            summary.matched += 1;
            if let Ok(set) = update.get_document("$set") {
                let before = doc.clone();
                for (key, value) in set {
                    doc.insert(key.clone(), value.clone());
                }
                if *doc != before {
                    summary.modified += 1;
                }
            }
        }
        summary
    }
}

fn ensure_id(document: &mut Document) -> Bson {
    if let Some(id) = document.get("_id") {
        return id.clone();
    }
    let id = Bson::ObjectId(ObjectId::new());
    document.insert("_id", id.clone());
    id
}

fn project(doc: Document, projection: Option<&Document>) -> Document {
    let Some(projection) = projection.filter(|p| !p.is_empty()) else {
        return doc;
    };
    let include_id = !matches!(
        projection.get("_id"),
        Some(Bson::Int32(0)) | Some(Bson::Boolean(false))
    );
    doc.into_iter()
        .filter(|(key, _)| {
            if key == "_id" {
                include_id
            } else {
                projection.contains_key(key)
            }
        })
        .collect()
}

fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| {
        let value = doc.get(key);
        match condition {
            Bson::Document(ops) if ops.keys().all(|k| k.starts_with('$')) => {
                ops.iter().all(|(op, operand)| matches_operator(value, op, operand))
            }
            expected => value == Some(expected),
        }
    })
}

fn matches_operator(value: Option<&Bson>, op: &str, operand: &Bson) -> bool {
    match op {
        "$eq" => value == Some(operand),
        "$ne" => value != Some(operand),
        "$gt" => compare(value, operand) == Some(Ordering::Greater),
        "$gte" => matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => compare(value, operand) == Some(Ordering::Less),
        "$lte" => matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)),
        "$in" => match operand {
            Bson::Array(items) => value.is_some_and(|v| items.contains(v)),
            _ => false,
        },
        "$exists" => value.is_some() == matches!(operand, Bson::Boolean(true) | Bson::Int32(1)),
        _ => false,
    }
}

fn compare(value: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
    match (value?, operand) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (a, b) => as_f64(a)?.partial_cmp(&as_f64(b)?),
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

fn compare_by_sort(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, direction) in sort {
        let descending = as_f64(direction).is_some_and(|d| d < 0.0);
        let ordering = match (a.get(field), b.get(field)) {
            (Some(x), Some(y)) => compare(Some(x), y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_operators() {
        let doc = doc! { "age": 35, "name": "Ann" };
        assert!(matches_filter(&doc, &doc! { "age": { "$gt": 30 } }));
        assert!(!matches_filter(&doc, &doc! { "age": { "$lt": 30 } }));
        assert!(matches_filter(&doc, &doc! { "name": "Ann" }));
        assert!(matches_filter(&doc, &doc! { "name": { "$in": ["Ann", "Bob"] } }));
        assert!(matches_filter(&doc, &doc! {}));
    }

    #[tokio::test]
    async fn test_records_calls() {
        let store = MemoryStore::new("shop").with_collection("orders", vec![doc! { "n": 1 }]);
        assert_eq!(store.count_documents("orders", doc! {}).await.unwrap(), 1);
        assert_eq!(store.calls(), vec!["count_documents".to_string()]);
    }
}

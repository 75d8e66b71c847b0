//! Database survey and status operations

use chrono::Local;
use mongodb::bson::{Bson, Document};
use tracing::{info, warn};

use crate::dispatch::registry::{BoundArgs, OperationFuture, OperationKind, OperationSpec, Param};
use crate::dispatch::session::Session;
use crate::error::Result;
use crate::store::DataSource;
use crate::utils::convert::format_bytes;

const NO_PARAMS: &[Param] = &[];

pub(super) fn operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec {
            name: "explore_mongodb",
            params: NO_PARAMS,
            summary: "Survey every collection and store notes about the database",
            kind: OperationKind::Read,
            handler: explore_mongodb,
        },
        OperationSpec {
            name: "get_exploration_notes",
            params: NO_PARAMS,
            summary: "Return the notes of the last exploration",
            kind: OperationKind::Read,
            handler: get_exploration_notes,
        },
        OperationSpec {
            name: "get_connection_status",
            params: NO_PARAMS,
            summary: "Report the connection and database statistics",
            kind: OperationKind::Read,
            handler: get_connection_status,
        },
    ]
}

/// What exploration learned about one collection
struct CollectionSurvey {
    name: String,
    count: u64,
    /// Field names and BSON type names of the first document
    fields: Vec<(String, &'static str)>,
    indexes: Vec<String>,
}

async fn survey(store: &dyn DataSource) -> Result<Vec<CollectionSurvey>> {
    let mut surveys = Vec::new();

    for name in store.list_collections().await? {
        let count = store.count_documents(&name, Document::new()).await?;
        let fields = store
            .find_one(&name, Document::new(), None)
            .await?
            .map(|doc| {
                doc.iter()
                    .map(|(field, value)| (field.clone(), type_name(value)))
                    .collect()
            })
            .unwrap_or_default();
        let indexes = store
            .list_indexes(&name)
            .await?
            .iter()
            .filter_map(|index| index.get_str("name").ok().map(str::to_string))
            .collect();

        surveys.push(CollectionSurvey {
            name,
            count,
            fields,
            indexes,
        });
    }

    Ok(surveys)
}

fn render_notes(database: &str, surveys: &[CollectionSurvey]) -> String {
    let mut notes = vec![
        format!("## MongoDB Database: {database}"),
        format!("Explored on: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        format!("Found {} collections", surveys.len()),
        String::new(),
        "## Collections Overview".to_string(),
    ];

    for survey in surveys {
        notes.push(format!("### {}", survey.name));
        notes.push(format!("- Document count: {}", survey.count));
        let names: Vec<&str> = survey.fields.iter().map(|(f, _)| f.as_str()).collect();
        notes.push(format!("- Fields: {}", names.join(", ")));
        notes.push(format!("- Indexes: {}", survey.indexes.join(", ")));
        notes.push(String::new());
    }

    notes.push("## Collection Details".to_string());
    for survey in surveys {
        notes.push(format!("### {}", survey.name));
        notes.push("#### Schema".to_string());
        if survey.fields.is_empty() {
            notes.push("- (empty collection)".to_string());
        }
        for (field, kind) in &survey.fields {
            notes.push(format!("- {field}: {kind}"));
        }
        notes.push(String::new());
    }

    notes.join("\n").trim_end().to_string()
}

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        Bson::Decimal128(_) => "decimal",
        _ => "other",
    }
}

fn explore_mongodb(session: &mut Session, _args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let database = session.store().database_name().to_string();
        info!("Exploring database '{}'", database);

        let surveys = survey(session.store()).await?;
        session.set_notes(render_notes(&database, &surveys));

        let summary: Vec<String> = surveys
            .iter()
            .map(|s| format!("- {}: {} documents", s.name, s.count))
            .collect();
        Ok(format!(
            "MongoDB exploration completed. Found {} collections:\n{}",
            surveys.len(),
            summary.join("\n")
        ))
    })
}

fn get_exploration_notes(session: &mut Session, _args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        Ok(match session.notes() {
            Some(notes) => notes.to_string(),
            None => "MongoDB database has not been explored yet. Call explore_mongodb() first."
                .to_string(),
        })
    })
}

fn get_connection_status(session: &mut Session, _args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        match connection_status(session.store()).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!("Connection status check failed: {}", e);
                Ok(format!("MongoDB connection error: {e}"))
            }
        }
    })
}

async fn connection_status(store: &dyn DataSource) -> Result<String> {
    if !store.ping().await? {
        return Ok("Not connected to MongoDB. Check connection parameters.".to_string());
    }

    let stats = store.database_stats().await?;
    let collections = store.list_collections().await?.len();

    let storage = match stat_number(&stats, "storageSize") {
        Some(bytes) => format!("{bytes} bytes ({})", format_bytes(bytes)),
        None => "unknown".to_string(),
    };
    let count = |key: &str| {
        stat_number(&stats, key)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    };

    Ok(format!(
        "Connected to MongoDB database: {}\nCollections: {}\nStorage size: {}\nObjects: {}\nIndexes: {}",
        store.database_name(),
        collections,
        storage,
        count("objects"),
        count("indexes"),
    ))
}

/// `dbStats` numbers arrive as int, long or double depending on the server
fn stat_number(stats: &Document, key: &str) -> Option<u64> {
    match stats.get(key)? {
        Bson::Int32(n) => u64::try_from(*n).ok(),
        Bson::Int64(n) => u64::try_from(*n).ok(),
        Bson::Double(f) if *f >= 0.0 => Some(*f as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ops::testing::{call, session};
    use crate::store::memory::MemoryStore;
    use mongodb::bson::doc;
    use std::sync::Arc;

    fn shop() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new("shop")
                .with_collection(
                    "orders",
                    vec![
                        doc! { "_id": 1, "total": 9.5, "status": "paid" },
                        doc! { "_id": 2, "total": 3.0, "status": "open" },
                    ],
                )
                .with_collection("users", vec![doc! { "_id": 1, "name": "Ada" }]),
        )
    }

    #[tokio::test]
    async fn test_explore_summarizes_and_stores_notes() {
        let store = shop();
        let mut session = session(&store);

        let text = call(&mut session, "explore_mongodb()").await;
        assert_eq!(
            text,
            "MongoDB exploration completed. Found 2 collections:\n\
             - orders: 2 documents\n\
             - users: 1 documents"
        );

        let notes = session.notes().unwrap();
        assert!(notes.starts_with("## MongoDB Database: shop\nExplored on: "));
        assert!(notes.contains("### orders\n- Document count: 2\n- Fields: _id, total, status"));
        assert!(notes.contains("- Indexes: _id_"));
        assert!(notes.contains("- total: double"));
    }

    #[tokio::test]
    async fn test_notes_before_and_after_exploration() {
        let store = shop();
        let mut session = session(&store);

        let before = call(&mut session, "get_exploration_notes()").await;
        assert_eq!(
            before,
            "MongoDB database has not been explored yet. Call explore_mongodb() first."
        );

        call(&mut session, "explore_mongodb()").await;
        let after = call(&mut session, "get_exploration_notes()").await;
        assert_eq!(Some(after.as_str()), session.notes());
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_notes() {
        let store = shop();
        let mut first = session(&store);
        let mut second = session(&store);

        call(&mut first, "explore_mongodb()").await;
        assert!(first.notes().is_some());
        assert!(second.notes().is_none());
        assert!(
            call(&mut second, "get_exploration_notes()")
                .await
                .contains("not been explored")
        );
    }

    #[tokio::test]
    async fn test_explore_failure_keeps_previous_notes() {
        let store = Arc::new(MemoryStore::new("shop").failing("timed out"));
        let mut session = session(&store);
        session.set_notes("old notes".to_string());

        let text = call(&mut session, "explore_mongodb()").await;
        assert_eq!(text, "Error: explore_mongodb() failed: Query failed: timed out");
        assert_eq!(session.notes(), Some("old notes"));
    }

    #[tokio::test]
    async fn test_connection_status() {
        let store = shop();
        let mut session = session(&store);

        let text = call(&mut session, "get_connection_status()").await;
        assert_eq!(
            text,
            "Connected to MongoDB database: shop\nCollections: 2\n\
             Storage size: 4096 bytes (4.00 KB)\nObjects: 3\nIndexes: 2"
        );
    }

    #[tokio::test]
    async fn test_connection_status_reports_errors_as_text() {
        let store = Arc::new(MemoryStore::new("shop").failing("no server"));
        let mut session = session(&store);

        let text = call(&mut session, "get_connection_status()").await;
        assert_eq!(text, "MongoDB connection error: Query failed: no server");
    }

    #[test]
    fn test_stat_number_accepts_numeric_kinds() {
        let stats = doc! { "a": 5, "b": 6_i64, "c": 7.9, "d": "x", "e": -1 };
        assert_eq!(stat_number(&stats, "a"), Some(5));
        assert_eq!(stat_number(&stats, "b"), Some(6));
        assert_eq!(stat_number(&stats, "c"), Some(7));
        assert_eq!(stat_number(&stats, "d"), None);
        assert_eq!(stat_number(&stats, "e"), None);
        assert_eq!(stat_number(&stats, "missing"), None);
    }
}

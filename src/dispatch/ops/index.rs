//! Index operations

use mongodb::bson::Document;
use tracing::info;

use super::require_collection;
use crate::dispatch::registry::{BoundArgs, OperationFuture, OperationKind, OperationSpec, Param};
use crate::dispatch::session::Session;
use crate::error::ExecutionError;
use crate::formatter::{inline_document, plural};
use crate::store::IndexSpec;

const LIST_INDEXES: &[Param] = &[Param::required("collection_name")];

const CREATE_INDEX: &[Param] = &[
    Param::required("collection_name"),
    Param::required("keys"),
    Param::optional("unique"),
    Param::optional("name"),
];

const DROP_INDEX: &[Param] = &[Param::required("collection_name"), Param::required("index_name")];

pub(super) fn read_operations() -> Vec<OperationSpec> {
    vec![OperationSpec {
        name: "list_indexes",
        params: LIST_INDEXES,
        summary: "List the indexes of a collection",
        kind: OperationKind::Read,
        handler: list_indexes,
    }]
}

pub(super) fn write_operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec {
            name: "create_index",
            params: CREATE_INDEX,
            summary: "Create an index from a key specification",
            kind: OperationKind::Write,
            handler: create_index,
        },
        OperationSpec {
            name: "drop_index",
            params: DROP_INDEX,
            summary: "Drop an index by name",
            kind: OperationKind::Write,
            handler: drop_index,
        },
    ]
}

fn describe(index: &Document) -> String {
    let name = index.get_str("name").unwrap_or("(unnamed)");
    let keys = index
        .get_document("key")
        .map(inline_document)
        .unwrap_or_else(|_| "{}".to_string());
    let unique = if index.get_bool("unique").unwrap_or(false) {
        " (unique)"
    } else {
        ""
    };
    format!("- {name}: {keys}{unique}")
}

fn list_indexes(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let indexes = session.store().list_indexes(&collection).await?;
        let lines: Vec<String> = indexes.iter().map(describe).collect();
        Ok(format!(
            "Collection '{}' has {} {}:\n{}",
            collection,
            indexes.len(),
            plural(indexes.len(), "index", "indexes"),
            lines.join("\n")
        ))
    })
}

fn create_index(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let spec = IndexSpec {
            keys: args.key_spec("keys")?,
            unique: args.opt_bool("unique")?.unwrap_or(false),
            name: args.opt_string("name")?,
        };
        if spec.keys.is_empty() {
            return Err(ExecutionError::InvalidParameters("'keys' must name a field".into()).into());
        }

        info!("Creating index {:?} on {}", spec.keys, collection);
        let name = session.store().create_index(&collection, spec).await?;
        Ok(format!("Created index '{name}' on '{collection}'."))
    })
}

fn drop_index(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let name = args.string("index_name")?;
        if name == "_id_" {
            return Err(ExecutionError::InvalidParameters(
                "the _id_ index cannot be dropped".into(),
            )
            .into());
        }

        session.store().drop_index(&collection, &name).await?;
        Ok(format!("Dropped index '{name}' from '{collection}'."))
    })
}

//! Data-changing operations
//!
//! Registered only when writes are enabled. Inserts may create the target
//! collection, so unlike the read operations these do not require that the
//! collection already exists.

use mongodb::bson::{Bson, Document};
use tracing::info;

use crate::dispatch::registry::{
    BoundArgs, Handler, OperationFuture, OperationKind, OperationSpec, Param,
};
use crate::dispatch::session::Session;
use crate::error::{ExecutionError, Result};
use crate::formatter::{inline_value, plural};
use crate::store::UpdateSummary;

const INSERT_ONE: &[Param] = &[Param::required("collection_name"), Param::required("document")];

const INSERT_MANY: &[Param] = &[
    Param::required("collection_name"),
    Param::required("documents"),
    Param::optional("ordered"),
];

const UPDATE: &[Param] = &[
    Param::required("collection_name"),
    Param::required("query"),
    Param::required("update"),
    Param::optional("upsert"),
];

const DELETE: &[Param] = &[Param::required("collection_name"), Param::required("query")];

fn write(
    name: &'static str,
    params: &'static [Param],
    summary: &'static str,
    handler: Handler,
) -> OperationSpec {
    OperationSpec {
        name,
        params,
        summary,
        kind: OperationKind::Write,
        handler,
    }
}

pub(super) fn operations() -> Vec<OperationSpec> {
    vec![
        write("insert_one", INSERT_ONE, "Insert one document", insert_one),
        write("insert_many", INSERT_MANY, "Insert a list of documents", insert_many),
        write(
            "update_one",
            UPDATE,
            "Apply an update to the first matching document",
            update_one,
        ),
        write(
            "update_many",
            UPDATE,
            "Apply an update to every matching document",
            update_many,
        ),
        write("delete_one", DELETE, "Delete the first matching document", delete_one),
        write("delete_many", DELETE, "Delete every matching document", delete_many),
    ]
}

fn display_id(id: &Bson) -> String {
    inline_value(&id.clone().into_relaxed_extjson())
}

/// Updates must be operator documents such as `{"$set": {...}}`
fn require_operators(update: &Document) -> Result<()> {
    if update.is_empty() {
        return Err(ExecutionError::InvalidParameters("'update' must not be empty".into()).into());
    }
    if let Some(key) = update.keys().find(|key| !key.starts_with('$')) {
        return Err(ExecutionError::InvalidParameters(format!(
            "'update' must only contain update operators such as $set, found '{key}'"
        ))
        .into());
    }
    Ok(())
}

fn update_text(collection: &str, summary: &UpdateSummary) -> String {
    let mut out = format!(
        "Matched {} {} and modified {} in '{}'.",
        summary.matched,
        plural(summary.matched as usize, "document", "documents"),
        summary.modified,
        collection
    );
    if let Some(id) = &summary.upserted_id {
        out.push_str(&format!("\nUpserted document with _id {}", display_id(id)));
    }
    out
}

fn insert_one(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let document = args.document("document")?;

        info!("Inserting one document into {}", collection);
        let id = session.store().insert_one(&collection, document).await?;
        Ok(format!(
            "Inserted 1 document into '{collection}' with _id {}",
            display_id(&id)
        ))
    })
}

fn insert_many(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let documents = args.documents("documents")?;
        let ordered = args.opt_bool("ordered")?.unwrap_or(true);

        if documents.is_empty() {
            return Err(
                ExecutionError::InvalidParameters("'documents' must not be empty".into()).into(),
            );
        }

        info!(
            "Inserting {} documents into {} (ordered: {})",
            documents.len(),
            collection,
            ordered
        );
        let ids = session
            .store()
            .insert_many(&collection, documents, ordered)
            .await?;
        let shown: Vec<String> = ids.iter().map(display_id).collect();
        Ok(format!(
            "Inserted {} {} into '{}'.\nInserted ids: [{}]",
            ids.len(),
            plural(ids.len(), "document", "documents"),
            collection,
            shown.join(", ")
        ))
    })
}

fn update_one(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let filter = args.document("query")?;
        let update = args.document("update")?;
        let upsert = args.opt_bool("upsert")?.unwrap_or(false);
        require_operators(&update)?;

        let summary = session
            .store()
            .update_one(&collection, filter, update, upsert)
            .await?;
        Ok(update_text(&collection, &summary))
    })
}

fn update_many(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let filter = args.document("query")?;
        let update = args.document("update")?;
        let upsert = args.opt_bool("upsert")?.unwrap_or(false);
        require_operators(&update)?;

        let summary = session
            .store()
            .update_many(&collection, filter, update, upsert)
            .await?;
        Ok(update_text(&collection, &summary))
    })
}

fn delete_one(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let filter = args.document("query")?;

        let deleted = session.store().delete_one(&collection, filter).await?;
        Ok(format!(
            "Deleted {deleted} {} from '{collection}'.",
            plural(deleted as usize, "document", "documents")
        ))
    })
}

fn delete_many(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let filter = args.document("query")?;

        let deleted = session.store().delete_many(&collection, filter).await?;
        Ok(format!(
            "Deleted {deleted} {} from '{collection}'.",
            plural(deleted as usize, "document", "documents")
        ))
    })
}

//! Query operations

use mongodb::bson::{Document, doc};
use tracing::info;

use super::require_collection;
use crate::dispatch::registry::{
    BoundArgs, Handler, OperationFuture, OperationKind, OperationSpec, Param,
};
use crate::dispatch::session::Session;
use crate::formatter::{JsonFormatter, inline_document, inline_values, summarize_documents};
use crate::store::FindSpec;

/// Query operators accepted at the top level of a filter
const QUERY_OPERATORS: &[&str] = &[
    "$eq", "$gt", "$gte", "$lt", "$lte", "$ne", "$in", "$nin", "$and", "$or", "$not", "$nor",
    "$exists", "$type", "$regex", "$text", "$where", "$expr", "$jsonSchema", "$mod",
    "$elemMatch",
];

const NO_PARAMS: &[Param] = &[];

const EXECUTE_QUERY: &[Param] = &[
    Param::required("collection_name"),
    Param::optional("query"),
    Param::optional("limit"),
    Param::optional("sort"),
    Param::optional("projection"),
];

const EXECUTE_AGGREGATION: &[Param] = &[
    Param::required("collection_name"),
    Param::required("aggregation_pipeline"),
];

const CREATE_VISUALIZATION: &[Param] = &[
    Param::required("collection_name"),
    Param::required("viz_type"),
    Param::optional("query"),
    Param::optional("params"),
    Param::optional("output_path"),
    Param::optional("aggregation_pipeline"),
];

const COLLECTION_SAMPLE: &[Param] = &[Param::required("collection_name"), Param::optional("count")];

const COLLECTION_AND_QUERY: &[Param] = &[Param::required("collection_name"), Param::optional("query")];

const VALIDATE_QUERY: &[Param] = &[Param::required("collection_name"), Param::required("query")];

const DISTINCT_VALUES: &[Param] = &[
    Param::required("collection_name"),
    Param::required("field"),
    Param::optional("query"),
];

const FIND_ONE: &[Param] = &[
    Param::required("collection_name"),
    Param::optional("query"),
    Param::optional("projection"),
];

const FIND_MANY: &[Param] = &[
    Param::required("collection_name"),
    Param::optional("query"),
    Param::optional("projection"),
    Param::optional("sort"),
    Param::optional("limit"),
    Param::optional("skip"),
];

fn read(
    name: &'static str,
    params: &'static [Param],
    summary: &'static str,
    handler: Handler,
) -> OperationSpec {
    OperationSpec {
        name,
        params,
        summary,
        kind: OperationKind::Read,
        handler,
    }
}

pub(super) fn operations() -> Vec<OperationSpec> {
    vec![
        read(
            "execute_query",
            EXECUTE_QUERY,
            "Run a find query and show the matches as a table",
            execute_query,
        ),
        read(
            "execute_aggregation",
            EXECUTE_AGGREGATION,
            "Run an aggregation pipeline and show the output as a table",
            execute_aggregation,
        ),
        read(
            "create_visualization",
            CREATE_VISUALIZATION,
            "Request a chart of collection data",
            create_visualization,
        ),
        read(
            "get_collection_sample",
            COLLECTION_SAMPLE,
            "Show the first documents of a collection as JSON",
            get_collection_sample,
        ),
        read(
            "count_documents",
            COLLECTION_AND_QUERY,
            "Count the documents matching a filter",
            count_documents,
        ),
        read(
            "validate_query",
            VALIDATE_QUERY,
            "Check a filter's top-level operators without running it",
            validate_query,
        ),
        read(
            "get_distinct_values",
            DISTINCT_VALUES,
            "List the distinct values of a field",
            get_distinct_values,
        ),
        read(
            "list_collections",
            NO_PARAMS,
            "List the collections of the database",
            list_collections,
        ),
        read(
            "find_one",
            FIND_ONE,
            "Show the first document matching a filter",
            find_one,
        ),
        read(
            "find_many",
            FIND_MANY,
            "Run a find query with projection, sort, limit and skip",
            find_many,
        ),
    ]
}

fn execute_query(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let filter = args.opt_document("query")?.unwrap_or_default();
        let sort = args.opt_sort("sort")?;
        let projection = args.opt_document("projection")?;
        let limit = args
            .opt_i64("limit")?
            .unwrap_or(session.limits().default_query_limit);

        info!("Executing query on collection: {}", collection);
        let spec = FindSpec::new(filter)
            .with_limit(limit)
            .with_sort(sort)
            .with_projection(projection);
        let docs = session.store().find_many(&collection, spec).await?;

        Ok(summarize_documents(
            "Query",
            &docs,
            session.limits().display_rows,
            &session.table(),
        ))
    })
}

fn execute_aggregation(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let pipeline = args.pipeline("aggregation_pipeline")?;
        info!(
            "Executing aggregation on collection: {} ({} stages)",
            collection,
            pipeline.len()
        );
        let docs = session.store().aggregate(&collection, pipeline).await?;

        Ok(summarize_documents(
            "Aggregation",
            &docs,
            session.limits().display_rows,
            &session.table(),
        ))
    })
}

/// Charts are drawn by the front end; the call only records the request
fn create_visualization(_session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        let viz_type = args.string("viz_type")?;
        info!(
            "Creating {} visualization for collection: {}",
            viz_type, collection
        );
        Ok(
            "Visualization functionality is handled by the UI. This is a placeholder function."
                .to_string(),
        )
    })
}

fn get_collection_sample(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        // A sample is never the whole collection; 0 falls back to the default size
        let count = match args.opt_i64("count")? {
            Some(count) if count != 0 => count,
            _ => session.limits().sample_size,
        };
        let spec = FindSpec::new(Document::new())
            .with_limit(count)
            .with_sort(Some(doc! { "_id": 1 }));
        let samples = session.store().find_many(&collection, spec).await?;

        if samples.is_empty() {
            return Ok(format!("No documents found in collection '{collection}'."));
        }

        Ok(format!(
            "Sample of {} documents from '{}':\n{}",
            samples.len(),
            collection,
            JsonFormatter::default().format_documents(&samples)?
        ))
    })
}

fn count_documents(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let filter = args.opt_document("query")?.unwrap_or_default();
        let count = session
            .store()
            .count_documents(&collection, filter.clone())
            .await?;

        let matching = if filter.is_empty() {
            String::new()
        } else {
            format!(" matching query {}", inline_document(&filter))
        };
        Ok(format!(
            "Collection '{collection}' contains {count} documents{matching}."
        ))
    })
}

fn validate_query(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let query = args.document("query")?;
        let invalid: Vec<&str> = query
            .keys()
            .map(String::as_str)
            .filter(|key| key.starts_with('$') && !QUERY_OPERATORS.contains(key))
            .collect();

        if invalid.is_empty() {
            Ok("Query validation successful. The query appears to be valid MongoDB syntax."
                .to_string())
        } else {
            Ok(format!(
                "Error: Query contains invalid MongoDB operators: {}",
                invalid.join(", ")
            ))
        }
    })
}

fn get_distinct_values(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let field = args.string("field")?;
        let filter = args.opt_document("query")?.unwrap_or_default();
        let values = session.store().distinct(&collection, &field, filter).await?;

        if values.is_empty() {
            return Ok(format!(
                "No distinct values found for field '{field}' in collection '{collection}'."
            ));
        }

        let limit = session.limits().distinct_display_limit;
        let shown = &values[..values.len().min(limit)];
        let mut out = format!(
            "Found {} distinct values for field '{}' in collection '{}'.\nValues: {}",
            values.len(),
            field,
            collection,
            inline_values(shown)
        );
        if values.len() > shown.len() {
            out.push_str(&format!(
                "\n... and {} more values",
                values.len() - shown.len()
            ));
        }
        Ok(out)
    })
}

fn list_collections(session: &mut Session, _args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collections = session.store().list_collections().await?;
        if collections.is_empty() {
            return Ok(format!(
                "No collections found in database '{}'.",
                session.store().database_name()
            ));
        }
        Ok(format!(
            "Found {} collections: {}",
            collections.len(),
            collections.join(", ")
        ))
    })
}

fn find_one(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let filter = args.opt_document("query")?.unwrap_or_default();
        let projection = args.opt_document("projection")?;

        match session
            .store()
            .find_one(&collection, filter, projection)
            .await?
        {
            Some(doc) => JsonFormatter::default().format_document(&doc),
            None => Ok("No document matched the query.".to_string()),
        }
    })
}

fn find_many(session: &mut Session, args: BoundArgs) -> OperationFuture<'_> {
    Box::pin(async move {
        let collection = args.string("collection_name")?;
        require_collection(session, &collection).await?;

        let mut spec = FindSpec::new(args.opt_document("query")?.unwrap_or_default())
            .with_projection(args.opt_document("projection")?)
            .with_sort(args.opt_sort("sort")?)
            .with_limit(args.opt_i64("limit")?.unwrap_or(0));
        spec.skip = args
            .opt_i64("skip")?
            .filter(|skip| *skip > 0)
            .map(|skip| skip as u64);

        let docs = session.store().find_many(&collection, spec).await?;

        Ok(summarize_documents(
            "Query",
            &docs,
            session.limits().display_rows,
            &session.table(),
        ))
    })
}

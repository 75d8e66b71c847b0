//! Document tables for query and aggregation results
//!
//! Columns are the union of the shown documents' keys in first-seen order,
//! `_id` first. Cells hold shell-style previews so one document stays on one
//! row.

use mongodb::bson::{Bson, Document};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Modify, Style,
        object::{Rows, Segment},
        width::Width,
    },
};

const DEFAULT_MAX_COLUMN_WIDTH: usize = 30;

/// Arrays up to this length are listed inline
const INLINE_ARRAY_ITEMS: usize = 3;

/// Subdocuments up to this many fields are listed inline
const INLINE_DOCUMENT_FIELDS: usize = 2;

/// Hex digits of binary data shown before eliding
const BINARY_PREVIEW: usize = 16;

/// psql-style table writer with a per-column width cap
pub struct TableFormatter {
    max_column_width: usize,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
        }
    }

    /// Cap every column at `width` characters; longer cells end in `...`
    pub fn with_max_column_width(mut self, width: usize) -> Self {
        self.max_column_width = width;
        self
    }

    /// Render documents as a table
    ///
    /// Missing fields leave the cell empty.
    pub fn format_documents(&self, docs: &[Document]) -> String {
        let columns = column_names(docs);
        if columns.is_empty() {
            return "(no fields)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(columns.iter().cloned());
        for doc in docs {
            builder.push_record(
                columns
                    .iter()
                    .map(|column| doc.get(column).map(shell_value).unwrap_or_default()),
            );
        }

        let cell_width = Width::truncate(self.max_column_width).suffix("...");
        let mut table = builder.build();
        table
            .with(Style::psql())
            .with(Modify::new(Segment::all()).with(cell_width))
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn column_names(docs: &[Document]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut has_id = false;

    for key in docs.iter().flat_map(|doc| doc.keys()) {
        if key == "_id" {
            has_id = true;
        } else if !columns.contains(key) {
            columns.push(key.clone());
        }
    }

    if has_id {
        columns.insert(0, "_id".to_string());
    }
    columns
}

/// Shell-style text of one BSON value, as shown in a table cell
///
/// Wrapper types keep their mongo shell spelling (`ObjectId('..')`,
/// `ISODate('..')`, `Long('..')`). Large containers collapse to a size.
pub fn shell_value(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => format!("Long('{n}')"),
        Bson::Double(f) if f.fract() == 0.0 && f.abs() < 1e10 => format!("{f:.0}"),
        Bson::Double(f) => f.to_string(),
        Bson::Decimal128(d) => format!("NumberDecimal('{d}')"),
        Bson::Boolean(b) => b.to_string(),
        Bson::Null => "null".to_string(),
        Bson::Undefined => "undefined".to_string(),
        Bson::ObjectId(oid) => format!("ObjectId('{oid}')"),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(iso) => format!("ISODate('{iso}')"),
            Err(_) => format!("ISODate({})", dt.timestamp_millis()),
        },
        Bson::Timestamp(ts) => format!("Timestamp({}, {})", ts.time, ts.increment),
        Bson::RegularExpression(re) => format!("/{}/{}", re.pattern, re.options),
        Bson::Binary(bin) => {
            let hex = hex::encode(&bin.bytes);
            if hex.len() > BINARY_PREVIEW {
                format!("Binary({}...)", &hex[..BINARY_PREVIEW])
            } else {
                format!("Binary({hex})")
            }
        }
        Bson::Array(items) => array_preview(items),
        Bson::Document(doc) => document_preview(doc),
        Bson::MinKey => "MinKey".to_string(),
        Bson::MaxKey => "MaxKey".to_string(),
        other => format!("{other:?}"),
    }
}

fn array_preview(items: &[Bson]) -> String {
    if items.len() > INLINE_ARRAY_ITEMS {
        return format!("[Array({})]", items.len());
    }
    let shown: Vec<String> = items.iter().map(shell_value).collect();
    format!("[{}]", shown.join(", "))
}

fn document_preview(doc: &Document) -> String {
    if doc.len() > INLINE_DOCUMENT_FIELDS {
        return format!("{{Object({})}}", doc.len());
    }
    let shown: Vec<String> = doc
        .iter()
        .map(|(key, value)| format!("{key}: {}", shell_value(value)))
        .collect();
    format!("{{{}}}", shown.join(", "))
}

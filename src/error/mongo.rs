use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured error information extracted from MongoDB errors.
///
/// Serialized into structured log fields; rendered as one readable line
/// for inline results.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) details: Option<ErrorDetails>,
}

/// Additional error details extracted from MongoDB error details document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) key: Option<bson::Document>,
}

impl ErrorInfo {
    /// Convert error info to compact JSON string (single line).
    pub fn to_json_compact(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// One-line summary: `Name (code): message`.
    pub fn summary(&self) -> String {
        let message = self.message.as_deref().unwrap_or("unknown MongoDB error");
        let mut out = match (&self.name, self.code) {
            (Some(name), Some(code)) => format!("{name} ({code}): {message}"),
            (None, Some(code)) => format!("code {code}: {message}"),
            _ => message.to_string(),
        };

        if let Some(details) = &self.details {
            if let Some(index) = &details.index {
                out.push_str(&format!(" [index: {index}]"));
            }
            if let Some(key) = &details.key {
                out.push_str(&format!(" [key: {key}]"));
            }
        }

        out
    }
}

/// Format MongoDB errors as a single readable line.
///
/// Used by the parent module's `Display` implementation for
/// `DispatchError::MongoDb`, which ends up inline in dispatch results.
pub fn format_mongodb_error(
    f: &mut fmt::Formatter<'_>,
    error: &mongodb::error::Error,
) -> fmt::Result {
    let info = extract_error_info(error);
    write!(f, "MongoDB error: {}", info.summary())
}

/// Extract structured information from a MongoDB error using the driver API.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    use mongodb::error::{ErrorKind, WriteFailure};

    let (kind, server) = match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => (
            "write_error",
            Some(ServerError::new(e.code, &e.message).with_details(e.details.as_ref())),
        ),
        ErrorKind::Write(WriteFailure::WriteConcernError(e)) => {
            ("write_error", Some(ServerError::new(e.code, &e.message)))
        }
        ErrorKind::Command(e) => ("command_error", Some(ServerError::new(e.code, &e.message))),
        ErrorKind::InsertMany(e) => {
            let first_write = e.write_errors.as_ref().and_then(|errors| errors.first());
            let server = match (first_write, &e.write_concern_error) {
                (Some(w), _) => {
                    Some(ServerError::new(w.code, &w.message).with_details(w.details.as_ref()))
                }
                (None, Some(wc)) => Some(ServerError::new(wc.code, &wc.message)),
                (None, None) => None,
            };
            ("insert_many_error", server)
        }
        ErrorKind::Authentication { message, .. } => {
            return client_side("authentication_error", message);
        }
        ErrorKind::InvalidArgument { message, .. } => {
            return client_side("invalid_argument", message);
        }
        ErrorKind::ServerSelection { message, .. } => {
            return client_side("server_selection_error", message);
        }
        _ => {
            return ErrorInfo {
                message: Some(error.to_string()),
                ..Default::default()
            };
        }
    };

    let mut info = ErrorInfo {
        error_type: Some(format!("mongo.{kind}")),
        ..Default::default()
    };
    if let Some(server) = server {
        info.name = error_name(server.code).map(str::to_string);
        info.message = Some(if matches!(server.code, 11000 | 11001) {
            "Duplicate key error".to_string()
        } else {
            server.message
        });
        info.code = Some(server.code);
        info.details = server.details;
    }
    info
}

/// Code, message and details reported by the server
struct ServerError {
    code: i32,
    message: String,
    details: Option<ErrorDetails>,
}

impl ServerError {
    fn new(code: i32, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: None,
        }
    }

    fn with_details(mut self, document: Option<&bson::Document>) -> Self {
        self.details = Some(error_details(document, &self.message));
        self
    }
}

fn client_side(kind: &str, message: &str) -> ErrorInfo {
    ErrorInfo {
        error_type: Some(format!("mongo.{kind}")),
        message: Some(message.to_string()),
        ..Default::default()
    }
}

/// Name of the common server error codes
fn error_name(code: i32) -> Option<&'static str> {
    Some(match code {
        2 => "BadValue",
        11 => "UserNotFound",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        27 => "IndexNotFound",
        50 => "MaxTimeMSExpired",
        85 => "IndexOptionsConflict",
        86 => "IndexKeySpecsConflict",
        121 => "DocumentValidationFailure",
        11000 | 11001 => "DuplicateKey",
        _ => return None,
    })
}

/// Details from the server's details document, falling back to the message
///
/// Duplicate-key messages name the collection and index inline
/// (`collection: shop.users index: email_1 dup key`).
fn error_details(document: Option<&bson::Document>, message: &str) -> ErrorDetails {
    let field = |keys: [&str; 2]| {
        document.and_then(|doc| keys.iter().find_map(|k| doc.get_str(k).ok().map(str::to_string)))
    };
    ErrorDetails {
        collection: field(["namespace", "ns"]).or_else(|| word_after(message, "collection: ")),
        index: field(["index", "indexName"]).or_else(|| word_after(message, "index: ")),
        key: document.and_then(|doc| {
            ["keyValue", "keyPattern"]
                .iter()
                .find_map(|k| doc.get_document(k).ok().cloned())
        }),
    }
}

fn word_after(message: &str, marker: &str) -> Option<String> {
    let start = message.find(marker)? + marker.len();
    let rest = &message[start..];
    let end = rest.find(' ')?;
    Some(rest[..end].to_string())
}

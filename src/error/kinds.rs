use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`DispatchError`] as the error.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Top-level error type for dispatcher operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum DispatchError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// Argument or literal parsing errors.
    Parse(ParseError),

    /// Operation execution errors.
    Execution(ExecutionError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// BSON conversion errors.
    Bson(String),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

/// Parsing-specific errors.
#[derive(Debug)]
pub enum ParseError {
    /// A string argument was expected to hold JSON but did not.
    InvalidJson { argument: String, reason: String },
}

/// Execution-specific errors.
#[derive(Debug)]
pub enum ExecutionError {
    /// The name is not part of the whitelist.
    UnknownFunction(String),

    /// A required parameter received no value.
    MissingArgument { function: String, argument: String },

    /// A keyword argument does not match any parameter.
    UnexpectedArgument { function: String, argument: String },

    /// A parameter received both a positional and a keyword value.
    DuplicateArgument { function: String, argument: String },

    /// More positional values than parameters.
    TooManyArguments {
        function: String,
        expected: usize,
        given: usize,
    },

    /// Invalid operation parameters.
    InvalidParameters(String),

    /// Collection is not present in the database.
    CollectionNotFound(String),

    /// Query execution failed.
    QueryFailed(String),

    /// The operation panicked while running.
    Panicked(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Connection(e) => write!(f, "Connection error: {e}"),
            DispatchError::Parse(e) => write!(f, "{e}"),
            DispatchError::Execution(e) => write!(f, "{e}"),
            DispatchError::Config(e) => write!(f, "Configuration error: {e}"),
            DispatchError::Io(e) => write!(f, "I/O error: {e}"),
            DispatchError::MongoDb(e) => format_mongodb_error(f, e),
            DispatchError::Bson(msg) => write!(f, "BSON conversion error: {msg}"),
            DispatchError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidJson { argument, reason } => {
                write!(f, "Invalid JSON for argument '{argument}': {reason}")
            }
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::UnknownFunction(name) => {
                write!(f, "Function '{name}' is not a registered operation")
            }
            ExecutionError::MissingArgument { function, argument } => {
                write!(f, "{function}() missing required argument '{argument}'")
            }
            ExecutionError::UnexpectedArgument { function, argument } => {
                write!(f, "{function}() got an unexpected keyword argument '{argument}'")
            }
            ExecutionError::DuplicateArgument { function, argument } => {
                write!(f, "{function}() got multiple values for argument '{argument}'")
            }
            ExecutionError::TooManyArguments {
                function,
                expected,
                given,
            } => write!(
                f,
                "{function}() takes {expected} positional argument(s) but {given} were given"
            ),
            ExecutionError::InvalidParameters(msg) => write!(f, "Invalid parameters: {msg}"),
            ExecutionError::CollectionNotFound(name) => {
                write!(f, "Collection '{name}' does not exist in the database.")
            }
            ExecutionError::QueryFailed(msg) => write!(f, "Query failed: {msg}"),
            ExecutionError::Panicked(msg) => write!(f, "Operation panicked: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for DispatchError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ParseError {}
impl std::error::Error for ExecutionError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to DispatchError ========================= */

impl From<io::Error> for DispatchError {
    fn from(err: io::Error) -> Self {
        DispatchError::Io(err)
    }
}

impl From<mongodb::error::Error> for DispatchError {
    fn from(err: mongodb::error::Error) -> Self {
        DispatchError::MongoDb(err)
    }
}

impl From<mongodb::bson::ser::Error> for DispatchError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        DispatchError::Bson(err.to_string())
    }
}

impl From<mongodb::bson::extjson::de::Error> for DispatchError {
    fn from(err: mongodb::bson::extjson::de::Error) -> Self {
        DispatchError::Bson(err.to_string())
    }
}

impl From<ConnectionError> for DispatchError {
    fn from(err: ConnectionError) -> Self {
        DispatchError::Connection(err)
    }
}

impl From<ParseError> for DispatchError {
    fn from(err: ParseError) -> Self {
        DispatchError::Parse(err)
    }
}

impl From<ExecutionError> for DispatchError {
    fn from(err: ExecutionError) -> Self {
        DispatchError::Execution(err)
    }
}

impl From<ConfigError> for DispatchError {
    fn from(err: ConfigError) -> Self {
        DispatchError::Config(err)
    }
}

impl From<toml::de::Error> for DispatchError {
    fn from(err: toml::de::Error) -> Self {
        DispatchError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<toml::ser::Error> for DispatchError {
    fn from(err: toml::ser::Error) -> Self {
        DispatchError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<String> for DispatchError {
    fn from(msg: String) -> Self {
        DispatchError::Generic(msg)
    }
}

impl From<&str> for DispatchError {
    fn from(msg: &str) -> Self {
        DispatchError::Generic(msg.to_owned())
    }
}

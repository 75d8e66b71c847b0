//! MongoDB function-call dispatcher
//!
//! Takes free-form text, typically produced by a language model, finds the
//! lines that call a whitelisted MongoDB operation, runs them against the
//! configured database and weaves the results back into the text.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `dispatch`: Whitelist, argument binding and the dispatch pass
//! - `error`: Error types and handling
//! - `formatter`: Result text (tables and JSON)
//! - `parser`: Call recognition and argument literals
//! - `reply`: Chat-message mode over fenced code blocks
//! - `repl`: Interactive prompt
//! - `store`: Data source abstraction and the MongoDB implementation
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mongo_dispatch::{
//!     config::Config, connection::ConnectionManager, dispatch::{Dispatcher, Session, Whitelist},
//!     store::MongoStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(
//!         "mongodb://localhost:27017".to_string(),
//!         config.connection.clone(),
//!     );
//!     manager.connect().await?;
//!
//!     let store = MongoStore::new(&manager, "shop")?;
//!     let mut session = Session::new(Arc::new(store));
//!     let dispatcher = Dispatcher::new(Whitelist::read_only());
//!
//!     let report = dispatcher
//!         .dispatch(&mut session, "count_documents(\"orders\")")
//!         .await;
//!     println!("{}", report.render());
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod reply;
pub mod repl;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use dispatch::{DispatchReport, Dispatcher, Session, Whitelist};
pub use error::{DispatchError, Result};
pub use store::{DataSource, MongoStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

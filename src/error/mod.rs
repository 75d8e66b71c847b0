//! Error handling for the dispatcher.
//!
//! Errors inside the crate travel as [`DispatchError`] and are propagated with
//! `?`. They stop at the dispatcher boundary: every failure of a single call
//! is rendered into the inline result text instead of aborting the pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_dispatch::error::{DispatchError, ExecutionError, Result};
//!
//! fn require_collection(known: &[String], name: &str) -> Result<()> {
//!     if known.iter().any(|c| c == name) {
//!         Ok(())
//!     } else {
//!         Err(ExecutionError::CollectionNotFound(name.to_string()).into())
//!     }
//! }
//!
//! let err: DispatchError = "boom".into();
//! assert_eq!(err.to_string(), "boom");
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, DispatchError, ExecutionError, ParseError, Result,
};
pub use mongo::{ErrorDetails, ErrorInfo};

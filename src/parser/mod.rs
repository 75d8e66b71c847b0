//! Parsing of generated call text
//!
//! This module turns the lines of a model response into structured calls:
//! - `call`: recognition of a single-line `name(args)` expression
//! - `args`: splitting the argument text into positional and keyword segments
//! - `literal`: lenient decoding of one segment into a [`Literal`]
//!
//! Nothing in here fails. Text that cannot be recognized as a call is
//! passed through by the dispatcher, and argument text that cannot be decoded
//! is kept as a raw string.
//!
//! # Examples
//!
//! ```
//! use mongo_dispatch::parser::{parse_arguments, CallExpression, Literal};
//!
//! let call = CallExpression::recognize(
//!     r#"find_many("users", {"age": {"$gt": 30}}, limit=2)"#,
//! )
//! .unwrap();
//! assert_eq!(call.name, "find_many");
//!
//! let args = parse_arguments(call.raw_arguments);
//! assert_eq!(args.positional[0], Literal::Str("users".into()));
//! assert_eq!(args.keyword["limit"], Literal::Int(2));
//! ```

mod args;
mod call;
mod literal;

pub use args::{ParsedArgs, parse_arguments};
pub use call::{CallExpression, is_comment_or_blank};
pub use literal::Literal;

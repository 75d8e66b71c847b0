//! Whitelisted function-call dispatcher
//!
//! A dispatch pass walks a block of text line by line. Lines that are a single
//! `name(args)` call naming a registered operation are executed; every other
//! line passes through untouched. Failures of any kind are captured as text
//! next to the call that caused them, so a pass always produces a complete
//! output.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mongo_dispatch::dispatch::{Dispatcher, Session, Whitelist};
//! use mongo_dispatch::store::DataSource;
//!
//! async fn run(store: Arc<dyn DataSource>) {
//!     let dispatcher = Dispatcher::new(Whitelist::read_only());
//!     let mut session = Session::new(store);
//!
//!     let report = dispatcher
//!         .dispatch(&mut session, "# how many?\ncount_documents(\"orders\")")
//!         .await;
//!     println!("{}", report.render());
//! }
//! ```

pub mod ops;
mod registry;
mod session;

pub use registry::{
    BoundArgs, Handler, OperationFuture, OperationKind, OperationSpec, Param, Signature, Whitelist,
};
pub use session::{DisplayLimits, Session};

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::error::mongo::extract_error_info;
use crate::error::{DispatchError, ExecutionError};
use crate::parser::{CallExpression, is_comment_or_blank, parse_arguments};
use crate::utils::string::{one_line, truncate};

/// Result of one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Display text produced by the operation
    Success(String),
    /// Why the call produced no result
    Failure(String),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    /// Text shown under the result header
    pub fn display_text(&self) -> String {
        match self {
            CallOutcome::Success(text) => text.clone(),
            CallOutcome::Failure(reason) => format!("Error: {reason}"),
        }
    }
}

/// A dispatched call with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// The input line, as written
    pub text: String,
    /// Operation name
    pub name: String,
    pub outcome: CallOutcome,
}

/// What happened to one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not a call, or a comment/blank line; kept verbatim
    Passthrough(String),
    Call(CallRecord),
}

/// Ordered outcomes of one dispatch pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub lines: Vec<LineOutcome>,
    comment_marker: String,
}

impl DispatchReport {
    /// Calls of the pass, in input order
    pub fn calls(&self) -> impl Iterator<Item = &CallRecord> {
        self.lines.iter().filter_map(|line| match line {
            LineOutcome::Call(call) => Some(call),
            LineOutcome::Passthrough(_) => None,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls().count()
    }

    /// Input text with every call followed by its result
    ///
    /// Each call becomes
    ///
    /// ```text
    /// <call line>
    /// # Result of <name>():
    /// <result text>
    /// ```
    ///
    /// Other lines are emitted unchanged, so text without calls comes back
    /// byte-for-byte.
    pub fn render(&self) -> String {
        let rendered: Vec<String> = self
            .lines
            .iter()
            .map(|line| match line {
                LineOutcome::Passthrough(text) => text.clone(),
                LineOutcome::Call(call) => format!(
                    "{}\n# Result of {}():\n{}",
                    call.text,
                    call.name,
                    call.outcome.display_text()
                ),
            })
            .collect();
        rendered.join("\n")
    }

    /// Results only, for appending after a code block
    ///
    /// Lines that are neither calls nor comments are reported as not
    /// understood.
    pub fn render_results(&self) -> String {
        let mut out = String::new();

        for line in &self.lines {
            match line {
                LineOutcome::Call(call) => {
                    out.push_str(&format!(
                        "# Result of {}():\n{}\n\n",
                        call.name,
                        call.outcome.display_text()
                    ));
                }
                LineOutcome::Passthrough(text) => {
                    if !is_comment_or_blank(text, &self.comment_marker) {
                        out.push_str(&format!(
                            "# Warning: Could not parse as function call: {}\n",
                            text.trim()
                        ));
                    }
                }
            }
        }

        if out.is_empty() {
            return "# No function calls found in code block".to_string();
        }
        out.trim_end().to_string()
    }
}

/// Executes whitelisted calls found in text
pub struct Dispatcher {
    whitelist: Whitelist,
    comment_marker: String,
}

impl Dispatcher {
    /// Create a dispatcher over a fixed whitelist
    pub fn new(whitelist: Whitelist) -> Self {
        Self {
            whitelist,
            comment_marker: "#".to_string(),
        }
    }

    /// Lines starting with `marker` are never dispatched
    pub fn with_comment_marker(mut self, marker: impl Into<String>) -> Self {
        self.comment_marker = marker.into();
        self
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Run one pass over `text`
    ///
    /// Lines are handled strictly in order; each operation finishes before
    /// the next line is looked at.
    pub async fn dispatch(&self, session: &mut Session, text: &str) -> DispatchReport {
        let mut report = DispatchReport {
            lines: Vec::new(),
            comment_marker: self.comment_marker.clone(),
        };

        for line in text.split('\n') {
            if is_comment_or_blank(line, &self.comment_marker) {
                report.lines.push(LineOutcome::Passthrough(line.to_string()));
                continue;
            }

            let outcome = match CallExpression::recognize(line) {
                Some(call) => LineOutcome::Call(CallRecord {
                    text: line.trim_end_matches('\r').to_string(),
                    name: call.name.to_string(),
                    outcome: self.dispatch_call(session, &call).await,
                }),
                None => {
                    debug!("Passing through: {}", truncate(line.trim(), 80));
                    LineOutcome::Passthrough(line.to_string())
                }
            };
            report.lines.push(outcome);
        }

        debug!(
            "Dispatch pass finished: {} lines, {} calls",
            report.lines.len(),
            report.call_count()
        );
        report
    }

    /// Run a single recognized call
    ///
    /// Unknown names are rejected before anything is parsed or invoked.
    pub async fn dispatch_call(
        &self,
        session: &mut Session,
        call: &CallExpression<'_>,
    ) -> CallOutcome {
        let Some(spec) = self.whitelist.get(call.name) else {
            warn!("Rejected call to unregistered function '{}'", call.name);
            return CallOutcome::Failure(
                ExecutionError::UnknownFunction(call.name.to_string()).to_string(),
            );
        };

        let args = parse_arguments(call.raw_arguments);
        info!(
            function = call.name,
            positional = ?args.positional,
            keyword = ?args.keyword,
            "Calling operation"
        );

        let bound = match spec.signature().bind(args) {
            Ok(bound) => bound,
            Err(e) => {
                warn!("Argument binding failed: {}", e);
                return CallOutcome::Failure(e.to_string());
            }
        };

        let future = (spec.handler)(session, bound);
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(text)) => {
                debug!("{}() returned: {}", call.name, truncate(&one_line(&text), 100));
                CallOutcome::Success(text)
            }
            Ok(Err(e)) => {
                if let DispatchError::MongoDb(driver) = &e {
                    let details = extract_error_info(driver).to_json_compact();
                    error!(
                        function = call.name,
                        details = %details.unwrap_or_default(),
                        "MongoDB error"
                    );
                }
                error!("{}() failed: {}", call.name, e);
                CallOutcome::Failure(format!("{}() failed: {e}", call.name))
            }
            Err(panic) => {
                let reason = ExecutionError::Panicked(panic_message(panic.as_ref()));
                error!("{}() panicked: {}", call.name, reason);
                CallOutcome::Failure(format!("{}() failed: {reason}", call.name))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use mongodb::bson::doc;
    use std::sync::Arc;

    fn orders() -> MemoryStore {
        MemoryStore::new("shop").with_collection(
            "orders",
            (1..=5).map(|n| doc! { "_id": n, "total": n * 10 }).collect(),
        )
    }

    fn session(store: Arc<MemoryStore>) -> Session {
        Session::new(store)
    }

    const PANIC_PARAMS: &[Param] = &[];

    fn explode(_session: &mut Session, _args: BoundArgs) -> OperationFuture<'_> {
        Box::pin(async move { panic!("boom") })
    }

    #[tokio::test]
    async fn test_count_documents_scenario() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let report = dispatcher
            .dispatch(&mut session, r#"count_documents(collection_name="orders")"#)
            .await;

        let output = report.render();
        assert!(output.contains("Collection 'orders' contains 5 documents."));
        assert!(output.starts_with(
            "count_documents(collection_name=\"orders\")\n# Result of count_documents():\n"
        ));
    }

    #[tokio::test]
    async fn test_unknown_function_has_no_side_effects() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::with_writes());

        let report = dispatcher.dispatch(&mut session, "unknown_op(1,2)").await;

        let call = report.calls().next().unwrap();
        assert_eq!(call.name, "unknown_op");
        assert_eq!(
            call.outcome,
            CallOutcome::Failure("Function 'unknown_op' is not a registered operation".into())
        );
        assert!(store.calls().is_empty());
        assert!(report.render().contains("Error: Function 'unknown_op'"));
    }

    #[tokio::test]
    async fn test_write_operation_rejected_when_read_only() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let report = dispatcher
            .dispatch(&mut session, r#"delete_many("orders", {})"#)
            .await;

        assert!(!report.calls().next().unwrap().outcome.is_success());
        assert!(store.calls().is_empty());
        assert_eq!(store.documents("orders").len(), 5);
    }

    #[tokio::test]
    async fn test_text_without_calls_is_unchanged() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let text = "Here is the plan.\n\n# count first\nprint(x) + 1\r\n  trailing  \n";
        let report = dispatcher.dispatch(&mut session, text).await;

        assert_eq!(report.call_count(), 0);
        assert_eq!(report.render(), text);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_arguments_still_produce_a_result() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let text = "count_documents(\"orders\", {broken json)\nlist_collections()";
        let report = dispatcher.dispatch(&mut session, text).await;

        let calls: Vec<_> = report.calls().collect();
        assert_eq!(calls.len(), 2);
        assert!(!calls[0].outcome.is_success());
        assert!(calls[0].outcome.display_text().starts_with("Error: count_documents() failed"));
        assert!(calls[1].outcome.is_success());
    }

    #[tokio::test]
    async fn test_binding_error_is_inline() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let report = dispatcher.dispatch(&mut session, "count_documents()").await;

        assert_eq!(
            report.render(),
            "count_documents()\n# Result of count_documents():\n\
             Error: count_documents() missing required argument 'collection_name'"
        );
        assert!(store.calls().is_empty());

        let report = dispatcher
            .dispatch(&mut session, "count_documents(None)")
            .await;
        let texts: Vec<String> = report.calls().map(|c| c.outcome.display_text()).collect();
        assert_eq!(
            texts,
            vec!["Error: count_documents() missing required argument 'collection_name'"]
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_inline_and_pass_continues() {
        let store = Arc::new(orders().failing("server unreachable"));
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let report = dispatcher
            .dispatch(&mut session, "list_collections()\nNot a call")
            .await;

        let output = report.render();
        assert!(output.contains("Error: list_collections() failed: Query failed: server unreachable"));
        assert!(output.ends_with("\nNot a call"));
    }

    #[tokio::test]
    async fn test_panicking_operation_is_caught() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let whitelist = Whitelist::new([OperationSpec {
            name: "explode",
            params: PANIC_PARAMS,
            summary: "always panics",
            kind: OperationKind::Read,
            handler: explode,
        }]);
        let dispatcher = Dispatcher::new(whitelist);

        let report = dispatcher
            .dispatch(&mut session, "explode()\nexplode()")
            .await;

        let calls: Vec<_> = report.calls().collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].outcome,
            CallOutcome::Failure("explode() failed: Operation panicked: boom".into())
        );
    }

    #[tokio::test]
    async fn test_custom_comment_marker() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only()).with_comment_marker("//");

        let report = dispatcher
            .dispatch(&mut session, "// list_collections()\nlist_collections()")
            .await;

        assert_eq!(report.call_count(), 1);
        assert_eq!(store.calls(), vec!["list_collections".to_string()]);
    }

    #[tokio::test]
    async fn test_render_results_summary() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let report = dispatcher
            .dispatch(&mut session, "# counting\ncount_documents(\"orders\")\nx = 1")
            .await;

        assert_eq!(
            report.render_results(),
            "# Result of count_documents():\nCollection 'orders' contains 5 documents.\n\n\
             # Warning: Could not parse as function call: x = 1"
        );

        let empty = dispatcher.dispatch(&mut session, "# nothing here").await;
        assert_eq!(
            empty.render_results(),
            "# No function calls found in code block"
        );
    }

    #[tokio::test]
    async fn test_calls_run_in_order_against_one_session() {
        let store = Arc::new(orders());
        let mut session = session(store.clone());
        let dispatcher = Dispatcher::new(Whitelist::read_only());

        let text = "get_exploration_notes()\nexplore_mongodb()\nget_exploration_notes()";
        let report = dispatcher.dispatch(&mut session, text).await;

        let calls: Vec<_> = report.calls().collect();
        assert!(calls[0].outcome.display_text().contains("has not been explored yet"));
        assert!(calls[1].outcome.display_text().starts_with("MongoDB exploration completed"));
        assert!(calls[2].outcome.display_text().contains("orders"));
        assert!(session.notes().is_some());
    }
}

//! Chat-message reply mode
//!
//! A message from the conversation partner may carry code blocks fenced with
//! ```` ```python ````. Each block is run as one dispatch pass and its results
//! are inserted right after the block, leaving the rest of the message as it
//! was.

use tracing::{debug, info};

use crate::dispatch::{Dispatcher, Session};

const OPEN_FENCE: &str = "```python";
const CLOSE_FENCE: &str = "```";

/// A fenced block located in a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeBlock<'a> {
    /// Block body with surrounding whitespace removed
    body: &'a str,
    /// Byte offset just past the closing fence
    end: usize,
}

/// Find every closed ```` ```python ```` block, in order
fn code_blocks(message: &str) -> Vec<CodeBlock<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = message[cursor..].find(OPEN_FENCE) {
        let body_start = cursor + found + OPEN_FENCE.len();
        let Some(close) = message[body_start..].find(CLOSE_FENCE) else {
            break;
        };
        let body_end = body_start + close;
        let end = body_end + CLOSE_FENCE.len();

        blocks.push(CodeBlock {
            body: message[body_start..body_end].trim(),
            end,
        });
        cursor = end;
    }

    blocks
}

/// Run the code blocks of `message` and append their results
///
/// Returns `None` when the message has no closed ```` ```python ```` block,
/// in which case the caller keeps the message as it is.
pub async fn process_message(
    dispatcher: &Dispatcher,
    session: &mut Session,
    message: &str,
) -> Option<String> {
    let blocks = code_blocks(message);
    if blocks.is_empty() {
        debug!("Message has no code blocks");
        return None;
    }

    let mut out = String::with_capacity(message.len());
    let mut copied = 0;

    for (i, block) in blocks.iter().enumerate() {
        let report = dispatcher.dispatch(session, block.body).await;
        info!(
            "Executed code block {} with {} call(s)",
            i + 1,
            report.call_count()
        );

        out.push_str(&message[copied..block.end]);
        out.push_str("\n\n**Execution Results:**\n```\n");
        out.push_str(&report.render_results());
        out.push_str("\n```");
        copied = block.end;
    }

    out.push_str(&message[copied..]);
    Some(out)
}

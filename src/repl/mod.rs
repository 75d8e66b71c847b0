//! Interactive prompt for mongo-dispatch
//!
//! Every line entered is one dispatch pass. The prompt provides:
//! - Line editing and file-backed history with reedline
//! - Tab completion of operation names
//! - `help` and `exit`/`quit` commands

mod completer;
mod prompt;

pub use completer::OperationCompleter;
pub use prompt::DispatchPrompt;

use reedline::{
    ColumnarMenu, Emacs, FileBackedHistory, KeyCode, KeyModifiers, MenuBuilder, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, default_emacs_keybindings,
};
use tracing::debug;

use crate::config::HistoryConfig;
use crate::dispatch::{Dispatcher, OperationKind, Session, Whitelist};
use crate::error::{DispatchError, Result};
use crate::utils::fs::expand_home;

const COMPLETION_MENU: &str = "completion_menu";

/// A line entered at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Blank input
    Empty,
    Help,
    Exit,
    /// Text to dispatch
    Dispatch(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => ReplCommand::Empty,
            "help" | "help()" => ReplCommand::Help,
            "exit" | "quit" | "exit()" | "quit()" => ReplCommand::Exit,
            _ => ReplCommand::Dispatch(line.to_string()),
        }
    }
}

/// Help text listing the registered operations
pub fn help_text(whitelist: &Whitelist) -> String {
    let mut out = String::from("Enter one operation call per line, for example:\n");
    out.push_str("  count_documents(\"orders\", {\"status\": \"paid\"})\n\nOperations:\n");
    for op in whitelist.operations() {
        let tag = if op.kind == OperationKind::Write {
            " [write]"
        } else {
            ""
        };
        out.push_str(&format!("  {}{}\n", op.signature(), tag));
    }
    out.push_str("\nType 'exit' or press Ctrl-D to quit.");
    out
}

/// REPL engine for interactive dispatch
pub struct ReplEngine {
    /// Line editor for input
    editor: Reedline,

    /// Prompt rendered before each line
    prompt: DispatchPrompt,
}

impl ReplEngine {
    /// Create a new REPL engine
    ///
    /// # Arguments
    /// * `prompt` - Prompt to render
    /// * `history_config` - History configuration
    /// * `whitelist` - Operations offered for completion
    pub fn new(
        prompt: DispatchPrompt,
        history_config: &HistoryConfig,
        whitelist: &Whitelist,
    ) -> Result<Self> {
        let history = if history_config.persist {
            FileBackedHistory::with_file(
                history_config.max_size,
                expand_home(&history_config.file_path.to_string_lossy()),
            )
        } else {
            FileBackedHistory::new(history_config.max_size)
        }
        .map_err(|e| DispatchError::Generic(format!("History error: {}", e)))?;

        let names = whitelist
            .operations()
            .into_iter()
            .map(|op| (op.name.to_string(), op.summary.to_string()))
            .collect();

        let menu = ColumnarMenu::default().with_name(COMPLETION_MENU);
        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu(COMPLETION_MENU.to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );

        let editor = Reedline::create()
            .with_history(Box::new(history))
            .with_completer(Box::new(OperationCompleter::new(names)))
            .with_menu(ReedlineMenu::EngineCompleter(Box::new(menu)))
            .with_edit_mode(Box::new(Emacs::new(keybindings)));

        Ok(Self { editor, prompt })
    }

    /// Read a single line of input
    ///
    /// # Returns
    /// * `Result<Option<String>>` - Input line, empty on Ctrl-C, `None` on Ctrl-D
    pub fn read_line(&mut self) -> Result<Option<String>> {
        match self.editor.read_line(&self.prompt) {
            Ok(Signal::Success(line)) => Ok(Some(line)),
            Ok(Signal::CtrlC) => Ok(Some(String::new())),
            Ok(_) => Ok(None),
            Err(err) => Err(DispatchError::Generic(format!("Read error: {}", err))),
        }
    }

    /// Read and dispatch lines until exit or end of input
    pub async fn run(&mut self, dispatcher: &Dispatcher, session: &mut Session) -> Result<()> {
        while let Some(line) = self.read_line()? {
            match ReplCommand::parse(&line) {
                ReplCommand::Empty => continue,
                ReplCommand::Exit => break,
                ReplCommand::Help => println!("{}", help_text(dispatcher.whitelist())),
                ReplCommand::Dispatch(text) => {
                    debug!("REPL input: {}", text);
                    let report = dispatcher.dispatch(session, &text).await;
                    println!("{}", report.render_results());
                }
            }
        }
        Ok(())
    }
}

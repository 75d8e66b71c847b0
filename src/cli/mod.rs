//! Command-line interface for mongo-dispatch
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Subcommands (version, completion, config, operations)
//! - Connection string and database selection

mod completion;

use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::connection::redact_uri;
use crate::dispatch::{OperationKind, Whitelist};
use crate::error::Result;

/// Extract the database name from a MongoDB connection URI
///
/// Format: mongodb://[username:password@]host[:port][/database][?options]
fn extract_database_from_uri(uri: &str) -> Option<String> {
    let after_scheme = uri.split("://").nth(1)?;
    let path_part = after_scheme.split('/').nth(1)?;
    let db_name = path_part.split('?').next().unwrap_or("");
    if db_name.is_empty() {
        None
    } else {
        Some(db_name.to_string())
    }
}

/// Run whitelisted MongoDB operations found in text
#[derive(Parser, Debug)]
#[command(
    name = "mongo-dispatch",
    version,
    about = "Whitelisted MongoDB function-call dispatcher",
    long_about = "Reads text line by line and executes every line that is a call to a
registered MongoDB operation, such as count_documents(\"orders\"). Results are
inserted after each call; all other text passes through unchanged."
)]
pub struct CliArgs {
    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(value_name = "URI")]
    pub uri: Option<String>,

    /// Database name to use
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Read input text from a file ('-' for stdin)
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Treat the input as a chat message and run its ```python blocks
    #[arg(long)]
    pub reply: bool,

    /// Register insert, update, delete and index operations
    #[arg(long)]
    pub allow_writes: bool,

    /// Do not connect; every call reports a connection error
    #[arg(long)]
    pub no_connect: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for mongo-dispatch
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },

    /// List the registered operations
    Operations,
}

/// How the input should be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Read the whole input and run one dispatch pass over it
    Batch { source: Option<PathBuf> },
    /// Read the whole input as a chat message
    Reply { source: Option<PathBuf> },
    /// Interactive prompt
    Interactive,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and environment, then apply CLI overrides
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;

        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_args_to_config(&mut config, args);
        Ok(config)
    }

    /// Get the MongoDB connection URI
    ///
    /// The URI argument wins over the configured one.
    pub fn get_connection_uri(&self) -> String {
        self.args
            .uri
            .clone()
            .unwrap_or_else(|| self.config.connection.uri.clone())
    }

    /// Get the database name to use
    ///
    /// Priority:
    /// 1. --database command line argument
    /// 2. Database name in the URI argument
    /// 3. Configured database
    pub fn get_database(&self) -> String {
        if let Some(db) = &self.args.database {
            return db.clone();
        }

        if let Some(db) = self.args.uri.as_deref().and_then(extract_database_from_uri) {
            return db;
        }

        self.config.connection.database.clone()
    }

    /// Select the input mode
    ///
    /// A file argument or piped stdin means batch processing; otherwise the
    /// interactive prompt starts.
    pub fn input_mode(&self) -> InputMode {
        let source = self
            .args
            .file
            .clone()
            .filter(|path| path.as_os_str() != "-");
        let has_input = self.args.file.is_some() || !std::io::stdin().is_terminal();

        match (self.args.reply, has_input) {
            (true, _) => InputMode::Reply { source },
            (false, true) => InputMode::Batch { source },
            (false, false) => InputMode::Interactive,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Get the config file path if specified
    pub fn config_path(&self) -> Option<&Path> {
        self.args.config_file.as_deref()
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_logging_args(config, args);
        Self::apply_connection_args(config, args);
        Self::apply_dispatch_args(config, args);
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply connection-related CLI arguments to configuration
    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
    }

    /// Apply dispatcher-related CLI arguments to configuration
    fn apply_dispatch_args(config: &mut Config, args: &CliArgs) {
        if args.allow_writes {
            config.dispatch.allow_writes = true;
        }
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub async fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Completion { shell }) => {
                completion::generate_completion(shell)?;
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            Some(Commands::Operations) => {
                println!("{}", self.describe_operations());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("mongo-dispatch version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    ///
    /// Without flags the config file location is printed.
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.config.validate()?;
            println!("Configuration is valid");
        }

        if show {
            println!("{}", self.config.to_toml()?);
        }

        if !show && !validate {
            let path = self
                .config_path()
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_config_path);
            println!("Configuration file: {}", path.display());
        }

        Ok(())
    }

    /// One line per registered operation with its signature
    pub fn describe_operations(&self) -> String {
        let whitelist = Whitelist::from_config(&self.config.dispatch);
        let lines: Vec<String> = whitelist
            .operations()
            .into_iter()
            .map(|op| {
                let tag = match op.kind {
                    OperationKind::Read => "",
                    OperationKind::Write => " [write]",
                };
                format!("{}{}\n    {}", op.signature(), tag, op.summary)
            })
            .collect();
        lines.join("\n")
    }

    /// Print connection information to stderr
    pub fn print_connection_info(&self, version: &str) {
        if self.args.quiet {
            return;
        }
        eprintln!(
            "Connected to {} (server {}), database '{}'",
            redact_uri(&self.get_connection_uri()),
            version,
            self.get_database()
        );
    }
}

//! mongo-dispatch
//!
//! Runs whitelisted MongoDB operation calls found in text.
//!
//! # Usage
//!
//! ```bash
//! # Batch: dispatch every call line of a file, print the annotated text
//! mongo-dispatch mongodb://localhost:27017/shop -f calls.txt
//!
//! # Reply: run the ```python blocks of a chat message
//! cat message.md | mongo-dispatch --reply mongodb://localhost:27017/shop
//!
//! # Interactive prompt
//! mongo-dispatch mongodb://localhost:27017/shop
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use mongo_dispatch::cli::{CliInterface, InputMode};
use mongo_dispatch::connection::ConnectionManager;
use mongo_dispatch::dispatch::{DisplayLimits, Dispatcher, Session, Whitelist};
use mongo_dispatch::error::Result;
use mongo_dispatch::reply::process_message;
use mongo_dispatch::repl::{DispatchPrompt, ReplEngine};
use mongo_dispatch::store::{DataSource, MongoStore, OfflineStore};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands, or connect and process input
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand().await? {
        return Ok(());
    }

    let (manager, server_version) = setup_connection(&cli).await?;
    let database = cli.get_database();
    let store: Arc<dyn DataSource> = match &manager {
        Some(manager) => Arc::new(MongoStore::new(manager, &database)?),
        None => Arc::new(OfflineStore::new(&database)),
    };

    let dispatch_config = &cli.config().dispatch;
    let dispatcher = Dispatcher::new(Whitelist::from_config(dispatch_config))
        .with_comment_marker(dispatch_config.comment_marker.clone());
    let mut session = Session::new(store).with_limits(DisplayLimits::from(dispatch_config));

    match cli.input_mode() {
        InputMode::Batch { source } => {
            let text = read_input(source.as_deref())?;
            let report = dispatcher.dispatch(&mut session, &text).await;
            info!("Dispatched {} call(s)", report.call_count());
            print!("{}", report.render());
        }
        InputMode::Reply { source } => {
            let message = read_input(source.as_deref())?;
            match process_message(&dispatcher, &mut session, &message).await {
                Some(reply) => print!("{}", reply),
                None => print!("{}", message),
            }
        }
        InputMode::Interactive => {
            if let Some(version) = &server_version {
                cli.print_connection_info(version);
            }
            let prompt =
                DispatchPrompt::new(database, manager.is_some(), dispatch_config.allow_writes);
            let mut repl = ReplEngine::new(prompt, &cli.config().history, dispatcher.whitelist())?;
            repl.run(&dispatcher, &mut session).await?;
            println!("Goodbye!");
        }
    }

    if let Some(mut manager) = manager {
        manager.disconnect().await?;
    }
    Ok(())
}

/// Connect unless `--no-connect` was given
async fn setup_connection(
    cli: &CliInterface,
) -> Result<(Option<ConnectionManager>, Option<String>)> {
    if cli.args().no_connect {
        return Ok((None, None));
    }

    let mut manager =
        ConnectionManager::new(cli.get_connection_uri(), cli.config().connection.clone());
    manager.connect().await?;

    let version = manager.get_server_version().await.ok();
    Ok((Some(manager), version))
}

/// Read the whole input from a file, or stdin when no file is given
fn read_input(source: Option<&Path>) -> Result<String> {
    match source {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(io::read_to_string(io::stdin())?),
    }
}

/// Initialize logging to stderr
///
/// `RUST_LOG` directives are honored on top of the configured level.
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

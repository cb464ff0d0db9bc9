//! CLI command implementations
//!
//! Boot order for `start` and `serve`:
//! 1. Configuration load (sets the log level)
//! 2. Schema and policy resolution
//! 3. Slot file load and verification
//! 4. Session coordinator activation
//!
//! Any failure before activation is fatal; nothing is served from a store
//! that did not load cleanly.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{serve_lines, write_json};
use crate::api::SessionHandler;
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::server::Server;
use crate::session::SessionCoordinator;
use crate::storage::{slot_file_path, FilePersistence};
use crate::store::RecordStore;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
        Command::Serve { config, port } => serve(&config, port),
    }
}

/// Create the data directory and an empty slot file
///
/// Does not start serving.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    fs::create_dir_all(data_dir)
        .map_err(|e| CliError::config_error(format!("Failed to create directory {:?}: {}", data_dir, e)))?;

    let schema = config.schema()?;
    let persistence = FilePersistence::open(data_dir, &schema)
        .map_err(|e| CliError::boot_failed(format!("Failed to create slot file: {}", e)))?;

    let path = persistence.path().display().to_string();
    log_event_with_fields(Event::DataDirInitialized, &[("path", path.as_str())]);

    write_json(&mut io::stdout(), &json!({"initialized": true, "path": path}).to_string())
}

/// Serve a single session over stdin/stdout until EOF
pub fn start(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let coordinator = boot(&config)?;

    {
        let handler = SessionHandler::new(coordinator);
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        serve_lines(&handler, stdin.lock(), &mut stdout)?;
    }

    log_event(Event::ShutdownComplete);
    Ok(())
}

/// Serve sessions over TCP, one per connection
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let coordinator = boot(&config)?;

    let mut server_config = config.server.clone();
    if let Some(port) = port {
        server_config.port = port;
    }
    let server = Server::new(server_config, coordinator);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("Server failed: {}", e)))
    })?;

    log_event(Event::ShutdownComplete);
    Ok(())
}

/// Load the config and apply its log level
fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.min_severity()?);

    let path = config_path.display().to_string();
    log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);
    Ok(config)
}

fn is_initialized(data_dir: &Path) -> bool {
    slot_file_path(data_dir).exists()
}

/// Open the store from disk and wrap it in a coordinator
pub fn boot(config: &Config) -> CliResult<Arc<SessionCoordinator>> {
    let data_dir = config.data_path();
    if !is_initialized(data_dir) {
        return Err(CliError::not_initialized());
    }

    let schema = config.schema()?;
    let policy = config.policy(&schema)?;
    let persistence = FilePersistence::open(data_dir, &schema)
        .map_err(|e| CliError::boot_failed(format!("Failed to open slot file: {}", e)))?;

    let store = RecordStore::open(schema, Arc::new(persistence), policy)?;
    let coordinator = SessionCoordinator::new(Arc::new(store)).with_page_size(config.page_size);
    Ok(Arc::new(coordinator))
}

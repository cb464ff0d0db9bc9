//! CLI module for slotdb
//!
//! Provides command-line interface for:
//! - init: Create the data directory and slot file
//! - start: Boot and serve one session over stdin/stdout
//! - serve: Boot and serve TCP clients

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, init, run, run_command, serve, start};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{serve_lines, write_json};

//! CLI argument definitions using clap
//!
//! Commands:
//! - slotdb init --config <path>
//! - slotdb start --config <path>
//! - slotdb serve --config <path> [--port <port>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// slotdb - a shared record store with per-slot locking
#[derive(Parser, Debug)]
#[command(name = "slotdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and an empty slot file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./slotdb.json")]
        config: PathBuf,
    },

    /// Serve a single session over stdin/stdout
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./slotdb.json")]
        config: PathBuf,
    },

    /// Serve sessions over TCP, one per connection
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./slotdb.json")]
        config: PathBuf,

        /// Overrides `server.port` from the config file
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["slotdb", "serve", "--config", "db.json", "--port", "9000"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("db.json"));
                assert_eq!(port, Some(9000));
            }
            other => panic!("Expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["slotdb", "init"]).unwrap();
        match cli.command {
            Command::Init { config } => assert_eq!(config, PathBuf::from("./slotdb.json")),
            other => panic!("Expected init, got {:?}", other),
        }
    }
}

//! TCP front end: one connection, one session

mod config;
mod listener;

pub use config::ServerConfig;
pub use listener::{handle_connection, Server};

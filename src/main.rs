//! slotdb CLI entry point
//!
//! Parses arguments, dispatches to the CLI module and exits non-zero on
//! failure. Everything else lives in `cli`.

use slotdb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

//! Line-oriented JSON I/O
//!
//! - Input: one JSON request per line
//! - Output: one JSON response per line
//! - UTF-8 only; blank lines are skipped

use std::io::{BufRead, Write};

use super::errors::CliResult;
use crate::api::SessionHandler;

/// Answer every request from `input` until EOF
pub fn serve_lines<R: BufRead, W: Write>(handler: &SessionHandler, input: R, output: &mut W) -> CliResult<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        write_json(output, &handler.handle(&line).to_json())?;
    }
    Ok(())
}

/// Write one raw JSON line and flush
pub fn write_json<W: Write>(output: &mut W, json_str: &str) -> CliResult<()> {
    writeln!(output, "{}", json_str)?;
    output.flush()?;
    Ok(())
}

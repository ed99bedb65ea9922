use std::path::Path;

use anyhow::Result;
use cartpilot_contracts::decode_str;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::output::print_json;
use crate::setup::read_lines;

/// Decode each line and print its kind, or why it failed closed.
pub fn run(file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let mut failures = 0usize;
    for (index, line) in read_lines(file)?.iter().enumerate() {
        let number = index + 1;
        match decode_str(line) {
            Ok(message) if format.is_json() => print_json(&json!({
                "line": number,
                "kind": message.name(),
                "message": message,
            }))?,
            Ok(message) => println!("{number}: {}", message.name()),
            Err(err) => {
                failures += 1;
                if format.is_json() {
                    print_json(&json!({ "line": number, "error": err.to_string() }))?;
                } else {
                    println!("{number}: error: {err}");
                }
            }
        }
    }
    tracing::debug!(failures, "Decode finished");
    Ok(())
}

//! Parser for raw wal2json output strings.

use anyhow::{Context, Result};
use serde_json::Value;

/// Parses a wal2json output string into a JSON object.
///
/// The slot hands back one string per logical decoding record; it must be
/// a JSON object (either a single action record in format version 2 or a
/// `{"change": [...]}` batch).
pub fn parse_wal2json(input: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(input).context("Failed to parse wal2json output as JSON")?;

    if !value.is_object() {
        anyhow::bail!("Expected wal2json output to be a JSON object, got: {value:?}");
    }

    Ok(value)
}

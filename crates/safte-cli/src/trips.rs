//! Loading parsed trips from JSON files.
//!
//! A trip file holds either a single trip object or an array of them, in the
//! shape produced by the upstream trip document parser.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use safte_core::ParsedTrip;
use serde_json::Value;

/// Parses trip JSON into one or more trips.
pub fn parse_trips(content: &str) -> serde_json::Result<Vec<ParsedTrip>> {
    match serde_json::from_str(content)? {
        Value::Array(items) => items.into_iter().map(serde_json::from_value).collect(),
        value => serde_json::from_value(value).map(|trip| vec![trip]),
    }
}

/// Reads and parses a trip file.
pub fn load_trips(path: &Path) -> Result<Vec<ParsedTrip>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read trip file {}", path.display()))?;
    let trips = parse_trips(&content)
        .with_context(|| format!("failed to parse trip file {}", path.display()))?;
    tracing::debug!(path = %path.display(), trips = trips.len(), "loaded trip file");
    Ok(trips)
}

/// Display label for a trip: its id, or the file it came from.
pub fn trip_label(trip_id: Option<&str>, path: &Path, index: usize, count: usize) -> String {
    if let Some(id) = trip_id {
        return id.to_string();
    }
    let stem = path
        .file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
    if count > 1 {
        format!("{stem}#{}", index + 1)
    } else {
        stem
    }
}

//! Output formatting and persistence for readings and grids.
//!
//! Supports CSV append/load for readings and JSON serialization for grids.

use anyhow::Result;
use tracing::debug;

use crate::reading::{GridPoint, Reading};
use csv::WriterBuilder;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Appends a [`Reading`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, reading: &Reading) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(reading)?;
    writer.flush()?;

    Ok(())
}

/// Loads all readings from a CSV file written by [`append_record`].
pub fn load_readings(path: &str) -> Result<Vec<Reading>> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: Reading = result?;
        rows.push(record);
    }

    Ok(rows)
}

/// Writes a grid as a JSON array of `{lat, lon, value}` triples.
pub fn write_grid_json(mut writer: impl Write, grid: &[GridPoint]) -> Result<()> {
    serde_json::to_writer(&mut writer, grid)?;
    writeln!(writer)?;
    Ok(())
}

/// Serializes any value as pretty-printed JSON to a writer.
pub fn write_json_pretty(mut writer: impl Write, value: &impl serde::Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

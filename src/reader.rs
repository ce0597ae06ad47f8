use cle::Result;

use std::{fs::File, path::Path};

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;

/// Reads every record of a CSV file. Rows that fail to deserialize are logged
/// and skipped so one bad line does not stop the run.
pub fn read_records<T: DeserializeOwned>(filepath: &Path) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(File::open(filepath)?);

    let mut records = vec![];

    for (line, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping record {} of {filepath:?}: {e}", line + 1),
        }
    }

    log::debug!("Read {} records from {filepath:?}", records.len());

    return Ok(records);
}

// src/utils/cache.rs

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;

use log::debug;

use crate::error::{AppError, Result};
use crate::models::{PriceObservation, Series};

/// Serializes the series as `Date,Price` CSV.
pub fn to_csv_bytes(series: &[PriceObservation]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if series.is_empty() {
        writer.write_record(["Date", "Price"])?;
    }
    for obs in series {
        writer.serialize(obs)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}

/// Replaces the cache file with the given series in a single write.
pub fn write_series(path: &Path, series: &[PriceObservation]) -> Result<()> {
    let bytes = to_csv_bytes(series)?;
    fs::write(path, bytes)?;
    debug!("Wrote {} rows to {}", series.len(), path.display());
    Ok(())
}

/// Loads the cache file as written by [`write_series`].
pub fn read_series(path: &Path) -> Result<Series> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::CacheMissing(path.display().to_string()),
        _ => AppError::Io(e),
    })?;

    let mut reader = csv::Reader::from_reader(file);
    let series = reader
        .deserialize::<PriceObservation>()
        .collect::<std::result::Result<Series, csv::Error>>()?;
    debug!("Read {} rows from {}", series.len(), path.display());
    Ok(series)
}

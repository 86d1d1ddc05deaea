use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::ScoredResult;

pub fn results_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("momentum_results_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write the ranking to a timestamped file in `dir` and return its path.
pub fn export_results<Tz: TimeZone>(
    dir: &Path,
    results: &[ScoredResult],
    at: &DateTime<Tz>,
) -> Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    std::fs::create_dir_all(dir)?;
    let path = dir.join(results_filename(at));
    write_json(&path, results)?;
    info!("Exported {} results to {}", results.len(), path.display());
    Ok(path)
}

/// Pretty-printed JSON, overwriting `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Read a JSON array, decoding each element on its own. Elements that do not
/// decode as `T` are logged and skipped; the file itself must still be an
/// array.
pub fn read_json_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let values: Vec<serde_json::Value> = read_json(path)?;
    let total = values.len();
    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| match serde_json::from_value(v) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("Skipping record {i} in {}: {e}", path.display());
                None
            }
        })
        .collect();
    if records.len() < total {
        warn!("Kept {}/{} records from {}", records.len(), total, path.display());
    }
    Ok(records)
}

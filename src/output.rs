use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::domain::record::OutputRecord;

/// Records shown by a dry run.
pub const DRY_RUN_PREVIEW: usize = 3;

/// Write `records` as a pretty-printed JSON array, creating parent dirs.
pub fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let s = serde_json::to_string_pretty(records)?;
    fs::write(path, s).with_context(|| format!("cannot write {}", path.display()))?;
    log::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Pretty JSON of the first few records, for dry runs.
pub fn preview_json(records: &[OutputRecord]) -> Result<String> {
    let head = &records[..records.len().min(DRY_RUN_PREVIEW)];
    Ok(serde_json::to_string_pretty(head)?)
}

/// Load a previously written export.
pub fn read_json(path: &Path) -> Result<Vec<OutputRecord>> {
    let s = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(serde_json::from_str(&s)?)
}

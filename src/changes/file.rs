//! Change-file discovery and loading (`<start>_<end>.ydiff`).

use super::record::ChangeRecord;
use crate::error::{BudgetError, Result};
use crate::fs::{self as budget_fs, BudgetFs};
use crate::version::{effective_version, VersionToken};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of change files.
pub const CHANGE_EXTENSION: &str = "ydiff";

/// Separator between the start and end version in a change-file name.
const RANGE_SEPARATOR: char = '_';

/// A change file on disk, with its version range parsed from the name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeFile {
    pub path: PathBuf,
    pub name: String,
    /// Raw start of range, possibly composite.
    pub start: String,
    /// Raw end of range, possibly composite.
    pub end: String,
    pub start_effective: VersionToken,
    pub end_effective: VersionToken,
}

impl ChangeFile {
    /// Parse the range from `path`'s file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BudgetError::format(path.display().to_string(), "invalid file name"))?
            .to_string();

        let (start, end) = parse_filename(&name)?;
        let start_effective = effective_version(&start)
            .map_err(|e| BudgetError::format(name.clone(), format!("bad start version: {}", e)))?;
        let end_effective = effective_version(&end)
            .map_err(|e| BudgetError::format(name.clone(), format!("bad end version: {}", e)))?;

        Ok(Self {
            path,
            name,
            start,
            end,
            start_effective,
            end_effective,
        })
    }

    /// Counter of the effective end version. Bounds replay.
    pub fn end_version_number(&self) -> u64 {
        self.end_effective.counter()
    }
}

/// Split `<start>_<end>.ydiff` into its raw start and end strings.
pub fn parse_filename(name: &str) -> Result<(String, String)> {
    let stem = name
        .strip_suffix(CHANGE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .ok_or_else(|| BudgetError::format(name, "not a change file name"))?;

    let mut parts = stem.split(RANGE_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(start), Some(end), None) if !start.is_empty() && !end.is_empty() => {
            Ok((start.to_string(), end.to_string()))
        }
        _ => Err(BudgetError::format(
            name,
            "change file name must be <start>_<end>.ydiff",
        )),
    }
}

/// Change files in `replica_dir`, ordered by effective start version.
///
/// Files whose effective start versions are equal keep file-name order.
pub fn discover_change_files(fs: &dyn BudgetFs, replica_dir: &Path) -> Result<Vec<ChangeFile>> {
    let mut files = budget_fs::files_with_extension(fs, replica_dir, CHANGE_EXTENSION)?
        .into_iter()
        .map(ChangeFile::from_path)
        .collect::<Result<Vec<_>>>()?;

    files.sort_by(|a, b| {
        a.start_effective
            .cmp(&b.start_effective)
            .then_with(|| a.name.cmp(&b.name))
    });

    debug!(dir = %replica_dir.display(), count = files.len(), "Discovered change files");
    Ok(files)
}

/// Read every record of a change file, in stored order.
///
/// A document without `items` has no records.
pub fn load_change_file(fs: &dyn BudgetFs, file: &ChangeFile) -> Result<Vec<ChangeRecord>> {
    let bytes = budget_fs::read_file(fs, &file.path)?;
    let document: Value = serde_json::from_slice(&bytes)
        .map_err(|e| BudgetError::format(file.name.clone(), e.to_string()))?;

    let items = match document {
        Value::Object(mut fields) => fields.remove("items").unwrap_or(Value::Null),
        _ => return Err(BudgetError::format(file.name.clone(), "change file is not an object")),
    };

    let items = match items {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        _ => return Err(BudgetError::format(file.name.clone(), "items is not an array")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| ChangeRecord::from_item(&file.path, index, item))
        .collect()
}

//! Encoding entities into change files.

use super::file::{ChangeFile, CHANGE_EXTENSION};
use super::record::ChangeRecord;
use crate::entities::{EntityKind, EntityRecord};
use crate::error::{BudgetError, Result};
use crate::fs::{write_json_atomic, Overwrite};
use crate::version::effective_version;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// `publishTime` layout, e.g. `Tue Aug 05 14:03:11 GMT+0200 2025`.
const PUBLISH_TIME_FORMAT: &str = "%a %b %d %H:%M:%S GMT%z %Y";

/// Document written for one change file.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeDocument<'a> {
    short_device_id: &'a str,
    start_version: &'a str,
    end_version: &'a str,
    #[serde(rename = "deviceGUID")]
    device_guid: &'a str,
    publish_time: String,
    #[serde(rename = "budgetDataGUID")]
    budget_data_guid: Option<String>,
    format_version: Option<String>,
    data_version: &'a str,
    items: Vec<Value>,
}

/// Identity and range stamped into a written change file.
#[derive(Clone, Copy, Debug)]
pub struct ChangeHeader<'a> {
    pub start_version: &'a str,
    pub end_version: &'a str,
    pub replica_guid: &'a str,
    pub short_id: &'a str,
    pub data_version: &'a str,
}

/// Encode an entity as a change record carrying its fixed field subset.
pub fn entity_to_record(entity: &EntityRecord, tombstone: bool) -> ChangeRecord {
    ChangeRecord {
        entity_id: entity.entity_id().to_string(),
        entity_type: entity.kind().as_str().to_string(),
        entity_version: entity.entity_version().to_string(),
        is_tombstone: tombstone,
        fields: if tombstone {
            Map::new()
        } else {
            entity.change_fields()
        },
    }
}

/// Deletion record for `id`.
pub fn tombstone_record(kind: EntityKind, id: &str, version: &str) -> ChangeRecord {
    ChangeRecord {
        entity_id: id.to_string(),
        entity_type: kind.as_str().to_string(),
        entity_version: version.to_string(),
        is_tombstone: true,
        fields: Map::new(),
    }
}

/// Write `records` as `<start>_<end>.ydiff` in `directory`.
///
/// The file is written to a temp file and renamed into place. An existing
/// file with the same name is never replaced.
pub fn write_change(
    directory: &Path,
    records: &[ChangeRecord],
    header: ChangeHeader<'_>,
) -> Result<ChangeFile> {
    for version in [header.start_version, header.end_version] {
        effective_version(version)?;
    }
    if !directory.is_dir() {
        return Err(BudgetError::NotFound(directory.to_path_buf()));
    }

    let document = ChangeDocument {
        short_device_id: header.short_id,
        start_version: header.start_version,
        end_version: header.end_version,
        device_guid: header.replica_guid,
        publish_time: chrono::Local::now()
            .format(PUBLISH_TIME_FORMAT)
            .to_string(),
        budget_data_guid: None,
        format_version: None,
        data_version: header.data_version,
        items: records.iter().map(ChangeRecord::to_item).collect(),
    };

    let name = format!(
        "{}_{}.{}",
        header.start_version, header.end_version, CHANGE_EXTENSION
    );
    let path = directory.join(name);
    write_json_atomic(&path, &document, Overwrite::Refuse)?;
    debug!(path = %path.display(), items = records.len(), "Wrote change file");

    ChangeFile::from_path(path)
}

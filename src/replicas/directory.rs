//! Discovery and selection of replicas under a data root.

use super::record::ReplicaRecord;
use crate::error::{BudgetError, Result, SkippedItem};
use crate::fs::{self as budget_fs, BudgetFs, OsFs, Overwrite};
use crate::snapshot::SNAPSHOT_FILE;
use crate::version::{Knowledge, VersionToken};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of the single data directory inside a budget root.
pub const DATA_ROOT_PREFIX: &str = "data1~";

/// Directory holding one metadata document per replica.
pub const DEVICES_DIR: &str = "devices";

/// Extension of replica metadata documents.
pub const REPLICA_EXTENSION: &str = "ydevice";

/// Format version written into newly registered replica records.
const REPLICA_FORMAT_VERSION: &str = "1.2";

/// Data version newly registered replicas claim to know fully.
const REGISTERED_DATA_VERSION: &str = "4.2";

/// At most one replica per letter.
const MAX_REPLICAS: usize = 26;

/// Result of scanning the devices directory.
#[derive(Clone, Debug, Default)]
pub struct ReplicaScan {
    /// Parsed records keyed by short id (the metadata file stem).
    pub records: BTreeMap<String, ReplicaRecord>,
    /// Metadata files that could not be parsed.
    pub skipped: Vec<SkippedItem>,
}

/// The replica holding the most advanced state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveReplica {
    pub short_id: String,
    pub guid: String,
    /// Parsed knowledge, `None` when selected by fallback.
    pub knowledge: Option<Knowledge>,
}

/// Find the single `data1~*` directory under `budget_root`.
pub fn discover_data_root(fs: &dyn BudgetFs, budget_root: &Path) -> Result<PathBuf> {
    let mut matches: Vec<PathBuf> = budget_fs::list_dir(fs, budget_root)?
        .into_iter()
        .filter(|e| e.is_dir)
        .filter(|e| {
            e.file_name()
                .map_or(false, |name| name.starts_with(DATA_ROOT_PREFIX))
        })
        .map(|e| e.path)
        .collect();
    matches.sort();

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(BudgetError::structure(
            format!(
                "one {}* directory in {}",
                DATA_ROOT_PREFIX,
                budget_root.display()
            ),
            "none",
        )),
        _ => Err(BudgetError::structure(
            format!(
                "one {}* directory in {}",
                DATA_ROOT_PREFIX,
                budget_root.display()
            ),
            matches
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}

/// Read every replica metadata document under `<data_root>/devices`.
///
/// A document that is not valid JSON (or not a record shape) is skipped
/// with a warning and reported in [`ReplicaScan::skipped`].
pub fn discover_replica_records(fs: &dyn BudgetFs, data_root: &Path) -> Result<ReplicaScan> {
    let devices = data_root.join(DEVICES_DIR);
    if !fs.is_dir(&devices) {
        return Err(BudgetError::structure(
            devices.display().to_string(),
            "no devices directory",
        ));
    }

    let mut scan = ReplicaScan::default();
    for path in budget_fs::files_with_extension(fs, &devices, REPLICA_EXTENSION)? {
        let Some(short_id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
        else {
            continue;
        };

        let bytes = budget_fs::read_file(fs, &path)?;
        match serde_json::from_slice::<ReplicaRecord>(&bytes) {
            Ok(record) => {
                scan.records.insert(short_id, record);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable replica record");
                scan.skipped
                    .push(SkippedItem::new(&path, Some(short_id), e.to_string()));
            }
        }
    }

    Ok(scan)
}

/// Pick the replica whose knowledge has the highest effective version.
///
/// Ties go to the lowest short id. If no record has both a GUID and
/// parseable knowledge, the first record (by short id) with a GUID is used.
pub fn select_active_replica(records: &BTreeMap<String, ReplicaRecord>) -> Result<ActiveReplica> {
    if records.is_empty() {
        return Err(BudgetError::structure(
            "at least one parseable replica record",
            "none",
        ));
    }

    let mut best: Option<(VersionToken, &str, &str, Knowledge)> = None;
    for (short_id, record) in records {
        let (Some(guid), Some(knowledge)) = (record.guid(), record.parsed_knowledge()) else {
            continue;
        };
        let Some(effective) = knowledge.effective() else {
            continue;
        };
        if best.as_ref().map_or(true, |(top, ..)| effective > *top) {
            best = Some((effective, short_id.as_str(), guid, knowledge));
        }
    }

    if let Some((effective, short_id, guid, knowledge)) = best {
        debug!(short_id, guid, version = %effective, "Selected active replica");
        return Ok(ActiveReplica {
            short_id: short_id.to_string(),
            guid: guid.to_string(),
            knowledge: Some(knowledge),
        });
    }

    let (short_id, guid) = records
        .iter()
        .find_map(|(id, r)| r.guid().map(|g| (id, g)))
        .ok_or_else(|| {
            BudgetError::structure(
                "a replica record with deviceGUID",
                format!("{} record(s) without deviceGUID", records.len()),
            )
        })?;

    warn!(short_id = %short_id, "No replica has usable knowledge, falling back to first record");
    Ok(ActiveReplica {
        short_id: short_id.clone(),
        guid: guid.to_string(),
        knowledge: None,
    })
}

/// Union of every replica's effective version, one token per replica.
///
/// Returns `None` when no record has both a GUID and parseable knowledge.
pub fn compute_global_knowledge(records: &BTreeMap<String, ReplicaRecord>) -> Option<Knowledge> {
    let mut global = Knowledge::default();
    for (short_id, record) in records {
        let effective = record
            .guid()
            .and(record.parsed_knowledge())
            .and_then(|k| k.effective());
        match effective {
            Some(token) => global.observe(token),
            None => warn!(short_id = %short_id, "Replica record lacks GUID or knowledge"),
        }
    }
    (!global.is_empty()).then_some(global)
}

/// `<data_root>/<guid>`.
pub fn replica_directory(data_root: &Path, guid: &str) -> PathBuf {
    data_root.join(guid)
}

/// `<data_root>/devices/<short_id>.ydevice`.
pub fn replica_metadata_path(data_root: &Path, short_id: &str) -> PathBuf {
    data_root
        .join(DEVICES_DIR)
        .join(format!("{}.{}", short_id, REPLICA_EXTENSION))
}

/// `<data_root>/<guid>/Budget.yfull`, which must exist.
pub fn snapshot_path(fs: &dyn BudgetFs, data_root: &Path, guid: &str) -> Result<PathBuf> {
    let path = replica_directory(data_root, guid).join(SNAPSHOT_FILE);
    if fs.exists(&path) {
        Ok(path)
    } else {
        Err(BudgetError::NotFound(path))
    }
}

/// Rewrite a replica record's knowledge fields in place.
///
/// Every other field of the document, including unknown ones, is kept.
/// With `backup` set, the current file is first copied to
/// `<name>.backup_<YYYYmmdd_HHMMSS>`.
pub fn advance_replica_knowledge(
    path: &Path,
    knowledge: &Knowledge,
    full_budget_knowledge: Option<&Knowledge>,
    backup: bool,
) -> Result<()> {
    let bytes = budget_fs::read_file(&OsFs, path)?;
    let mut document: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| BudgetError::format(path.display().to_string(), e.to_string()))?;
    let fields = document.as_object_mut().ok_or_else(|| {
        BudgetError::format(path.display().to_string(), "replica record is not an object")
    })?;

    fields.insert("knowledge".into(), knowledge.to_string().into());
    if let Some(full) = full_budget_knowledge {
        fields.insert("knowledgeInFullBudgetFile".into(), full.to_string().into());
    }

    if backup {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".backup_{}", stamp));
        fs::copy(path, &name).map_err(|e| BudgetError::from_io(path, e))?;
    }

    budget_fs::write_json_atomic(path, &document, Overwrite::Replace)?;
    debug!(path = %path.display(), knowledge = %knowledge, "Advanced replica knowledge");
    Ok(())
}

/// A freshly registered replica.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredReplica {
    pub short_id: String,
    pub guid: String,
    pub metadata_path: PathBuf,
}

/// Register a new replica under `data_root`.
///
/// Takes the first free letter `A`..`Z`, creates the replica directory and
/// writes its metadata document with knowledge `<id>-1`.
pub fn register_replica(
    data_root: &Path,
    friendly_name: &str,
    device_type: &str,
    app_version: &str,
) -> Result<RegisteredReplica> {
    let devices = data_root.join(DEVICES_DIR);
    fs::create_dir_all(&devices).map_err(|e| BudgetError::from_io(&devices, e))?;

    let taken: Vec<String> = budget_fs::files_with_extension(&OsFs, &devices, REPLICA_EXTENSION)?
        .iter()
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect();

    let short_id = ('A'..='Z')
        .map(String::from)
        .find(|id| !taken.contains(id))
        .ok_or_else(|| {
            BudgetError::structure(
                format!("at most {} replicas", MAX_REPLICAS),
                format!("{} registered", taken.len()),
            )
        })?;

    let guid = Uuid::new_v4().to_string().to_uppercase();
    let replica_dir = replica_directory(data_root, &guid);
    fs::create_dir_all(&replica_dir).map_err(|e| BudgetError::from_io(&replica_dir, e))?;

    let knowledge = format!("{}-1", short_id);
    let record = ReplicaRecord {
        device_guid: Some(guid.clone()),
        short_device_id: Some(short_id.clone()),
        friendly_name: Some(friendly_name.to_string()),
        knowledge: Some(knowledge.clone()),
        knowledge_in_full_budget_file: Some(knowledge),
        has_full_knowledge: false,
        format_version: Some(REPLICA_FORMAT_VERSION.to_string()),
        app_version: Some(format!("Desktop version: YNAB 4 v{}", app_version)),
        device_type: Some(device_type.to_string()),
        last_data_version_fully_known: Some(REGISTERED_DATA_VERSION.to_string()),
        highest_data_version_imported: None,
    };

    let metadata_path = replica_metadata_path(data_root, &short_id);
    budget_fs::write_json_atomic(&metadata_path, &record, Overwrite::Refuse)?;
    debug!(short_id = %short_id, guid = %guid, "Registered replica");

    Ok(RegisteredReplica {
        short_id,
        guid,
        metadata_path,
    })
}

//! Budget assembly and the write path.

use crate::changes::{
    discover_change_files, entity_to_record, tombstone_record, write_change, ChangeFile,
    ChangeHeader, ChangeRecord,
};
use crate::entities::{EntityCollections, EntityKind, EntityRecord};
use crate::error::{BudgetError, Result, SkippedItem};
use crate::fs::{BudgetFs, OsFs};
use crate::merge::{available_versions, MergeEngine, ReplayTarget};
use crate::replicas::{
    advance_replica_knowledge, compute_global_knowledge, discover_data_root,
    discover_replica_records, replica_directory, replica_metadata_path, select_active_replica,
    snapshot_path, ActiveReplica, ReplicaScan,
};
use crate::snapshot;
use crate::version::{Knowledge, VersionToken};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Budget configuration.
#[derive(Clone, Debug)]
pub struct BudgetConfig {
    /// Budget root (the directory containing `data1~*`).
    pub path: PathBuf,

    /// Copy a replica record aside before rewriting it.
    pub backup_replica_records: bool,

    /// Data version stamped into written change files.
    pub data_version: String,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./budget"),
            backup_replica_records: false,
            data_version: "4.2".to_string(),
        }
    }
}

impl BudgetConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// A budget after replay.
#[derive(Clone, Debug)]
pub struct MergedBudget {
    replica_guid: String,
    replica_short_id: String,
    collections: EntityCollections,
    applied: Vec<String>,
    version: u64,
    target: ReplayTarget,
    knowledge: Option<Knowledge>,
    skipped: Vec<SkippedItem>,
}

impl MergedBudget {
    /// GUID of the replica that was replayed.
    pub fn replica_guid(&self) -> &str {
        &self.replica_guid
    }

    pub fn replica_short_id(&self) -> &str {
        &self.replica_short_id
    }

    pub fn collections(&self) -> &EntityCollections {
        &self.collections
    }

    pub fn into_collections(self) -> EntityCollections {
        self.collections
    }

    /// Names of the applied change files, in order.
    pub fn applied_files(&self) -> &[String] {
        &self.applied
    }

    /// End version of the last applied file, 0 for the bare snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The bound replay was asked for.
    pub fn target(&self) -> ReplayTarget {
        self.target
    }

    /// Union of all replicas' knowledge at load time.
    pub fn knowledge(&self) -> Option<&Knowledge> {
        self.knowledge.as_ref()
    }

    /// Replica records and change records that were skipped.
    pub fn skipped(&self) -> &[SkippedItem] {
        &self.skipped
    }

    /// SHA-256 (hex) of the collections' canonical JSON.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&self.collections)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}

/// One change to write.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityChange {
    /// Create or update an entity. Its version is replaced on write.
    Upsert(EntityRecord),
    Delete { kind: EntityKind, id: String },
}

/// Outcome of [`Budget::write_changes`].
#[derive(Clone, Debug)]
pub struct WriteReceipt {
    pub file: ChangeFile,
    /// Version stamped on every written record.
    pub new_version: VersionToken,
    /// Knowledge now recorded for the writing replica.
    pub knowledge: Knowledge,
}

/// Resolved on-disk locations for the active replica.
struct Layout {
    data_root: PathBuf,
    scan: ReplicaScan,
    active: ActiveReplica,
    files: Vec<ChangeFile>,
}

/// A budget on disk.
///
/// Every call re-reads the budget; nothing is cached between calls.
pub struct Budget<F: BudgetFs = OsFs> {
    config: BudgetConfig,
    fs: F,
}

impl Budget<OsFs> {
    /// Open a budget on the real filesystem.
    pub fn open(config: BudgetConfig) -> Result<Self> {
        if !config.path.is_dir() {
            return Err(BudgetError::NotFound(config.path.clone()));
        }
        Ok(Self::with_fs(config, OsFs))
    }

    /// Write `changes` as a new change file from the active replica.
    ///
    /// The new version is the active replica's id with a counter one past
    /// the global knowledge. The file is named
    /// `<global effective>_<new version>.ydiff`; afterwards the replica's
    /// knowledge is advanced to include the new version; if that fails the
    /// new file is removed again before the error is returned. Callers that share
    /// the budget with other processes should hold a
    /// [`BudgetLock`](crate::lock::BudgetLock) around this call.
    pub fn write_changes(&self, changes: &[EntityChange]) -> Result<WriteReceipt> {
        let layout = self.layout()?;
        let global = compute_global_knowledge(&layout.scan.records).ok_or_else(|| {
            BudgetError::structure("a replica record with knowledge", "none")
        })?;
        let base = global
            .effective()
            .ok_or_else(|| BudgetError::structure("non-empty knowledge", "empty"))?;

        let replica = layout.active.short_id.chars().next().ok_or_else(|| {
            BudgetError::format(layout.active.short_id.clone(), "empty replica id")
        })?;
        let new_version = VersionToken::new(replica, base.counter())?.increment()?;
        let stamp = new_version.to_string();

        let records: Vec<ChangeRecord> = changes
            .iter()
            .map(|change| match change {
                EntityChange::Upsert(entity) => {
                    let mut entity = entity.clone();
                    entity.set_entity_version(stamp.clone());
                    entity_to_record(&entity, false)
                }
                EntityChange::Delete { kind, id } => tombstone_record(*kind, id, &stamp),
            })
            .collect();

        let start = base.to_string();
        let file = write_change(
            &replica_directory(&layout.data_root, &layout.active.guid),
            &records,
            ChangeHeader {
                start_version: &start,
                end_version: &stamp,
                replica_guid: &layout.active.guid,
                short_id: &layout.active.short_id,
                data_version: &self.config.data_version,
            },
        )?;

        let mut knowledge = global;
        knowledge.observe(new_version);
        let advanced = advance_replica_knowledge(
            &replica_metadata_path(&layout.data_root, &layout.active.short_id),
            &knowledge,
            Some(&knowledge),
            self.config.backup_replica_records,
        );
        if let Err(e) = advanced {
            // The change file and the knowledge advance land together.
            if let Err(remove) = std::fs::remove_file(&file.path) {
                warn!(
                    file = %file.path.display(),
                    error = %remove,
                    "Could not remove change file after failed knowledge advance"
                );
            }
            return Err(e);
        }

        info!(
            file = %file.name,
            records = records.len(),
            knowledge = %knowledge,
            "Wrote changes"
        );
        Ok(WriteReceipt {
            file,
            new_version,
            knowledge,
        })
    }
}

impl<F: BudgetFs> Budget<F> {
    /// Use a custom filesystem (e.g. [`MemoryFs`](crate::fs::MemoryFs)).
    pub fn with_fs(config: BudgetConfig, fs: F) -> Self {
        Self { config, fs }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    fn layout(&self) -> Result<Layout> {
        let data_root = discover_data_root(&self.fs, &self.config.path)?;
        let scan = discover_replica_records(&self.fs, &data_root)?;
        let active = select_active_replica(&scan.records)?;

        let replica_dir = replica_directory(&data_root, &active.guid);
        if !self.fs.is_dir(&replica_dir) {
            return Err(BudgetError::NotFound(replica_dir));
        }
        let files = discover_change_files(&self.fs, &replica_dir)?;

        Ok(Layout {
            data_root,
            scan,
            active,
            files,
        })
    }

    /// Snapshot plus every change file of the active replica.
    pub fn assemble(&self) -> Result<MergedBudget> {
        self.assemble_target(ReplayTarget::All)
    }

    /// Snapshot plus change files ending at or before `version`.
    pub fn assemble_at_version(&self, version: u64) -> Result<MergedBudget> {
        self.assemble_target(ReplayTarget::Version(version))
    }

    pub fn assemble_target(&self, target: ReplayTarget) -> Result<MergedBudget> {
        let layout = self.layout()?;
        let snapshot_file = snapshot_path(&self.fs, &layout.data_root, &layout.active.guid)?;
        let base = snapshot::load(&self.fs, &snapshot_file)?;

        let replay = MergeEngine::new(&self.fs).replay(&base, &layout.files, target)?;
        let knowledge = compute_global_knowledge(&layout.scan.records);

        let mut skipped = layout.scan.skipped;
        skipped.extend(replay.stats.skipped);

        info!(
            replica = %layout.active.short_id,
            files = replay.applied.len(),
            target = %target,
            version = replay.version,
            skipped = skipped.len(),
            "Assembled budget"
        );

        Ok(MergedBudget {
            replica_guid: layout.active.guid,
            replica_short_id: layout.active.short_id,
            collections: replay.collections,
            applied: replay.applied.into_iter().map(|f| f.name).collect(),
            version: replay.version,
            target,
            knowledge,
            skipped,
        })
    }

    /// Parse `target` (`"all"` or a version) and assemble.
    ///
    /// An unparseable target is a range error listing the valid versions.
    pub fn assemble_at(&self, target: &str) -> Result<MergedBudget> {
        match ReplayTarget::parse(target) {
            Ok(target) => self.assemble_target(target),
            Err(BudgetError::Range { requested, .. }) => Err(BudgetError::Range {
                requested,
                valid: self.available_versions()?,
            }),
            Err(e) => Err(e),
        }
    }

    /// Versions that can be passed to [`assemble_at_version`](Self::assemble_at_version).
    pub fn available_versions(&self) -> Result<Vec<u64>> {
        Ok(available_versions(&self.layout()?.files))
    }

    pub fn has_version(&self, version: u64) -> Result<bool> {
        Ok(self.available_versions()?.contains(&version))
    }

    /// Union of all replicas' knowledge, `None` if no replica has any.
    pub fn global_knowledge(&self) -> Result<Option<Knowledge>> {
        let data_root = discover_data_root(&self.fs, &self.config.path)?;
        let scan = discover_replica_records(&self.fs, &data_root)?;
        Ok(compute_global_knowledge(&scan.records))
    }
}

/// Assemble the budget at `path` with every change file applied.
pub fn assemble(path: impl AsRef<Path>) -> Result<MergedBudget> {
    Budget::open(BudgetConfig::new(path.as_ref()))?.assemble()
}

/// Assemble the budget at `path` up to `version`.
pub fn assemble_at_version(path: impl AsRef<Path>, version: u64) -> Result<MergedBudget> {
    Budget::open(BudgetConfig::new(path.as_ref()))?.assemble_at_version(version)
}

/// Versions the budget at `path` can be assembled at.
pub fn available_versions_at(path: impl AsRef<Path>) -> Result<Vec<u64>> {
    Budget::open(BudgetConfig::new(path.as_ref()))?.available_versions()
}

/// Write `changes` to the budget at `path` with default settings.
pub fn write_changes(path: impl AsRef<Path>, changes: &[EntityChange]) -> Result<WriteReceipt> {
    Budget::open(BudgetConfig::new(path.as_ref()))?.write_changes(changes)
}

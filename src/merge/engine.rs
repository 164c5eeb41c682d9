//! Last-writer-wins folding of change records into entity collections.

use crate::changes::{load_change_file, ChangeFile, ChangeRecord};
use crate::entities::{Entity, EntityCollections, EntityKind};
use crate::error::{BudgetError, Result, SkippedItem};
use crate::fs::BudgetFs;
use crate::version::effective_version;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// What applying one record did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// New id, entity constructed from the record.
    Inserted,
    /// Existing entity patched with a strictly newer version.
    Updated,
    /// Existing entity already at an equal or newer version.
    Stale,
    Deleted,
    /// Tombstone for an id that is not present.
    TombstoneMissing,
    /// Unknown entity type.
    Skipped,
}

/// Apply one record to `collections`.
///
/// Records of unknown type are skipped with a warning. A tombstone removes
/// the entity if present. An update to an existing entity is applied only
/// when its effective counter is strictly greater than the stored one, and
/// then overlays its fields on the stored entity. A record for a new id must
/// carry enough fields to build the entity.
pub fn apply_record(
    collections: &mut EntityCollections,
    record: &ChangeRecord,
) -> Result<RecordOutcome> {
    let Some(kind) = record.kind() else {
        warn!(
            entity_type = %record.entity_type,
            entity_id = %record.entity_id,
            "Skipping change record of unknown entity type"
        );
        return Ok(RecordOutcome::Skipped);
    };

    match kind {
        EntityKind::Account => merge_into(&mut collections.accounts, record),
        EntityKind::Payee => merge_into(&mut collections.payees, record),
        EntityKind::PayeeStringCondition => {
            merge_into(&mut collections.payee_string_conditions, record)
        }
        EntityKind::Transaction => merge_into(&mut collections.transactions, record),
        EntityKind::MasterCategory => merge_into(&mut collections.master_categories, record),
        EntityKind::Category => merge_into(&mut collections.categories, record),
        EntityKind::MonthlyBudget => merge_into(&mut collections.monthly_budgets, record),
        EntityKind::MonthlyCategoryBudget => {
            merge_into(&mut collections.monthly_category_budgets, record)
        }
        EntityKind::ScheduledTransaction => {
            merge_into(&mut collections.scheduled_transactions, record)
        }
    }
}

fn merge_into<T: Entity>(
    map: &mut BTreeMap<String, T>,
    record: &ChangeRecord,
) -> Result<RecordOutcome> {
    if record.is_tombstone {
        return Ok(match map.remove(&record.entity_id) {
            Some(_) => RecordOutcome::Deleted,
            None => RecordOutcome::TombstoneMissing,
        });
    }

    let incoming = record.effective_version()?;
    let object = match map.get(&record.entity_id) {
        Some(existing) => {
            let current = effective_version(existing.entity_version())?;
            if incoming.counter() <= current.counter() {
                return Ok(RecordOutcome::Stale);
            }
            let mut object = match serde_json::to_value(existing)? {
                Value::Object(fields) => fields,
                _ => Map::new(),
            };
            object.extend(record.entity_object());
            object
        }
        None => record.entity_object(),
    };

    let entity: T = serde_json::from_value(Value::Object(object)).map_err(|e| {
        BudgetError::format(
            format!("{} {}", T::KIND, record.entity_id),
            format!("cannot build entity from change record: {}", e),
        )
    })?;

    let outcome = match map.insert(record.entity_id.clone(), entity) {
        Some(_) => RecordOutcome::Updated,
        None => RecordOutcome::Inserted,
    };
    Ok(outcome)
}

/// Outcome counts for one or more applied files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub inserted: usize,
    pub updated: usize,
    pub stale: usize,
    pub deleted: usize,
    pub missing_tombstones: usize,
    pub skipped: Vec<SkippedItem>,
}

impl ApplyStats {
    fn count(&mut self, outcome: RecordOutcome, file: &ChangeFile, record: &ChangeRecord) {
        match outcome {
            RecordOutcome::Inserted => self.inserted += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Stale => self.stale += 1,
            RecordOutcome::Deleted => self.deleted += 1,
            RecordOutcome::TombstoneMissing => self.missing_tombstones += 1,
            RecordOutcome::Skipped => self.skipped.push(SkippedItem::new(
                &file.path,
                Some(record.entity_id.clone()),
                format!("unknown entity type '{}'", record.entity_type),
            )),
        }
    }

    fn absorb(&mut self, other: ApplyStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.stale += other.stale;
        self.deleted += other.deleted;
        self.missing_tombstones += other.missing_tombstones;
        self.skipped.extend(other.skipped);
    }
}

/// How far to replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplayTarget {
    #[default]
    All,
    /// Apply files whose end version is at most this counter.
    Version(u64),
}

impl ReplayTarget {
    /// Parse `"all"` or a non-negative version number.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ReplayTarget::All);
        }
        s.parse::<u64>()
            .map(ReplayTarget::Version)
            .map_err(|_| BudgetError::Range {
                requested: s.to_string(),
                valid: Vec::new(),
            })
    }
}

impl FromStr for ReplayTarget {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self> {
        ReplayTarget::parse(s)
    }
}

impl fmt::Display for ReplayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayTarget::All => f.write_str("all"),
            ReplayTarget::Version(v) => write!(f, "{}", v),
        }
    }
}

/// Result of one replay.
#[derive(Clone, Debug)]
pub struct ReplayResult {
    pub collections: EntityCollections,
    /// Files applied, in order.
    pub applied: Vec<ChangeFile>,
    pub stats: ApplyStats,
    /// End version of the last applied file, 0 if none.
    pub version: u64,
}

/// `0` plus every file's end version, ascending and without duplicates.
pub fn available_versions(files: &[ChangeFile]) -> Vec<u64> {
    let mut versions: Vec<u64> = std::iter::once(0)
        .chain(files.iter().map(ChangeFile::end_version_number))
        .collect();
    versions.sort_unstable();

    let total = versions.len();
    versions.dedup();
    if versions.len() != total {
        warn!(
            duplicates = total - versions.len(),
            "Change files share end versions"
        );
    }
    versions
}

/// Folds change files into a snapshot.
pub struct MergeEngine<'a> {
    fs: &'a dyn BudgetFs,
}

impl<'a> MergeEngine<'a> {
    pub fn new(fs: &'a dyn BudgetFs) -> Self {
        Self { fs }
    }

    /// Apply every record of `file` in stored order.
    pub fn apply_file(
        &self,
        collections: &mut EntityCollections,
        file: &ChangeFile,
    ) -> Result<ApplyStats> {
        let mut stats = ApplyStats::default();
        for record in load_change_file(self.fs, file)? {
            let outcome = apply_record(collections, &record)?;
            stats.count(outcome, file, &record);
        }

        debug!(
            file = %file.name,
            inserted = stats.inserted,
            updated = stats.updated,
            stale = stats.stale,
            deleted = stats.deleted,
            "Applied change file"
        );
        Ok(stats)
    }

    /// Replay `files` (already ordered) over a copy of `snapshot`.
    ///
    /// Replay always starts from `snapshot`, so earlier targets can be
    /// requested after later ones. `Version(n)` must be one of
    /// [`available_versions`]; files are applied until the first one whose
    /// end version exceeds `n`. `Version(0)` applies nothing.
    pub fn replay(
        &self,
        snapshot: &EntityCollections,
        files: &[ChangeFile],
        target: ReplayTarget,
    ) -> Result<ReplayResult> {
        let bound = match target {
            ReplayTarget::All => None,
            ReplayTarget::Version(requested) => {
                let valid = available_versions(files);
                if !valid.contains(&requested) {
                    return Err(BudgetError::Range {
                        requested: requested.to_string(),
                        valid,
                    });
                }
                Some(requested)
            }
        };

        let mut collections = snapshot.clone();
        let mut applied = Vec::new();
        let mut stats = ApplyStats::default();

        for file in files {
            if let Some(bound) = bound {
                if bound == 0 || file.end_version_number() > bound {
                    break;
                }
            }
            stats.absorb(self.apply_file(&mut collections, file)?);
            applied.push(file.clone());
        }

        let version = applied
            .last()
            .map(ChangeFile::end_version_number)
            .unwrap_or(0);

        Ok(ReplayResult {
            collections,
            applied,
            stats,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Payee, Transaction};
    use crate::fs::MemoryFs;
    use serde_json::json;

    const DIR: &str = "/b/data1~X/G";

    fn record(item: Value) -> ChangeRecord {
        ChangeRecord::from_item(std::path::Path::new("test.ydiff"), 0, item).unwrap()
    }

    fn base() -> EntityCollections {
        let mut collections = EntityCollections::new();
        collections.insert(
            Payee {
                entity_id: "P1".into(),
                name: "Grocer".into(),
                enabled: true,
                entity_version: "A-10".into(),
            }
            .into(),
        );
        collections.insert(
            Transaction {
                entity_id: "T1".into(),
                account_id: "ACC-1".into(),
                payee_id: Some("P1".into()),
                category_id: Some("C-1".into()),
                amount: -20.0,
                date: "2025-08-01".into(),
                cleared: "Uncleared".into(),
                accepted: true,
                memo: Some("weekly shop".into()),
                entity_version: "A-10".into(),
            }
            .into(),
        );
        collections
    }

    fn write_file(fs: &mut MemoryFs, name: &str, items: Value) -> ChangeFile {
        let path = format!("{}/{}", DIR, name);
        fs.insert(path.as_str(), json!({ "items": items }).to_string());
        ChangeFile::from_path(path).unwrap()
    }

    // --- apply_record ---

    #[test]
    fn test_patch_keeps_unmentioned_fields() {
        let mut collections = base();
        let outcome = apply_record(
            &mut collections,
            &record(json!({
                "entityType": "transaction", "entityId": "T1",
                "entityVersion": "A-11", "isTombstone": false,
                "amount": -25.5
            })),
        )
        .unwrap();

        assert_eq!(outcome, RecordOutcome::Updated);
        let txn = &collections.transactions["T1"];
        assert_eq!(txn.amount, -25.5);
        assert_eq!(txn.memo.as_deref(), Some("weekly shop"));
        assert_eq!(txn.payee_id.as_deref(), Some("P1"));
        assert_eq!(txn.entity_version, "A-11");
    }

    #[test]
    fn test_older_or_equal_versions_never_regress() {
        let mut collections = base();
        for version in ["A-10", "A-9", "A-1,B-9"] {
            let outcome = apply_record(
                &mut collections,
                &record(json!({
                    "entityType": "payee", "entityId": "P1",
                    "entityVersion": version, "isTombstone": false,
                    "name": "Regressed"
                })),
            )
            .unwrap();
            assert_eq!(outcome, RecordOutcome::Stale, "{}", version);
        }
        assert_eq!(collections.payees["P1"].name, "Grocer");
    }

    #[test]
    fn test_counter_tie_across_replicas_keeps_stored() {
        let mut collections = base();
        let outcome = apply_record(
            &mut collections,
            &record(json!({
                "entityType": "payee", "entityId": "P1",
                "entityVersion": "B-10", "isTombstone": false,
                "name": "New"
            })),
        )
        .unwrap();
        assert_eq!(outcome, RecordOutcome::Stale);
        assert_eq!(collections.payees["P1"].name, "Grocer");
        assert_eq!(collections.payees["P1"].entity_version, "A-10");
    }

    #[test]
    fn test_composite_versions_compare_by_effective_token() {
        let mut collections = base();
        let outcome = apply_record(
            &mut collections,
            &record(json!({
                "entityType": "payee", "entityId": "P1",
                "entityVersion": "A-3,B-11", "isTombstone": false,
                "enabled": false
            })),
        )
        .unwrap();
        assert_eq!(outcome, RecordOutcome::Updated);
        assert!(!collections.payees["P1"].enabled);
    }

    #[test]
    fn test_tombstones() {
        let mut collections = base();
        let before = collections.len();

        let missing = record(json!({
            "entityType": "payee", "entityId": "NOPE",
            "entityVersion": "A-12", "isTombstone": true
        }));
        assert_eq!(
            apply_record(&mut collections, &missing).unwrap(),
            RecordOutcome::TombstoneMissing
        );
        assert_eq!(collections.len(), before);

        let delete = record(json!({
            "entityType": "payee", "entityId": "P1",
            "entityVersion": "A-12", "isTombstone": true
        }));
        assert_eq!(
            apply_record(&mut collections, &delete).unwrap(),
            RecordOutcome::Deleted
        );
        assert_eq!(
            apply_record(&mut collections, &delete).unwrap(),
            RecordOutcome::TombstoneMissing
        );
        assert!(!collections.contains(EntityKind::Payee, "P1"));
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let mut collections = base();
        let before = collections.clone();
        let outcome = apply_record(
            &mut collections,
            &record(json!({
                "entityType": "budgetMetaData", "entityId": "M1",
                "entityVersion": "A-99", "isTombstone": false
            })),
        )
        .unwrap();
        assert_eq!(outcome, RecordOutcome::Skipped);
        assert_eq!(collections, before);
    }

    #[test]
    fn test_new_entity_needs_complete_fields() {
        let mut collections = base();
        let outcome = apply_record(
            &mut collections,
            &record(json!({
                "entityType": "payee", "entityId": "P2",
                "entityVersion": "A-12", "isTombstone": false,
                "name": "Fuel Stop", "enabled": true
            })),
        )
        .unwrap();
        assert_eq!(outcome, RecordOutcome::Inserted);
        assert_eq!(collections.payees["P2"].entity_version, "A-12");

        let err = apply_record(
            &mut collections,
            &record(json!({
                "entityType": "payee", "entityId": "P3",
                "entityVersion": "A-12", "isTombstone": false
            })),
        )
        .unwrap_err();
        assert!(matches!(err, BudgetError::Format { .. }));
    }

    // --- files and replay ---

    #[test]
    fn test_apply_file_twice_is_idempotent() {
        let mut fs = MemoryFs::new();
        let file = write_file(
            &mut fs,
            "A-10_A-11.ydiff",
            json!([
                {"entityType": "payee", "entityId": "P1", "entityVersion": "A-11",
                 "isTombstone": false, "name": "Grocer & Co"},
                {"entityType": "payee", "entityId": "P2", "entityVersion": "A-11",
                 "isTombstone": false, "name": "New", "enabled": true}
            ]),
        );
        let engine = MergeEngine::new(&fs);

        let mut collections = base();
        let first = engine.apply_file(&mut collections, &file).unwrap();
        assert_eq!((first.updated, first.inserted), (1, 1));
        let after_first = collections.clone();

        let second = engine.apply_file(&mut collections, &file).unwrap();
        assert_eq!(second.stale, 2);
        assert_eq!(collections, after_first);
    }

    #[test]
    fn test_skipped_records_are_reported_per_file() {
        let mut fs = MemoryFs::new();
        let file = write_file(
            &mut fs,
            "A-10_A-11.ydiff",
            json!([
                {"entityType": "mysteryThing", "entityId": "X1", "entityVersion": "A-11",
                 "isTombstone": false}
            ]),
        );
        let stats = MergeEngine::new(&fs)
            .apply_file(&mut base(), &file)
            .unwrap();
        assert_eq!(stats.skipped.len(), 1);
        assert_eq!(stats.skipped[0].item.as_deref(), Some("X1"));
        assert!(stats.skipped[0].reason.contains("mysteryThing"));
    }

    fn chain(fs: &mut MemoryFs) -> Vec<ChangeFile> {
        (11..=13)
            .map(|n| {
                write_file(
                    fs,
                    &format!("A-{}_A-{}.ydiff", n - 1, n),
                    json!([{
                        "entityType": "transaction", "entityId": "T1",
                        "entityVersion": format!("A-{}", n), "isTombstone": false,
                        "amount": -(n as f64)
                    }]),
                )
            })
            .collect()
    }

    #[test]
    fn test_replay_bounds() {
        let mut fs = MemoryFs::new();
        let files = chain(&mut fs);
        let engine = MergeEngine::new(&fs);
        let snapshot = base();

        let none = engine
            .replay(&snapshot, &files, ReplayTarget::Version(0))
            .unwrap();
        assert!(none.applied.is_empty());
        assert_eq!(none.collections, snapshot);
        assert_eq!(none.version, 0);

        let two = engine
            .replay(&snapshot, &files, ReplayTarget::Version(12))
            .unwrap();
        assert_eq!(two.applied.len(), 2);
        assert_eq!(two.collections.transactions["T1"].amount, -12.0);

        let all = engine.replay(&snapshot, &files, ReplayTarget::All).unwrap();
        assert_eq!(all.applied.len(), 3);
        assert_eq!(all.version, 13);
    }

    #[test]
    fn test_replay_restarts_from_snapshot() {
        let mut fs = MemoryFs::new();
        let files = chain(&mut fs);
        let engine = MergeEngine::new(&fs);
        let snapshot = base();

        engine.replay(&snapshot, &files, ReplayTarget::All).unwrap();
        let again = engine
            .replay(&snapshot, &files, ReplayTarget::Version(11))
            .unwrap();
        let direct = MergeEngine::new(&fs)
            .replay(&snapshot, &files, ReplayTarget::Version(11))
            .unwrap();
        assert_eq!(again.collections, direct.collections);
        assert_eq!(again.collections.transactions["T1"].amount, -11.0);
    }

    #[test]
    fn test_replay_rejects_unknown_target() {
        let mut fs = MemoryFs::new();
        let files = chain(&mut fs);
        let err = MergeEngine::new(&fs)
            .replay(&base(), &files, ReplayTarget::Version(50))
            .unwrap_err();
        match err {
            BudgetError::Range { requested, valid } => {
                assert_eq!(requested, "50");
                assert_eq!(valid, vec![0, 11, 12, 13]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_available_versions_collapses_duplicates() {
        let files = vec![
            ChangeFile::from_path("/x/A-1_A-5.ydiff").unwrap(),
            ChangeFile::from_path("/x/A-1,B-3_A-5,B-3.ydiff").unwrap(),
            ChangeFile::from_path("/x/A-5_A-9.ydiff").unwrap(),
        ];
        assert_eq!(available_versions(&files), vec![0, 5, 9]);
        assert_eq!(available_versions(&[]), vec![0]);
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(ReplayTarget::parse("all").unwrap(), ReplayTarget::All);
        assert_eq!(ReplayTarget::parse("67").unwrap(), ReplayTarget::Version(67));
        for bad in ["-1", "abc", ""] {
            assert!(matches!(
                ReplayTarget::parse(bad),
                Err(BudgetError::Range { .. })
            ));
        }
    }
}

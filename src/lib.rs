//! # Budget Replay
//!
//! Reconstructs the current state of a replicated YNAB4-style budget from a
//! full snapshot plus an ordered chain of incremental change files.
//!
//! ## Core Concepts
//!
//! - **Versions**: `<Replica>-<Counter>` tokens and composite knowledge
//!   strings, ordered by counter then replica
//! - **Replicas**: per-device metadata; the one with the highest effective
//!   knowledge is replayed
//! - **Change files**: `<start>_<end>.ydiff` batches ordered by effective
//!   start version
//! - **Merge**: per-entity last-writer-wins with tombstones and partial
//!   updates, always replayed from the snapshot
//!
//! ## Example
//!
//! ```ignore
//! use budget_replay::{Budget, BudgetConfig, BudgetReport};
//!
//! let budget = Budget::open(BudgetConfig::new("./My Budget~1A2B3C4D.ynab4"))?;
//!
//! // Everything, or only up to a given version
//! let merged = budget.assemble()?;
//! let earlier = budget.assemble_at_version(67)?;
//!
//! let report = BudgetReport::new(&merged);
//! let summary = report.monthly_summary("2025-08")?;
//! ```

pub mod budget;
pub mod changes;
pub mod entities;
pub mod error;
pub mod fs;
pub mod lock;
pub mod merge;
pub mod replicas;
pub mod report;
pub mod snapshot;
pub mod version;

// Re-exports
pub use budget::{
    assemble, assemble_at_version, available_versions_at, write_changes, Budget, BudgetConfig,
    EntityChange, MergedBudget, WriteReceipt,
};
pub use changes::{ChangeFile, ChangeHeader, ChangeRecord};
pub use entities::{
    Account, Category, Entity, EntityCollections, EntityKind, EntityRecord, MasterCategory,
    MonthlyBudget, MonthlyCategoryBudget, Payee, PayeeStringCondition, ScheduledTransaction,
    Transaction,
};
pub use error::{BudgetError, ErrorKind, Result, SkippedItem};
pub use fs::{BudgetFs, DirEntry, MemoryFs, OsFs};
pub use lock::BudgetLock;
pub use merge::{ApplyStats, MergeEngine, RecordOutcome, ReplayResult, ReplayTarget};
pub use replicas::{ActiveReplica, RegisteredReplica, ReplicaRecord};
pub use report::{AccountBalance, BudgetReport, CategorySummary};
pub use version::{compare, Knowledge, VersionToken};

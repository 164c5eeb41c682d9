//! Replaying change files over a snapshot.
//!
//! Entities are versioned independently: a change record replaces an
//! entity only when its effective version is strictly greater than the
//! stored one. Folding is therefore idempotent and the per-file record
//! order does not matter for correctness.

mod engine;

pub use engine::{
    apply_record, available_versions, ApplyStats, MergeEngine, RecordOutcome, ReplayResult,
    ReplayTarget,
};

//! Replica discovery, selection and metadata updates.
//!
//! Each device that edits a budget owns a replica: a metadata document in
//! `devices/<id>.ydevice` and a directory named by its GUID holding a
//! snapshot plus the change files it wrote. The replica whose knowledge has
//! the highest effective version is the one a reader should replay.

mod directory;
mod record;

pub use directory::{
    advance_replica_knowledge, compute_global_knowledge, discover_data_root,
    discover_replica_records, register_replica, replica_directory, replica_metadata_path,
    select_active_replica, snapshot_path, ActiveReplica, RegisteredReplica, ReplicaScan,
    DATA_ROOT_PREFIX, DEVICES_DIR, REPLICA_EXTENSION,
};
pub use record::ReplicaRecord;

//! Change files: discovery, loading and encoding.
//!
//! A change file is named `<start>_<end>.ydiff` where each side is a single
//! or composite version. The range is used only to order files and to bound
//! replay; the records inside carry their own versions.

mod encoder;
mod file;
mod record;

pub use encoder::{entity_to_record, tombstone_record, write_change, ChangeHeader};
pub use file::{
    discover_change_files, load_change_file, parse_filename, ChangeFile, CHANGE_EXTENSION,
};
pub use record::ChangeRecord;

//! Replica metadata documents (`devices/<id>.ydevice`).

use crate::version::Knowledge;
use serde::{Deserialize, Serialize};

/// One replica's sync state as stored on disk.
///
/// Every field is optional on read so that a record with missing fields can
/// still be inspected; selection decides which omissions are fatal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaRecord {
    #[serde(rename = "deviceGUID", default)]
    pub device_guid: Option<String>,
    #[serde(default)]
    pub short_device_id: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub knowledge: Option<String>,
    #[serde(default)]
    pub knowledge_in_full_budget_file: Option<String>,
    #[serde(default)]
    pub has_full_knowledge: bool,
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(rename = "YNABVersion", default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub last_data_version_fully_known: Option<String>,
    #[serde(default)]
    pub highest_data_version_imported: Option<String>,
}

impl ReplicaRecord {
    /// GUID, treating an empty string as absent.
    pub fn guid(&self) -> Option<&str> {
        self.device_guid.as_deref().filter(|g| !g.is_empty())
    }

    /// Parsed `knowledge`, or `None` if absent or malformed.
    pub fn parsed_knowledge(&self) -> Option<Knowledge> {
        self.knowledge
            .as_deref()
            .and_then(|k| Knowledge::parse(k).ok())
            .filter(|k| !k.is_empty())
    }
}

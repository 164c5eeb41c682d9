//! One change-file item.

use crate::entities::EntityKind;
use crate::error::{BudgetError, Result};
use crate::version::{effective_version, VersionToken};
use serde_json::{Map, Value};
use std::path::Path;

const ENTITY_ID: &str = "entityId";
const ENTITY_TYPE: &str = "entityType";
const ENTITY_VERSION: &str = "entityVersion";
const IS_TOMBSTONE: &str = "isTombstone";
const MADE_WITH_KNOWLEDGE: &str = "madeWithKnowledge";
const IS_RESOLVED_CONFLICT: &str = "isResolvedConflict";

/// A mutation of one entity.
///
/// `entity_type` is kept as the raw tag so that records for kinds this
/// crate does not model survive loading and can be reported when skipped.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeRecord {
    pub entity_id: String,
    pub entity_type: String,
    pub entity_version: String,
    pub is_tombstone: bool,
    /// Payload keys of the item, in on-disk (camelCase) form. Sync
    /// bookkeeping keys are not kept.
    pub fields: Map<String, Value>,
}

impl ChangeRecord {
    /// Known kind of this record, `None` for unmodelled tags.
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_tag(&self.entity_type)
    }

    /// Effective version of `entity_version`.
    pub fn effective_version(&self) -> Result<VersionToken> {
        effective_version(&self.entity_version)
    }

    /// Build a record from one element of a change file's `items` array.
    pub(crate) fn from_item(source: &Path, index: usize, item: Value) -> Result<Self> {
        let location = || format!("{} item #{}", source.display(), index);

        let Value::Object(mut fields) = item else {
            return Err(BudgetError::format(location(), "change item is not an object"));
        };

        let mut text = |key: &str| match fields.remove(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(BudgetError::format(location(), format!("{} is not a string", key))),
            None => Err(BudgetError::format(location(), format!("missing {}", key))),
        };
        let entity_id = text(ENTITY_ID)?;
        let entity_type = text(ENTITY_TYPE)?;
        let entity_version = text(ENTITY_VERSION)?;

        let is_tombstone = match fields.remove(IS_TOMBSTONE) {
            Some(Value::Bool(b)) => b,
            Some(_) => {
                return Err(BudgetError::format(
                    location(),
                    format!("{} is not a boolean", IS_TOMBSTONE),
                ))
            }
            None => {
                return Err(BudgetError::format(
                    location(),
                    format!("missing {}", IS_TOMBSTONE),
                ))
            }
        };

        fields.remove(MADE_WITH_KNOWLEDGE);
        fields.remove(IS_RESOLVED_CONFLICT);

        effective_version(&entity_version).map_err(|e| {
            BudgetError::format(location(), format!("bad entityVersion: {}", e))
        })?;

        Ok(Self {
            entity_id,
            entity_type,
            entity_version,
            is_tombstone,
            fields,
        })
    }

    /// The entity as a JSON object: payload fields plus id and version.
    pub fn entity_object(&self) -> Map<String, Value> {
        let mut object = self.fields.clone();
        object.insert(ENTITY_ID.into(), self.entity_id.clone().into());
        object.insert(ENTITY_VERSION.into(), self.entity_version.clone().into());
        object
    }

    /// On-disk item form.
    pub fn to_item(&self) -> Value {
        let mut item = Map::new();
        item.insert(ENTITY_TYPE.into(), self.entity_type.clone().into());
        item.insert(ENTITY_ID.into(), self.entity_id.clone().into());
        item.insert(ENTITY_VERSION.into(), self.entity_version.clone().into());
        item.insert(IS_TOMBSTONE.into(), self.is_tombstone.into());
        item.insert(MADE_WITH_KNOWLEDGE.into(), Value::Null);
        item.insert(IS_RESOLVED_CONFLICT.into(), false.into());
        if !self.is_tombstone {
            for (key, value) in &self.fields {
                item.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        Value::Object(item)
    }
}

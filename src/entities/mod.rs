//! Closed entity model.
//!
//! Every on-disk entity kind maps to one struct carrying only its fixed
//! field set. Unknown JSON fields are dropped when a document is
//! deserialized into these types.

mod budgeting;
mod collections;
mod ledger;

pub use budgeting::{Category, MasterCategory, MonthlyBudget, MonthlyCategoryBudget};
pub use collections::EntityCollections;
pub use ledger::{Account, Payee, PayeeStringCondition, ScheduledTransaction, Transaction};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Unwrap a `json!` object literal into its field map.
fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// The fixed set of entity kinds a change record may target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Account,
    Payee,
    PayeeStringCondition,
    Transaction,
    MasterCategory,
    Category,
    MonthlyBudget,
    MonthlyCategoryBudget,
    ScheduledTransaction,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Account,
        EntityKind::Payee,
        EntityKind::PayeeStringCondition,
        EntityKind::Transaction,
        EntityKind::MasterCategory,
        EntityKind::Category,
        EntityKind::MonthlyBudget,
        EntityKind::MonthlyCategoryBudget,
        EntityKind::ScheduledTransaction,
    ];

    /// Tag used in the `entityType` field of change records.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Payee => "payee",
            EntityKind::PayeeStringCondition => "payeeStringCondition",
            EntityKind::Transaction => "transaction",
            EntityKind::MasterCategory => "masterCategory",
            EntityKind::Category => "category",
            EntityKind::MonthlyBudget => "monthlyBudget",
            EntityKind::MonthlyCategoryBudget => "monthlyCategoryBudget",
            EntityKind::ScheduledTransaction => "scheduledTransaction",
        }
    }

    /// Resolve an `entityType` tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        EntityKind::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour shared by all typed entities.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn entity_id(&self) -> &str;

    /// Raw version string, single or composite.
    fn entity_version(&self) -> &str;

    fn set_entity_version(&mut self, version: String);

    /// Fields written into a change record for this entity.
    fn change_fields(&self) -> Map<String, Value>;
}

/// Any typed entity.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityRecord {
    Account(Account),
    Payee(Payee),
    PayeeStringCondition(PayeeStringCondition),
    Transaction(Transaction),
    MasterCategory(MasterCategory),
    Category(Category),
    MonthlyBudget(MonthlyBudget),
    MonthlyCategoryBudget(MonthlyCategoryBudget),
    ScheduledTransaction(ScheduledTransaction),
}

macro_rules! each_record {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            EntityRecord::Account($inner) => $body,
            EntityRecord::Payee($inner) => $body,
            EntityRecord::PayeeStringCondition($inner) => $body,
            EntityRecord::Transaction($inner) => $body,
            EntityRecord::MasterCategory($inner) => $body,
            EntityRecord::Category($inner) => $body,
            EntityRecord::MonthlyBudget($inner) => $body,
            EntityRecord::MonthlyCategoryBudget($inner) => $body,
            EntityRecord::ScheduledTransaction($inner) => $body,
        }
    };
}

macro_rules! record_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for EntityRecord {
                fn from(entity: $variant) -> Self {
                    EntityRecord::$variant(entity)
                }
            }
        )*
    };
}

record_from!(
    Account,
    Payee,
    PayeeStringCondition,
    Transaction,
    MasterCategory,
    Category,
    MonthlyBudget,
    MonthlyCategoryBudget,
    ScheduledTransaction,
);

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Account(_) => EntityKind::Account,
            EntityRecord::Payee(_) => EntityKind::Payee,
            EntityRecord::PayeeStringCondition(_) => EntityKind::PayeeStringCondition,
            EntityRecord::Transaction(_) => EntityKind::Transaction,
            EntityRecord::MasterCategory(_) => EntityKind::MasterCategory,
            EntityRecord::Category(_) => EntityKind::Category,
            EntityRecord::MonthlyBudget(_) => EntityKind::MonthlyBudget,
            EntityRecord::MonthlyCategoryBudget(_) => EntityKind::MonthlyCategoryBudget,
            EntityRecord::ScheduledTransaction(_) => EntityKind::ScheduledTransaction,
        }
    }

    pub fn entity_id(&self) -> &str {
        each_record!(self, e => e.entity_id())
    }

    pub fn entity_version(&self) -> &str {
        each_record!(self, e => e.entity_version())
    }

    pub fn set_entity_version(&mut self, version: String) {
        each_record!(self, e => e.set_entity_version(version))
    }

    pub fn change_fields(&self) -> Map<String, Value> {
        each_record!(self, e => e.change_fields())
    }
}

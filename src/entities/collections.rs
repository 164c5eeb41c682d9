//! Per-kind entity maps.

use super::{
    Account, Category, Entity, EntityKind, EntityRecord, MasterCategory, MonthlyBudget,
    MonthlyCategoryBudget, Payee, PayeeStringCondition, ScheduledTransaction, Transaction,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// One id-keyed map per entity kind.
///
/// Maps are ordered by id so iteration, serialization and fingerprints do
/// not depend on load order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCollections {
    pub accounts: BTreeMap<String, Account>,
    pub payees: BTreeMap<String, Payee>,
    pub payee_string_conditions: BTreeMap<String, PayeeStringCondition>,
    pub transactions: BTreeMap<String, Transaction>,
    pub master_categories: BTreeMap<String, MasterCategory>,
    pub categories: BTreeMap<String, Category>,
    pub monthly_budgets: BTreeMap<String, MonthlyBudget>,
    pub monthly_category_budgets: BTreeMap<String, MonthlyCategoryBudget>,
    pub scheduled_transactions: BTreeMap<String, ScheduledTransaction>,
}

fn put<T: Entity>(map: &mut BTreeMap<String, T>, entity: T) -> Option<T> {
    map.insert(entity.entity_id().to_string(), entity)
}

fn version_in<'a, T: Entity>(map: &'a BTreeMap<String, T>, id: &str) -> Option<&'a str> {
    map.get(id).map(|e| e.entity_version())
}

impl EntityCollections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity unconditionally.
    ///
    /// Returns `true` if an entity with the same id was replaced.
    pub fn insert(&mut self, record: EntityRecord) -> bool {
        match record {
            EntityRecord::Account(e) => put(&mut self.accounts, e).is_some(),
            EntityRecord::Payee(e) => put(&mut self.payees, e).is_some(),
            EntityRecord::PayeeStringCondition(e) => {
                put(&mut self.payee_string_conditions, e).is_some()
            }
            EntityRecord::Transaction(e) => put(&mut self.transactions, e).is_some(),
            EntityRecord::MasterCategory(e) => put(&mut self.master_categories, e).is_some(),
            EntityRecord::Category(e) => put(&mut self.categories, e).is_some(),
            EntityRecord::MonthlyBudget(e) => put(&mut self.monthly_budgets, e).is_some(),
            EntityRecord::MonthlyCategoryBudget(e) => {
                put(&mut self.monthly_category_budgets, e).is_some()
            }
            EntityRecord::ScheduledTransaction(e) => {
                put(&mut self.scheduled_transactions, e).is_some()
            }
        }
    }

    /// Number of entities of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Account => self.accounts.len(),
            EntityKind::Payee => self.payees.len(),
            EntityKind::PayeeStringCondition => self.payee_string_conditions.len(),
            EntityKind::Transaction => self.transactions.len(),
            EntityKind::MasterCategory => self.master_categories.len(),
            EntityKind::Category => self.categories.len(),
            EntityKind::MonthlyBudget => self.monthly_budgets.len(),
            EntityKind::MonthlyCategoryBudget => self.monthly_category_budgets.len(),
            EntityKind::ScheduledTransaction => self.scheduled_transactions.len(),
        }
    }

    /// Total number of entities across all kinds.
    pub fn len(&self) -> usize {
        EntityKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored version string of an entity, if present.
    pub fn version_of(&self, kind: EntityKind, id: &str) -> Option<&str> {
        match kind {
            EntityKind::Account => version_in(&self.accounts, id),
            EntityKind::Payee => version_in(&self.payees, id),
            EntityKind::PayeeStringCondition => version_in(&self.payee_string_conditions, id),
            EntityKind::Transaction => version_in(&self.transactions, id),
            EntityKind::MasterCategory => version_in(&self.master_categories, id),
            EntityKind::Category => version_in(&self.categories, id),
            EntityKind::MonthlyBudget => version_in(&self.monthly_budgets, id),
            EntityKind::MonthlyCategoryBudget => version_in(&self.monthly_category_budgets, id),
            EntityKind::ScheduledTransaction => version_in(&self.scheduled_transactions, id),
        }
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.version_of(kind, id).is_some()
    }
}

//! Accounts, payees and transactions.

use super::{object, Entity, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub entity_id: String,
    pub account_name: String,
    pub account_type: String,
    pub on_budget: bool,
    pub sortable_index: i64,
    pub hidden: bool,
    pub entity_version: String,
}

impl Entity for Account {
    const KIND: EntityKind = EntityKind::Account;

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_version(&self) -> &str {
        &self.entity_version
    }

    fn set_entity_version(&mut self, version: String) {
        self.entity_version = version;
    }

    fn change_fields(&self) -> Map<String, Value> {
        object(json!({
            "accountName": self.account_name,
            "accountType": self.account_type,
            "onBudget": self.on_budget,
            "sortableIndex": self.sortable_index,
            "hidden": self.hidden,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payee {
    pub entity_id: String,
    pub name: String,
    pub enabled: bool,
    pub entity_version: String,
}

impl Entity for Payee {
    const KIND: EntityKind = EntityKind::Payee;

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_version(&self) -> &str {
        &self.entity_version
    }

    fn set_entity_version(&mut self, version: String) {
        self.entity_version = version;
    }

    fn change_fields(&self) -> Map<String, Value> {
        object(json!({
            "name": self.name,
            "enabled": self.enabled,
        }))
    }
}

/// Auto-rename rule attached to a payee.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayeeStringCondition {
    pub entity_id: String,
    pub parent_payee_id: Option<String>,
    pub operator: Option<String>,
    pub operand: Option<String>,
    pub entity_version: String,
}

impl Entity for PayeeStringCondition {
    const KIND: EntityKind = EntityKind::PayeeStringCondition;

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_version(&self) -> &str {
        &self.entity_version
    }

    fn set_entity_version(&mut self, version: String) {
        self.entity_version = version;
    }

    fn change_fields(&self) -> Map<String, Value> {
        object(json!({
            "parentPayeeId": self.parent_payee_id,
            "operator": self.operator,
            "operand": self.operand,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub entity_id: String,
    pub account_id: String,
    pub payee_id: Option<String>,
    pub category_id: Option<String>,
    pub amount: f64,
    pub date: String,
    pub cleared: String,
    pub accepted: bool,
    pub memo: Option<String>,
    pub entity_version: String,
}

impl Transaction {
    /// Cleared or reconciled.
    pub fn is_cleared(&self) -> bool {
        matches!(self.cleared.as_str(), "Cleared" | "Reconciled")
    }
}

impl Entity for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_version(&self) -> &str {
        &self.entity_version
    }

    fn set_entity_version(&mut self, version: String) {
        self.entity_version = version;
    }

    fn change_fields(&self) -> Map<String, Value> {
        object(json!({
            "accountId": self.account_id,
            "date": self.date,
            "amount": self.amount,
            "cleared": self.cleared,
            "accepted": self.accepted,
            "memo": self.memo,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTransaction {
    pub entity_id: String,
    pub frequency: String,
    pub amount: f64,
    pub payee_id: Option<String>,
    pub account_id: Option<String>,
    pub date: Option<String>,
    pub entity_version: String,
}

impl Entity for ScheduledTransaction {
    const KIND: EntityKind = EntityKind::ScheduledTransaction;

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_version(&self) -> &str {
        &self.entity_version
    }

    fn set_entity_version(&mut self, version: String) {
        self.entity_version = version;
    }

    fn change_fields(&self) -> Map<String, Value> {
        object(json!({
            "frequency": self.frequency,
            "amount": self.amount,
            "payeeId": self.payee_id,
            "accountId": self.account_id,
            "date": self.date,
        }))
    }
}

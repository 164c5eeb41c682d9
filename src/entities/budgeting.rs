//! Category groups, categories and monthly allocations.

use super::{object, Entity, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Category group. Nested `subCategories` are flattened into
/// [`Category`] records at load time and never stored here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterCategory {
    pub entity_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: String,
    pub deleteable: bool,
    pub expanded: bool,
    pub sortable_index: i64,
    pub entity_version: String,
}

impl Entity for MasterCategory {
    const KIND: EntityKind = EntityKind::MasterCategory;

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
            "type": self.category_type,
            "deleteable": self.deleteable,
            "expanded": self.expanded,
            "sortableIndex": self.sortable_index,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub entity_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: String,
    pub master_category_id: String,
    pub sortable_index: i64,
    pub entity_version: String,
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;

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
            "type": self.category_type,
            "masterCategoryId": self.master_category_id,
            "sortableIndex": self.sortable_index,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBudget {
    pub entity_id: String,
    /// First day of the month, e.g. `2025-08-01`.
    pub month: String,
    pub entity_version: String,
}

impl Entity for MonthlyBudget {
    const KIND: EntityKind = EntityKind::MonthlyBudget;

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
        object(json!({ "month": self.month }))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCategoryBudget {
    pub entity_id: String,
    pub category_id: String,
    pub parent_monthly_budget_id: String,
    pub budgeted: f64,
    pub overspending_handling: Option<String>,
    pub note: Option<String>,
    pub entity_version: String,
}

impl Entity for MonthlyCategoryBudget {
    const KIND: EntityKind = EntityKind::MonthlyCategoryBudget;

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
            "categoryId": self.category_id,
            "parentMonthlyBudgetId": self.parent_monthly_budget_id,
            "budgeted": self.budgeted,
            "overspendingHandling": self.overspending_handling,
            "note": self.note,
        }))
    }
}

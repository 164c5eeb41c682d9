//! Full-state snapshot loading (`Budget.yfull`).

use crate::entities::{Entity, EntityCollections};
use crate::error::{BudgetError, Result};
use crate::fs::{self as budget_fs, BudgetFs};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// File name of a replica's snapshot.
pub const SNAPSHOT_FILE: &str = "Budget.yfull";

/// Load a snapshot document into typed collections.
///
/// Top-level arrays that are absent or null load as empty. Categories
/// nested under each master category's `subCategories` are lifted into the
/// category collection.
pub fn load(fs: &dyn BudgetFs, path: &Path) -> Result<EntityCollections> {
    let bytes = budget_fs::read_file(fs, path)?;
    let document: Value = serde_json::from_slice(&bytes).map_err(|e| malformed(path, e))?;
    let Value::Object(mut document) = document else {
        return Err(malformed(path, "snapshot is not a JSON object"));
    };

    let mut collections = EntityCollections::new();
    collections.accounts = typed(path, take_array(path, &mut document, "accounts")?)?;
    collections.payees = typed(path, take_array(path, &mut document, "payees")?)?;
    collections.payee_string_conditions =
        typed(path, take_array(path, &mut document, "payeeStringConditions")?)?;
    collections.transactions = typed(path, take_array(path, &mut document, "transactions")?)?;
    collections.monthly_budgets = typed(path, take_array(path, &mut document, "monthlyBudgets")?)?;
    collections.monthly_category_budgets =
        typed(path, take_array(path, &mut document, "monthlyCategoryBudgets")?)?;
    collections.scheduled_transactions =
        typed(path, take_array(path, &mut document, "scheduledTransactions")?)?;

    let mut masters = Vec::new();
    let mut categories = Vec::new();
    for mut master in take_array(path, &mut document, "masterCategories")? {
        if let Some(fields) = master.as_object_mut() {
            match fields.remove("subCategories") {
                Some(Value::Array(children)) => categories.extend(children),
                Some(Value::Null) | None => {}
                Some(_) => return Err(malformed(path, "subCategories is not an array")),
            }
        }
        masters.push(master);
    }
    collections.master_categories = typed(path, masters)?;
    collections.categories = typed(path, categories)?;

    debug!(
        path = %path.display(),
        entities = collections.len(),
        "Loaded snapshot"
    );
    Ok(collections)
}

fn malformed(path: &Path, message: impl ToString) -> BudgetError {
    BudgetError::format(path.display().to_string(), message.to_string())
}

fn take_array(path: &Path, document: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match document.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(malformed(path, format!("{} is not an array", key))),
    }
}

fn typed<T: Entity>(path: &Path, items: Vec<Value>) -> Result<BTreeMap<String, T>> {
    let mut out = BTreeMap::new();
    for (index, item) in items.into_iter().enumerate() {
        let entity: T = serde_json::from_value(item).map_err(|e| {
            malformed(path, format!("{} #{}: {}", T::KIND, index, e))
        })?;
        out.insert(entity.entity_id().to_string(), entity);
    }
    Ok(out)
}

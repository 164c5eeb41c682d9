//! Read-only balance and budget summaries over a merged budget.

use crate::budget::MergedBudget;
use crate::entities::EntityCollections;
use crate::error::{BudgetError, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Cleared and uncleared totals of one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AccountBalance {
    /// Sum of `Cleared` and `Reconciled` transactions.
    pub cleared: f64,
    pub uncleared: f64,
}

impl AccountBalance {
    pub fn total(&self) -> f64 {
        self.cleared + self.uncleared
    }
}

/// Budgeted amount and spending of one category in one month.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    pub budgeted: f64,
    /// Sum of the absolute amounts of negative transactions.
    pub outflow: f64,
}

/// Summaries computed from a [`MergedBudget`].
pub struct BudgetReport<'a> {
    collections: &'a EntityCollections,
}

impl<'a> BudgetReport<'a> {
    pub fn new(budget: &'a MergedBudget) -> Self {
        Self::from_collections(budget.collections())
    }

    pub fn from_collections(collections: &'a EntityCollections) -> Self {
        Self { collections }
    }

    /// Balance of `account_id`, leaving out transactions dated `today`.
    pub fn account_balance(&self, account_id: &str, today: NaiveDate) -> AccountBalance {
        let today = today.format("%Y-%m-%d").to_string();
        let mut balance = AccountBalance::default();
        for txn in self.collections.transactions.values() {
            if txn.account_id != account_id || txn.date == today {
                continue;
            }
            if txn.is_cleared() {
                balance.cleared += txn.amount;
            } else {
                balance.uncleared += txn.amount;
            }
        }
        balance
    }

    /// [`account_balance`](Self::account_balance) relative to the local date.
    pub fn current_account_balance(&self, account_id: &str) -> AccountBalance {
        self.account_balance(account_id, Local::now().date_naive())
    }

    /// Per-category budgeted amount and outflow for `month` (`YYYY-MM`).
    ///
    /// Only categories with a positive budgeted amount are listed. A month
    /// without a monthly budget yields an empty summary.
    pub fn monthly_summary(&self, month: &str) -> Result<BTreeMap<String, CategorySummary>> {
        NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
            .map_err(|_| BudgetError::format(month, "month must be YYYY-MM"))?;

        let mut summary = BTreeMap::new();
        let Some(monthly) = self
            .collections
            .monthly_budgets
            .values()
            .find(|mb| mb.month.starts_with(month))
        else {
            return Ok(summary);
        };

        let allocations = self
            .collections
            .monthly_category_budgets
            .values()
            .filter(|mcb| mcb.parent_monthly_budget_id == monthly.entity_id && mcb.budgeted > 0.0);

        for allocation in allocations {
            let Some(category) = self.collections.categories.get(&allocation.category_id) else {
                continue;
            };
            summary.insert(
                category.name.clone(),
                CategorySummary {
                    budgeted: allocation.budgeted,
                    outflow: self.outflow(month, &allocation.category_id),
                },
            );
        }
        Ok(summary)
    }

    fn outflow(&self, month: &str, category_id: &str) -> f64 {
        self.collections
            .transactions
            .values()
            .filter(|t| {
                t.date.starts_with(month)
                    && t.amount < 0.0
                    && t.category_id.as_deref() == Some(category_id)
            })
            .map(|t| t.amount.abs())
            .sum()
    }
}

//! Expense domain model.

use chrono::{DateTime, Utc};
use exchange_rates::{CurrencyCode, RateSnapshot};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;

/// Category recorded when none is given.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Unique identifier for an Expense.
///
/// New ids are random UUIDs, but any string is accepted so that backups
/// produced by older clients keep their ids on import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ExpenseId(String);

impl ExpenseId {
    /// Creates a new random ExpenseId.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ExpenseId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExpenseId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded expense.
///
/// `local_value` is frozen at the rates known when the expense was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    #[schema(example = 12.5)]
    pub amount: f64,
    pub currency: CurrencyCode,
    #[schema(example = "Groceries")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Value in local currency at recording time
    #[serde(alias = "irtValue")]
    #[schema(example = 750000.0)]
    pub local_value: f64,
}

impl Expense {
    /// Records an expense, valuing it with whatever rates are available.
    pub fn record(
        money: Money,
        category: Option<String>,
        note: Option<String>,
        created_at: DateTime<Utc>,
        snapshot: Option<&RateSnapshot>,
    ) -> Self {
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Self {
            id: ExpenseId::new(),
            amount: money.amount(),
            currency: money.currency(),
            category,
            note,
            created_at,
            local_value: money.to_local(snapshot),
        }
    }
}

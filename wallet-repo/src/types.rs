//! Row types for the SQLite store and the remote mirror tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use wallet_types::{CurrencyCode, Expense, ExpenseId, Holdings, RepoError};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite rows
// ─────────────────────────────────────────────────────────────────────────────

/// Dataset row from the `datasets` table.
#[derive(FromRow)]
pub struct DbDataset {
    pub body: Json<serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote rows (snake_case columns as exposed by PostgREST)
// ─────────────────────────────────────────────────────────────────────────────

/// Row of the remote `expenses` table.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoteExpense {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub local_value: f64,
}

impl From<&Expense> for RemoteExpense {
    fn from(expense: &Expense) -> Self {
        Self {
            id: expense.id.to_string(),
            amount: expense.amount,
            currency: expense.currency.code().to_string(),
            category: expense.category.clone(),
            note: expense.note.clone(),
            created_at: expense.created_at,
            local_value: expense.local_value,
        }
    }
}

impl RemoteExpense {
    pub fn into_domain(self) -> Result<Expense, RepoError> {
        let currency: CurrencyCode = self.currency.parse().map_err(RepoError::Remote)?;

        Ok(Expense {
            id: ExpenseId::from(self.id),
            amount: self.amount,
            currency,
            category: self.category,
            note: self.note,
            created_at: self.created_at,
            local_value: self.local_value,
        })
    }
}

/// Row of the remote `holdings` table. A single row keyed by `id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoteHoldings {
    pub id: String,
    pub irt: f64,
    pub usd: f64,
    pub eur: f64,
    pub usdt: f64,
}

impl RemoteHoldings {
    pub const ROW_ID: &'static str = "default";

    pub fn from_domain(holdings: &Holdings) -> Self {
        Self {
            id: Self::ROW_ID.to_string(),
            irt: holdings.irt,
            usd: holdings.usd,
            eur: holdings.eur,
            usdt: holdings.usdt,
        }
    }
}

//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::CurrencyCode;

// ─────────────────────────────────────────────────────────────────────────────
// Holdings DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to set the balance of one currency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateHoldingRequest {
    /// New balance; negative values are stored as 0
    #[schema(example = 120.5)]
    pub value: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Expense DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to record an expense.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddExpenseRequest {
    /// Amount in the given currency
    #[schema(example = 12.5)]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: CurrencyCode,
    /// Defaults to "Other"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Groceries")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Defaults to the time the request is handled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_currency() -> CurrencyCode {
    CurrencyCode::LOCAL
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary & backup DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Net worth overview in local currency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    /// Holdings converted to local currency
    #[schema(example = 22000000.0)]
    pub gross_assets: f64,
    /// Sum of recorded expense values
    #[schema(example = 1500000.0)]
    pub total_expenses: f64,
    /// `max(0, gross_assets - total_expenses)`
    #[schema(example = 20500000.0)]
    pub remaining: f64,
    /// Quote time of the rates used, if any were available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rates_as_of: Option<DateTime<Utc>>,
    /// True when the rates used are stale or unavailable
    pub degraded: bool,
}

/// Outcome of a backup import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub holdings_replaced: bool,
    #[schema(example = 12)]
    pub expenses_imported: usize,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Upstream returned 503 Service Unavailable")]
    pub message: String,
}

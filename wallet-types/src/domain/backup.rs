//! Backup document and lenient import sanitizing.
//!
//! Imports are deliberately forgiving: a malformed expense entry is dropped
//! rather than failing the whole file, and missing numeric fields count as 0.
//! A holdings object is all-or-nothing because a partially applied set of
//! balances would silently misstate net worth.

use chrono::{DateTime, Utc};
use exchange_rates::CurrencyCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::expense::{DEFAULT_CATEGORY, Expense, ExpenseId};
use super::holdings::Holdings;

pub const BACKUP_VERSION: u32 = 1;

/// Full export of holdings and expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[schema(example = 1)]
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub holdings: Holdings,
    pub expenses: Vec<Expense>,
}

impl BackupDocument {
    pub fn new(holdings: Holdings, expenses: Vec<Expense>) -> Self {
        Self {
            version: BACKUP_VERSION,
            exported_at: Utc::now(),
            holdings,
            expenses,
        }
    }
}

/// Reads a number the way a form field would: absent or null is 0, numeric
/// strings are parsed, anything else is not a number.
fn lenient_number(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => Some(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(_) => None,
    }
}

fn valid_amount(value: Option<&Value>) -> Option<f64> {
    lenient_number(value).filter(|v| *v >= 0.0)
}

/// Returns the holdings in `value`, or `None` if it is not an object or any
/// balance is negative or not a number.
pub fn sanitize_holdings(value: &Value) -> Option<Holdings> {
    let object = value.as_object()?;
    let mut holdings = Holdings::default();
    for &currency in CurrencyCode::all() {
        let amount = valid_amount(object.get(currency.code()))?;
        holdings.set(currency, amount);
    }
    Some(holdings)
}

/// Keeps every well-formed entry of an expense array.
///
/// Returns `None` when `value` is not an array or no entry survives.
pub fn sanitize_expenses(value: &Value) -> Option<Vec<Expense>> {
    let entries = value.as_array()?;
    let expenses: Vec<Expense> = entries.iter().filter_map(sanitize_expense).collect();
    if expenses.is_empty() {
        None
    } else {
        Some(expenses)
    }
}

fn sanitize_expense(entry: &Value) -> Option<Expense> {
    let id = entry.get("id")?.as_str()?;
    let currency: CurrencyCode = entry.get("currency")?.as_str()?.parse().ok()?;
    let amount = valid_amount(entry.get("amount"))?;
    let local_value = valid_amount(entry.get("localValue").or_else(|| entry.get("irtValue")))?;

    let created_at = entry
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let category = entry
        .get("category")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();
    let note = entry.get("note").and_then(Value::as_str).map(String::from);

    Some(Expense {
        id: ExpenseId::from(id),
        amount,
        currency,
        category,
        note,
        created_at,
        local_value,
    })
}

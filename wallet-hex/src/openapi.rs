//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use utoipa::OpenApi;
use wallet_types::{
    AddExpenseRequest, BackupDocument, CurrencyCode, ErrorResponse, Expense, ExpenseId, Holdings,
    ImportReport, RateSnapshot, SummaryResponse, UpdateHoldingRequest,
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Current exchange rates
///
/// Served from cache while fresh. After a failed refresh the last good
/// snapshot is returned with `stale: true` and the failure in `error`.
#[utoipa::path(
    get,
    path = "/api/rates",
    tag = "rates",
    responses(
        (status = 200, description = "Fresh or stale rates", body = RateSnapshot),
        (status = 401, description = "Upstream rejected the API key", body = ErrorResponse),
        (status = 422, description = "Upstream rejected the request", body = ErrorResponse),
        (status = 429, description = "Upstream rate limit reached", body = ErrorResponse),
        (status = 503, description = "Upstream unavailable", body = ErrorResponse),
        (status = 500, description = "Rates unavailable for any other reason", body = ErrorResponse)
    )
)]
async fn get_rates() {}

/// Get holdings
#[utoipa::path(
    get,
    path = "/api/holdings",
    tag = "holdings",
    responses((status = 200, description = "Balance per currency", body = Holdings))
)]
async fn get_holdings() {}

/// Replace all holdings
#[utoipa::path(
    put,
    path = "/api/holdings",
    tag = "holdings",
    request_body = Holdings,
    responses(
        (status = 200, description = "Updated holdings", body = Holdings),
        (status = 400, description = "Malformed body", body = ErrorResponse)
    )
)]
async fn replace_holdings() {}

/// Set the balance of one currency
#[utoipa::path(
    put,
    path = "/api/holdings/{currency}",
    tag = "holdings",
    params(("currency" = CurrencyCode, Path, description = "Currency code")),
    request_body = UpdateHoldingRequest,
    responses(
        (status = 200, description = "Updated holdings", body = Holdings),
        (status = 400, description = "Unknown currency or malformed body", body = ErrorResponse)
    )
)]
async fn update_holding() {}

/// Reset every balance to zero
#[utoipa::path(
    delete,
    path = "/api/holdings",
    tag = "holdings",
    responses((status = 200, description = "Zeroed holdings", body = Holdings))
)]
async fn reset_holdings() {}

/// List expenses, newest first
#[utoipa::path(
    get,
    path = "/api/expenses",
    tag = "expenses",
    responses((status = 200, description = "Recorded expenses", body = Vec<Expense>))
)]
async fn list_expenses() {}

/// Record an expense
#[utoipa::path(
    post,
    path = "/api/expenses",
    tag = "expenses",
    request_body = AddExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = Expense),
        (status = 400, description = "Invalid amount or malformed body", body = ErrorResponse),
        (status = 500, description = "Rates needed to value the expense are unavailable", body = ErrorResponse)
    )
)]
async fn add_expense() {}

/// Delete every expense
#[utoipa::path(
    delete,
    path = "/api/expenses",
    tag = "expenses",
    responses((status = 204, description = "Expenses cleared"))
)]
async fn clear_expenses() {}

/// Delete one expense
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    tag = "expenses",
    params(("id" = String, Path, description = "Expense ID")),
    responses(
        (status = 204, description = "Expense removed"),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
async fn remove_expense() {}

/// Undo the last removal
#[utoipa::path(
    post,
    path = "/api/expenses/restore",
    tag = "expenses",
    responses(
        (status = 200, description = "Restored expense, now first in the list", body = Expense),
        (status = 404, description = "Nothing to restore", body = ErrorResponse)
    )
)]
async fn restore_expense() {}

/// Net worth summary in local currency
#[utoipa::path(
    get,
    path = "/api/summary",
    tag = "summary",
    responses((status = 200, description = "Summary", body = SummaryResponse))
)]
async fn summary() {}

/// Export holdings and expenses
#[utoipa::path(
    get,
    path = "/api/backup",
    tag = "backup",
    responses((status = 200, description = "Backup document", body = BackupDocument))
)]
async fn export_backup() {}

/// Import a backup
///
/// Invalid expense entries are skipped. Holdings are applied only if every
/// balance is valid.
#[utoipa::path(
    post,
    path = "/api/backup",
    tag = "backup",
    request_body = BackupDocument,
    responses(
        (status = 200, description = "What was applied", body = ImportReport),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse)
    )
)]
async fn import_backup() {}

/// OpenAPI documentation for the Wallet API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Multi-Currency Wallet API",
        version = "1.0.0",
        description = "Holdings and expenses in IRT, USD, EUR and USDT, valued in the local currency with cached upstream exchange rates.",
        license(name = "MIT"),
    ),
    paths(
        health,
        get_rates,
        get_holdings,
        replace_holdings,
        update_holding,
        reset_holdings,
        list_expenses,
        add_expense,
        clear_expenses,
        remove_expense,
        restore_expense,
        summary,
        export_backup,
        import_backup,
    ),
    components(
        schemas(
            RateSnapshot,
            CurrencyCode,
            Holdings,
            UpdateHoldingRequest,
            Expense,
            ExpenseId,
            AddExpenseRequest,
            SummaryResponse,
            BackupDocument,
            ImportReport,
            ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rates", description = "Exchange rates"),
        (name = "holdings", description = "Balances per currency"),
        (name = "expenses", description = "Expense log"),
        (name = "summary", description = "Net worth overview"),
        (name = "backup", description = "Export and import"),
    )
)]
pub struct ApiDoc;

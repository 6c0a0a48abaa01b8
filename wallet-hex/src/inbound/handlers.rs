//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use wallet_types::{
    AddExpenseRequest, AppError, CurrencyCode, ErrorResponse, ExpenseId, Holdings, LedgerStore,
    RateProvider, UpdateHoldingRequest,
};

use crate::{LedgerService, RateService};

/// Application state shared across handlers.
pub struct AppState<P: RateProvider, S: LedgerStore> {
    pub rates: RateService<P>,
    pub ledger: LedgerService<S>,
}

type SharedState<P, S> = State<Arc<AppState<P, S>>>;

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppError::BadRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::RatesUnavailable { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Rates
// ─────────────────────────────────────────────────────────────────────────────

/// Current exchange rates; stale rates are still a 200.
#[tracing::instrument(skip(state))]
pub async fn get_rates<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.rates.get_rates().await.map_err(AppError::from)?;
    Ok(Json(snapshot))
}

// ─────────────────────────────────────────────────────────────────────────────
// Holdings
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state))]
pub async fn get_holdings<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> impl IntoResponse {
    Json(state.ledger.holdings().await)
}

#[tracing::instrument(skip(state, payload))]
pub async fn replace_holdings<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
    payload: Result<Json<Holdings>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(holdings) = payload?;
    Ok(Json(state.ledger.replace_holdings(holdings).await))
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_holding<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
    Path(currency): Path<String>,
    payload: Result<Json<UpdateHoldingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let currency: CurrencyCode = currency.parse().map_err(AppError::BadRequest)?;
    let Json(req) = payload?;

    Ok(Json(state.ledger.update_holding(currency, req.value).await))
}

#[tracing::instrument(skip(state))]
pub async fn reset_holdings<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> impl IntoResponse {
    Json(state.ledger.reset_holdings().await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Expenses
// ─────────────────────────────────────────────────────────────────────────────

/// List expenses, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_expenses<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> impl IntoResponse {
    Json(state.ledger.expenses().await)
}

/// Record an expense valued at the current rates.
#[tracing::instrument(skip(state, payload))]
pub async fn add_expense<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
    payload: Result<Json<AddExpenseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    // Local amounts are valued without rates.
    let snapshot = if req.currency.is_local() {
        None
    } else {
        Some(state.rates.get_rates().await.map_err(AppError::from)?)
    };

    let expense = state.ledger.add_expense(req, snapshot.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[tracing::instrument(skip(state))]
pub async fn clear_expenses<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> impl IntoResponse {
    state.ledger.clear_expenses().await;
    StatusCode::NO_CONTENT
}

#[tracing::instrument(skip(state), fields(expense_id = %id))]
pub async fn remove_expense<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.remove_expense(&ExpenseId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Undo the last removal.
#[tracing::instrument(skip(state))]
pub async fn restore_expense<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = state.ledger.restore_expense().await?;
    Ok(Json(expense))
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary & backup
// ─────────────────────────────────────────────────────────────────────────────

/// Net worth overview. Served even when rates are unavailable.
#[tracing::instrument(skip(state))]
pub async fn summary<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> impl IntoResponse {
    let snapshot = match state.rates.get_rates().await {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::debug!(error = %e, "Summary computed without rates");
            None
        }
    };

    Json(state.ledger.summary(snapshot.as_ref()).await)
}

#[tracing::instrument(skip(state))]
pub async fn export_backup<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
) -> impl IntoResponse {
    Json(state.ledger.export().await)
}

#[tracing::instrument(skip(state, payload))]
pub async fn import_backup<P: RateProvider, S: LedgerStore>(
    State(state): SharedState<P, S>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(document) = payload?;
    let report = state.ledger.import(&document).await?;
    Ok(Json(report))
}

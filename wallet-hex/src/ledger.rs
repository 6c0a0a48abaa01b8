//! Ledger Application Service
//!
//! Holds holdings and expenses in memory and writes every change through the
//! `LedgerStore` port. Memory is authoritative: a failed write is logged and
//! the change stands.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use wallet_types::domain::{sanitize_expenses, sanitize_holdings};
use wallet_types::{
    AddExpenseRequest, AppError, BackupDocument, CurrencyCode, Expense, ExpenseChange, ExpenseId,
    Holdings, ImportReport, LedgerStore, Money, RateSnapshot, SummaryResponse,
};

#[derive(Default)]
struct LedgerState {
    holdings: Holdings,
    /// Newest first.
    expenses: Vec<Expense>,
    /// Most recently removed expense, for a single-step undo.
    last_removed: Option<Expense>,
}

/// Application service for holdings and expenses.
pub struct LedgerService<S: LedgerStore> {
    store: S,
    state: Mutex<LedgerState>,
}

impl<S: LedgerStore> LedgerService<S> {
    /// Creates the service, starting from whatever the store holds.
    ///
    /// Unreadable datasets start empty.
    pub async fn load(store: S) -> Self {
        let holdings = match store.load_holdings().await {
            Ok(holdings) => holdings.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load holdings; starting empty");
                Holdings::default()
            }
        };
        let expenses = match store.load_expenses().await {
            Ok(expenses) => expenses.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load expenses; starting empty");
                Vec::new()
            }
        };
        info!(expenses = expenses.len(), "Ledger loaded");

        Self {
            store,
            state: Mutex::new(LedgerState {
                holdings,
                expenses,
                last_removed: None,
            }),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Waits for queued persistence writes. Called once at shutdown.
    pub async fn flush(&self) {
        // Holding the lock keeps new changes out of the queue while it drains.
        let _state = self.state.lock().await;
        match self.store.flush().await {
            Ok(()) => info!("Pending ledger writes flushed"),
            Err(e) => warn!(error = %e, "Failed to flush pending ledger writes"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Holdings
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn holdings(&self) -> Holdings {
        self.state.lock().await.holdings
    }

    /// Sets one balance. NaN and negative values are stored as 0.
    #[tracing::instrument(skip(self))]
    pub async fn update_holding(&self, currency: CurrencyCode, value: f64) -> Holdings {
        let mut state = self.state.lock().await;
        state.holdings.set(currency, value);
        self.persist_holdings(&state.holdings).await;
        state.holdings
    }

    #[tracing::instrument(skip(self))]
    pub async fn replace_holdings(&self, holdings: Holdings) -> Holdings {
        let mut clamped = Holdings::default();
        for &currency in CurrencyCode::all() {
            clamped.set(currency, holdings.get(currency));
        }

        let mut state = self.state.lock().await;
        state.holdings = clamped;
        self.persist_holdings(&state.holdings).await;
        state.holdings
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_holdings(&self) -> Holdings {
        self.replace_holdings(Holdings::default()).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Expenses
    // ─────────────────────────────────────────────────────────────────────────────

    /// All expenses, newest first.
    pub async fn expenses(&self) -> Vec<Expense> {
        self.state.lock().await.expenses.clone()
    }

    /// Records an expense valued with `snapshot`.
    ///
    /// Foreign-currency expenses need rates; without them the value would be
    /// recorded as 0 forever.
    #[tracing::instrument(skip(self, snapshot), fields(amount = req.amount, currency = %req.currency))]
    pub async fn add_expense(
        &self,
        req: AddExpenseRequest,
        snapshot: Option<&RateSnapshot>,
    ) -> Result<Expense, AppError> {
        let money = Money::new(req.amount, req.currency)?;
        if money.amount() <= 0.0 {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
        if snapshot.is_none() && !req.currency.is_local() {
            return Err(AppError::BadRequest(format!(
                "Exchange rates are unavailable; cannot value a {} expense",
                req.currency
            )));
        }

        let created_at = req.created_at.unwrap_or_else(Utc::now);
        let expense = Expense::record(money, req.category, req.note, created_at, snapshot);

        let mut state = self.state.lock().await;
        state.expenses.insert(0, expense.clone());
        state.last_removed = None;
        self.persist_expenses(&state.expenses, ExpenseChange::Added(expense.clone()))
            .await;

        info!(expense_id = %expense.id, local_value = expense.local_value, "Expense recorded");
        Ok(expense)
    }

    /// Removes an expense and remembers it for `restore_expense`.
    #[tracing::instrument(skip(self))]
    pub async fn remove_expense(&self, id: &ExpenseId) -> Result<Expense, AppError> {
        let mut state = self.state.lock().await;
        let index = state
            .expenses
            .iter()
            .position(|expense| &expense.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", id)))?;

        let removed = state.expenses.remove(index);
        state.last_removed = Some(removed.clone());
        self.persist_expenses(&state.expenses, ExpenseChange::Removed(removed.id.clone()))
            .await;
        Ok(removed)
    }

    /// Puts the last removed expense back at the front of the list.
    #[tracing::instrument(skip(self))]
    pub async fn restore_expense(&self) -> Result<Expense, AppError> {
        let mut state = self.state.lock().await;
        let restored = state
            .last_removed
            .take()
            .ok_or_else(|| AppError::NotFound("No removed expense to restore".into()))?;

        state.expenses.insert(0, restored.clone());
        self.persist_expenses(&state.expenses, ExpenseChange::Added(restored.clone()))
            .await;
        Ok(restored)
    }

    #[tracing::instrument(skip(self, expenses), fields(count = expenses.len()))]
    pub async fn replace_expenses(&self, expenses: Vec<Expense>) {
        let mut state = self.state.lock().await;
        state.expenses = expenses;
        state.last_removed = None;
        self.persist_expenses(&state.expenses, ExpenseChange::Replaced)
            .await;
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_expenses(&self) {
        let mut state = self.state.lock().await;
        state.expenses.clear();
        state.last_removed = None;
        self.persist_expenses(&state.expenses, ExpenseChange::Cleared)
            .await;
    }

    /// Sum of the recorded local values.
    pub async fn total_expenses(&self) -> f64 {
        total(&self.state.lock().await.expenses)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Summary & backup
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn summary(&self, snapshot: Option<&RateSnapshot>) -> SummaryResponse {
        let state = self.state.lock().await;
        let gross_assets = state.holdings.gross_local(snapshot);
        let total_expenses = total(&state.expenses);

        SummaryResponse {
            gross_assets,
            total_expenses,
            remaining: (gross_assets - total_expenses).max(0.0),
            rates_as_of: snapshot.map(|s| s.as_of),
            degraded: snapshot.is_none_or(|s| s.stale),
        }
    }

    pub async fn export(&self) -> BackupDocument {
        let state = self.state.lock().await;
        BackupDocument::new(state.holdings, state.expenses.clone())
    }

    /// Applies whatever parts of a backup are valid.
    ///
    /// Holdings are replaced only if every balance is valid. Invalid expense
    /// entries are dropped; the expense list is replaced only if at least one
    /// entry survives.
    #[tracing::instrument(skip(self, document))]
    pub async fn import(&self, document: &Value) -> Result<ImportReport, AppError> {
        if !document.is_object() {
            return Err(AppError::BadRequest("Backup must be a JSON object".into()));
        }

        let holdings = document.get("holdings").and_then(sanitize_holdings);
        let expenses = document.get("expenses").and_then(sanitize_expenses);

        let report = ImportReport {
            holdings_replaced: holdings.is_some(),
            expenses_imported: expenses.as_ref().map_or(0, Vec::len),
        };

        if let Some(holdings) = holdings {
            self.replace_holdings(holdings).await;
        }
        if let Some(expenses) = expenses {
            self.replace_expenses(expenses).await;
        }

        info!(
            holdings_replaced = report.holdings_replaced,
            expenses_imported = report.expenses_imported,
            "Backup imported"
        );
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Write-through
    // ─────────────────────────────────────────────────────────────────────────────

    async fn persist_holdings(&self, holdings: &Holdings) {
        if let Err(e) = self.store.save_holdings(holdings).await {
            warn!(error = %e, "Failed to persist holdings");
        }
    }

    async fn persist_expenses(&self, expenses: &[Expense], change: ExpenseChange) {
        if let Err(e) = self.store.save_expenses(expenses, change).await {
            warn!(error = %e, "Failed to persist expenses");
        }
    }
}

fn total(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|expense| expense.local_value).sum()
}

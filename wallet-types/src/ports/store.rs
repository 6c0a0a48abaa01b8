//! Persistence ports.
//!
//! `DatasetStore` is the local key-value store, `RemoteMirror` the optional
//! remote tabular copy, and `LedgerStore` the capability the ledger service
//! writes through (implemented by the combination of the two).

use crate::domain::{Expense, ExpenseId, Holdings};
use crate::error::RepoError;

/// Logical datasets kept in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Expenses,
    Holdings,
}

impl Dataset {
    /// Storage key of the dataset.
    pub fn key(&self) -> &'static str {
        match self {
            Dataset::Expenses => "expenses",
            Dataset::Holdings => "holdings",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Key-value store of JSON documents keyed by dataset name.
#[async_trait::async_trait]
pub trait DatasetStore: Send + Sync + 'static {
    /// Loads a dataset, `None` if it was never written.
    async fn load(&self, dataset: Dataset) -> Result<Option<serde_json::Value>, RepoError>;

    /// Overwrites a dataset.
    async fn save(&self, dataset: Dataset, body: &serde_json::Value) -> Result<(), RepoError>;
}

/// Remote tabular store mirroring the local datasets.
#[async_trait::async_trait]
pub trait RemoteMirror: Send + Sync + 'static {
    async fn upsert_expense(&self, expense: &Expense) -> Result<(), RepoError>;

    async fn delete_expense(&self, id: &ExpenseId) -> Result<(), RepoError>;

    async fn clear_expenses(&self) -> Result<(), RepoError>;

    /// Lists expenses, newest first.
    async fn list_expenses(&self) -> Result<Vec<Expense>, RepoError>;

    async fn upsert_holdings(&self, holdings: &Holdings) -> Result<(), RepoError>;
}

/// What changed in the expense list, so mirrors can apply a minimal update.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseChange {
    Added(Expense),
    Removed(ExpenseId),
    Replaced,
    Cleared,
}

/// Write-through persistence used by the ledger service.
///
/// Implementations persist the full local state on every save; the in-memory
/// state is authoritative and already updated when these are called.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    async fn load_holdings(&self) -> Result<Option<Holdings>, RepoError>;

    async fn load_expenses(&self) -> Result<Option<Vec<Expense>>, RepoError>;

    async fn save_holdings(&self, holdings: &Holdings) -> Result<(), RepoError>;

    async fn save_expenses(
        &self,
        expenses: &[Expense],
        change: ExpenseChange,
    ) -> Result<(), RepoError>;

    /// Waits for writes that are still in flight elsewhere (e.g. a remote
    /// mirror queue). Local-only stores have nothing to wait for.
    async fn flush(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

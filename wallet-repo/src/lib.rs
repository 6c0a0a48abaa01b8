//! # Wallet Repository
//!
//! Persistence adapters for the wallet service: a SQLite key-value store for
//! the local datasets, and an optional PostgREST mirror fed by a background
//! worker. `Persistence` combines them into the `LedgerStore` capability.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use wallet_types::domain::{sanitize_expenses, sanitize_holdings};
use wallet_types::{
    Dataset, DatasetStore, Expense, ExpenseChange, Holdings, LedgerStore, RemoteMirror, RepoError,
};

pub mod mirror;
pub mod postgrest;
pub mod sqlite;

mod types;


pub use mirror::{MirrorHandle, MirrorOp, MirrorWorker};
pub use postgrest::{PostgrestMirror, RemoteConfig};
pub use sqlite::SqliteStore;

/// Where ledger state is written. Chosen once at startup.
pub enum Persistence {
    /// Local SQLite datasets only.
    LocalOnly(SqliteStore),
    /// Local SQLite datasets, with every change also sent to a remote mirror.
    Mirrored {
        local: SqliteStore,
        mirror: MirrorHandle,
    },
}

/// Build the persistence capability from configuration.
///
/// Opens (and migrates) the local store. When `remote` is set, spawns the
/// mirror worker and, if the local expense dataset is empty, hydrates it from
/// the remote copy.
///
/// # Examples
///
/// ```ignore
/// let local_only = build_persistence("sqlite://data/wallet.db?mode=rwc", None).await?;
///
/// let mirrored = build_persistence(
///     "sqlite://data/wallet.db?mode=rwc",
///     Some(RemoteConfig { url: "https://abc.supabase.co".into(), api_key: key }),
/// )
/// .await?;
/// ```
pub async fn build_persistence(
    database_url: &str,
    remote: Option<RemoteConfig>,
) -> anyhow::Result<Persistence> {
    let local = SqliteStore::new(database_url).await?;

    let Some(config) = remote else {
        info!("Remote mirror not configured; using local persistence only");
        return Ok(Persistence::LocalOnly(local));
    };

    info!(url = %config.url, "Remote mirror enabled");
    let mirror: Arc<dyn RemoteMirror> = Arc::new(PostgrestMirror::new(config));
    Ok(Persistence::mirrored(local, mirror).await)
}

impl Persistence {
    /// Wraps `local` with a mirror, hydrating expenses from it when the
    /// local dataset is empty. Hydration failures leave the local store as is.
    pub async fn mirrored(local: SqliteStore, mirror: Arc<dyn RemoteMirror>) -> Self {
        if let Err(e) = hydrate_expenses(&local, mirror.as_ref()).await {
            warn!(error = %e, "Failed to hydrate expenses from remote mirror");
        }

        let (handle, _worker) = MirrorWorker::spawn(mirror);
        Persistence::Mirrored {
            local,
            mirror: handle,
        }
    }

    fn local(&self) -> &SqliteStore {
        match self {
            Persistence::LocalOnly(local) => local,
            Persistence::Mirrored { local, .. } => local,
        }
    }

    fn submit(&self, op: MirrorOp) {
        if let Persistence::Mirrored { mirror, .. } = self {
            mirror.submit(op);
        }
    }
}

async fn hydrate_expenses(
    local: &SqliteStore,
    mirror: &dyn RemoteMirror,
) -> Result<(), RepoError> {
    let existing = local.load(Dataset::Expenses).await?;
    if existing.as_ref().and_then(sanitize_expenses).is_some() {
        return Ok(());
    }

    let remote = mirror.list_expenses().await?;
    if remote.is_empty() {
        return Ok(());
    }

    info!(count = remote.len(), "Hydrating expenses from remote mirror");
    local
        .save(Dataset::Expenses, &serde_json::to_value(&remote)?)
        .await
}

// ─────────────────────────────────────────────────────────────────────────────
// Implement LedgerStore for Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for Persistence {
    async fn load_holdings(&self) -> Result<Option<Holdings>, RepoError> {
        let body = self.local().load(Dataset::Holdings).await?;
        Ok(body.as_ref().and_then(sanitize_holdings))
    }

    async fn load_expenses(&self) -> Result<Option<Vec<Expense>>, RepoError> {
        let body = self.local().load(Dataset::Expenses).await?;
        Ok(body.as_ref().and_then(sanitize_expenses))
    }

    async fn save_holdings(&self, holdings: &Holdings) -> Result<(), RepoError> {
        self.submit(MirrorOp::UpsertHoldings(*holdings));
        self.local()
            .save(Dataset::Holdings, &serde_json::to_value(holdings)?)
            .await
    }

    async fn save_expenses(
        &self,
        expenses: &[Expense],
        change: ExpenseChange,
    ) -> Result<(), RepoError> {
        let op = match change {
            ExpenseChange::Added(expense) => MirrorOp::UpsertExpense(expense),
            ExpenseChange::Removed(id) => MirrorOp::DeleteExpense(id),
            ExpenseChange::Replaced => MirrorOp::ReplaceExpenses(expenses.to_vec()),
            ExpenseChange::Cleared => MirrorOp::ClearExpenses,
        };
        self.submit(op);

        self.local()
            .save(Dataset::Expenses, &serde_json::to_value(expenses)?)
            .await
    }

    async fn flush(&self) -> Result<(), RepoError> {
        match self {
            Persistence::LocalOnly(_) => Ok(()),
            Persistence::Mirrored { mirror, .. } => mirror.flush().await,
        }
    }
}

//! Background worker that applies local changes to the remote mirror.
//!
//! Callers enqueue operations and move on; the worker applies them in order
//! and logs failures. A failed remote write is never retried and never
//! affects local state.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use wallet_types::{Expense, ExpenseId, Holdings, RemoteMirror, RepoError};

/// A pending remote write.
#[derive(Debug, Clone)]
pub enum MirrorOp {
    UpsertExpense(Expense),
    DeleteExpense(ExpenseId),
    ReplaceExpenses(Vec<Expense>),
    ClearExpenses,
    UpsertHoldings(Holdings),
}

impl MirrorOp {
    fn kind(&self) -> &'static str {
        match self {
            MirrorOp::UpsertExpense(_) => "upsert_expense",
            MirrorOp::DeleteExpense(_) => "delete_expense",
            MirrorOp::ReplaceExpenses(_) => "replace_expenses",
            MirrorOp::ClearExpenses => "clear_expenses",
            MirrorOp::UpsertHoldings(_) => "upsert_holdings",
        }
    }
}

enum Command {
    Apply(MirrorOp),
    /// Answered once every earlier command has been handled.
    Flush(oneshot::Sender<()>),
}

/// Sending side of the worker queue.
#[derive(Clone)]
pub struct MirrorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl MirrorHandle {
    /// Enqueues an operation without waiting for it to be applied.
    pub fn submit(&self, op: MirrorOp) {
        if let Err(mpsc::error::SendError(Command::Apply(op))) =
            self.tx.send(Command::Apply(op))
        {
            warn!(op = op.kind(), "Mirror worker has stopped; dropping remote write");
        }
    }

    /// Waits until every operation submitted so far has been applied or has
    /// failed.
    pub async fn flush(&self) -> Result<(), RepoError> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(Command::Flush(done))
            .map_err(|_| RepoError::Remote("Mirror worker has stopped".into()))?;
        wait.await
            .map_err(|_| RepoError::Remote("Mirror worker stopped before flushing".into()))
    }
}

pub struct MirrorWorker {
    mirror: Arc<dyn RemoteMirror>,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl MirrorWorker {
    pub fn new(mirror: Arc<dyn RemoteMirror>) -> (Self, MirrorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { mirror, rx }, MirrorHandle { tx })
    }

    /// Starts the worker on the current runtime.
    pub fn spawn(mirror: Arc<dyn RemoteMirror>) -> (MirrorHandle, JoinHandle<()>) {
        let (worker, handle) = Self::new(mirror);
        (handle, tokio::spawn(worker.run()))
    }

    /// Applies operations until every handle has been dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Starting remote mirror worker");
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Apply(op) => self.apply(op).await,
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        info!("Remote mirror worker stopped");
    }

    async fn apply(&self, op: MirrorOp) {
        let kind = op.kind();
        let result: Result<(), RepoError> = match op {
            MirrorOp::UpsertExpense(expense) => self.mirror.upsert_expense(&expense).await,
            MirrorOp::DeleteExpense(id) => self.mirror.delete_expense(&id).await,
            MirrorOp::ReplaceExpenses(expenses) => self.replace_expenses(&expenses).await,
            MirrorOp::ClearExpenses => self.mirror.clear_expenses().await,
            MirrorOp::UpsertHoldings(holdings) => self.mirror.upsert_holdings(&holdings).await,
        };

        if let Err(e) = result {
            error!(op = kind, error = %e, "Remote mirror write failed");
        }
    }

    async fn replace_expenses(&self, expenses: &[Expense]) -> Result<(), RepoError> {
        self.mirror.clear_expenses().await?;
        for expense in expenses {
            self.mirror.upsert_expense(expense).await?;
        }
        Ok(())
    }
}

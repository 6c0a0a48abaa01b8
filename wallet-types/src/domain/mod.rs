//! Domain models for the wallet service.

pub mod backup;
pub mod expense;
pub mod holdings;
pub mod money;

pub use backup::{BACKUP_VERSION, BackupDocument, sanitize_expenses, sanitize_holdings};
pub use expense::{DEFAULT_CATEGORY, Expense, ExpenseId};
pub use holdings::Holdings;
pub use money::{Money, clamp_non_negative};

//! # Wallet Types
//!
//! Domain types and port traits for the multi-currency wallet service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Holdings, Expense, BackupDocument)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Rate, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{BackupDocument, Expense, ExpenseId, Holdings, Money};
pub use dto::*;
pub use error::{AppError, DomainError, RateError, RepoError};
pub use exchange_rates::{CurrencyCode, RateSnapshot, to_local};
pub use ports::{
    Dataset, DatasetStore, ExpenseChange, LedgerStore, RateProvider, RemoteMirror,
};

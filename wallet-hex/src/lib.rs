//! # Wallet Hex
//!
//! Application services and adapters for the wallet service.
//!
//! ## Architecture
//!
//! - `service` - Rate service (cache-first, single-flight refresh, stale fallback)
//! - `ledger` - Ledger service (holdings, expenses, summary, backup)
//! - `cache` - Single-slot rate cache injected into the rate service
//! - `outbound/` - Upstream rate provider adapter (Navasan)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Both services are generic over their ports (`RateProvider`, `LedgerStore`),
//! so adapters and test doubles are injected at compile time.

pub mod cache;
pub mod inbound;
pub mod ledger;
pub mod openapi;
pub mod outbound;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use cache::RateCache;
pub use ledger::LedgerService;
pub use service::RateService;

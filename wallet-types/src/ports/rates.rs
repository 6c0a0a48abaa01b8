//! Exchange rate provider port.
//!
//! This trait defines the interface for the upstream rate source.
//! Implementations can be HTTP clients, mock providers, etc.

use crate::{RateError, RateSnapshot};

/// Port trait for exchange rate providers.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Fetches a fresh snapshot from the upstream source.
    ///
    /// Implementations must not cache; freshness is the caller's concern.
    async fn fetch_rates(&self) -> Result<RateSnapshot, RateError>;
}

//! Rate Application Service
//!
//! Serves exchange rates from the cache while fresh, refreshes from the
//! provider port when not, and degrades to the last good snapshot when a
//! refresh fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use wallet_types::{RateError, RateProvider, RateSnapshot};

use crate::cache::RateCache;

/// Application service for exchange rates.
///
/// Generic over `P: RateProvider` so tests can inject a scripted provider.
/// Refreshes are single-flight: callers that find the cache expired queue on
/// one gate, and a caller that gets the gate after another refresh finished
/// reuses that refresh's outcome.
pub struct RateService<P: RateProvider> {
    provider: P,
    cache: RateCache,
    ttl: Duration,
    /// Failure of the most recent refresh, `None` after a success.
    refresh_gate: Mutex<Option<RateError>>,
    /// Number of completed refreshes.
    refreshes: AtomicU64,
}

impl<P: RateProvider> RateService<P> {
    pub fn new(provider: P, cache: RateCache, ttl: Duration) -> Self {
        Self {
            provider,
            cache,
            ttl,
            refresh_gate: Mutex::new(None),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Returns a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Current rates: cached while fresh, otherwise refreshed.
    ///
    /// Errors only when the refresh fails and nothing was ever cached.
    #[tracing::instrument(skip(self))]
    pub async fn get_rates(&self) -> Result<RateSnapshot, RateError> {
        // Read before the cache so a refresh finishing in between is noticed.
        let seen = self.refreshes.load(Ordering::Acquire);
        if let Some(entry) = self.cache.fresh(Instant::now(), self.ttl) {
            return Ok(entry.snapshot);
        }

        let mut last_failure = self.refresh_gate.lock().await;

        if self.refreshes.load(Ordering::Acquire) != seen {
            if let Some(entry) = self.cache.fresh(Instant::now(), self.ttl) {
                return Ok(entry.snapshot);
            }
            if let Some(err) = last_failure.as_ref() {
                debug!("Reusing outcome of concurrent refresh");
                return self.degrade(err.clone());
            }
        }

        // The counter moves only once the outcome is visible to waiters.
        match self.provider.fetch_rates().await {
            Ok(snapshot) => {
                self.cache.put(snapshot.clone(), Instant::now());
                *last_failure = None;
                self.refreshes.fetch_add(1, Ordering::Release);
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "Rate refresh failed");
                *last_failure = Some(err.clone());
                self.refreshes.fetch_add(1, Ordering::Release);
                self.degrade(err)
            }
        }
    }

    /// Last good snapshot marked stale, or the error when there is none.
    fn degrade(&self, err: RateError) -> Result<RateSnapshot, RateError> {
        match self.cache.get() {
            Some(entry) => Ok(entry.snapshot.to_stale(err.to_string())),
            None => Err(err),
        }
    }
}

//! Single-slot rate cache.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;

use wallet_types::RateSnapshot;

/// The last successfully fetched snapshot and when it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: RateSnapshot,
    pub fetched_at: Instant,
}

/// Holds at most one snapshot. Written only after a successful fetch.
#[derive(Debug, Default)]
pub struct RateCache {
    slot: RwLock<Option<CacheEntry>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<CacheEntry> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn put(&self, snapshot: RateSnapshot, now: Instant) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(CacheEntry {
            snapshot,
            fetched_at: now,
        });
    }

    /// True iff an entry exists and is younger than `ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.fresh(now, ttl).is_some()
    }

    /// The cached entry if it is still fresh.
    pub fn fresh(&self, now: Instant, ttl: Duration) -> Option<CacheEntry> {
        self.get()
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < ttl)
    }
}

//! RateService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use wallet_types::{RateError, RateProvider, RateSnapshot};

    use crate::RateService;
    use crate::cache::RateCache;

    const TTL: Duration = Duration::from_secs(60);

    /// Provider that replays scripted outcomes, optionally after a delay.
    pub struct ScriptedProvider {
        outcomes: Mutex<VecDeque<Result<RateSnapshot, RateError>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedProvider {
        pub fn new(outcomes: Vec<Result<RateSnapshot, RateError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for ScriptedProvider {
        async fn fetch_rates(&self) -> Result<RateSnapshot, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(upstream(Some(503))))
        }
    }

    pub fn snapshot(usd: u64) -> RateSnapshot {
        RateSnapshot::new(
            usd,
            62_000,
            60_050,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    pub fn upstream(status: Option<u16>) -> RateError {
        RateError::Upstream {
            status,
            message: "Rate provider returned an error".into(),
        }
    }

    fn service(outcomes: Vec<Result<RateSnapshot, RateError>>) -> RateService<ScriptedProvider> {
        RateService::new(ScriptedProvider::new(outcomes), RateCache::new(), TTL)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_skips_upstream() {
        let svc = service(vec![Ok(snapshot(60_000))]);

        let first = svc.get_rates().await.unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        let second = svc.get_rates().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(svc.provider().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_refetches() {
        let svc = service(vec![Ok(snapshot(60_000)), Ok(snapshot(61_000))]);

        svc.get_rates().await.unwrap();
        tokio::time::advance(TTL).await;
        let refreshed = svc.get_rates().await.unwrap();

        assert_eq!(refreshed.local_per_usd, 61_000);
        assert_eq!(svc.provider().calls(), 2);
    }

    #[tokio::test]
    async fn test_cold_failure_maps_status() {
        let svc = service(vec![Err(upstream(Some(429)))]);
        let err = svc.get_rates().await.unwrap_err();
        assert_eq!(err.status_code(), 429);

        let svc = service(vec![Err(upstream(Some(418)))]);
        let err = svc.get_rates().await.unwrap_err();
        assert_eq!(err.status_code(), 500);

        let svc = service(vec![Err(RateError::Config("NAVASAN_API_KEY is not set".into()))]);
        let err = svc.get_rates().await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_failure_serves_stale_copy() {
        let svc = service(vec![Ok(snapshot(60_000)), Err(upstream(Some(503)))]);

        svc.get_rates().await.unwrap();
        let fetched_at = svc.cache().get().unwrap().fetched_at;
        tokio::time::advance(Duration::from_secs(61)).await;

        let stale = svc.get_rates().await.unwrap();

        assert!(stale.stale);
        assert_eq!(
            stale.error_message.as_deref(),
            Some("Rate provider returned an error")
        );
        assert_eq!(stale.local_per_usd, 60_000);
        assert_eq!(svc.cache().get().unwrap().fetched_at, fetched_at);
        assert!(!svc.cache().get().unwrap().snapshot.stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_retries_every_request() {
        let svc = service(vec![
            Ok(snapshot(60_000)),
            Err(upstream(None)),
            Err(upstream(None)),
            Ok(snapshot(63_000)),
        ]);

        svc.get_rates().await.unwrap();
        tokio::time::advance(TTL).await;

        assert!(svc.get_rates().await.unwrap().stale);
        assert!(svc.get_rates().await.unwrap().stale);
        let recovered = svc.get_rates().await.unwrap();

        assert!(!recovered.stale);
        assert_eq!(recovered.local_per_usd, 63_000);
        assert_eq!(svc.provider().calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_refresh() {
        let provider =
            ScriptedProvider::new(vec![Ok(snapshot(60_000))]).with_delay(Duration::from_secs(1));
        let svc = RateService::new(provider, RateCache::new(), TTL);

        let (a, b, c) = tokio::join!(svc.get_rates(), svc.get_rates(), svc.get_rates());

        assert_eq!(a.unwrap().local_per_usd, 60_000);
        assert_eq!(b.unwrap().local_per_usd, 60_000);
        assert_eq!(c.unwrap().local_per_usd, 60_000);
        assert_eq!(svc.provider().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_failure() {
        let provider = ScriptedProvider::new(vec![Err(upstream(Some(401)))])
            .with_delay(Duration::from_secs(1));
        let svc = RateService::new(provider, RateCache::new(), TTL);

        let (a, b) = tokio::join!(svc.get_rates(), svc.get_rates());

        assert_eq!(a.unwrap_err().status_code(), 401);
        assert_eq!(b.unwrap_err().status_code(), 401);
        assert_eq!(svc.provider().calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_callers_on_worker_threads_share_one_refresh() {
        let provider = ScriptedProvider::new(vec![Ok(snapshot(60_000))])
            .with_delay(Duration::from_millis(20));
        let svc = Arc::new(RateService::new(provider, RateCache::new(), TTL));

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.get_rates().await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().local_per_usd, 60_000);
        }

        assert_eq!(svc.provider().calls(), 1);
    }
}

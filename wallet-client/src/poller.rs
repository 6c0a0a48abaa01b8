//! Background rate poller.
//!
//! Keeps the latest snapshot for a long-running consumer and publishes it on
//! a `watch` channel. Refreshes run one at a time on a single task, so an
//! older response can never overwrite a newer one.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use wallet_types::RateSnapshot;

use crate::{ClientError, WalletClient};

/// Statuses that stop the retry loop until the next regular refresh.
const TERMINAL_STATUSES: [u16; 2] = [401, 422];

/// Where the poller gets its rates from.
#[async_trait]
pub trait RateSource: Send + Sync + 'static {
    async fn fetch_rates(&self) -> Result<RateSnapshot, ClientError>;
}

#[async_trait]
impl RateSource for WalletClient {
    async fn fetch_rates(&self) -> Result<RateSnapshot, ClientError> {
        self.rates().await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Time between regular refreshes.
    pub interval: Duration,
    /// First retry delay; doubles on every consecutive failure.
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl PollerConfig {
    /// Delay before retry number `retry_count + 1`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(retry_count))
            .min(self.max_backoff)
    }
}

/// What the poller currently knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    /// Latest snapshot received; a failed refresh never clears it.
    pub snapshot: Option<RateSnapshot>,
    /// Error of the last refresh, cleared on success.
    pub last_error: Option<String>,
    /// Consecutive retryable failures.
    pub retry_count: u32,
}

impl PollState {
    /// True when the data shown may be out of date.
    pub fn is_degraded(&self) -> bool {
        self.last_error.is_some() || self.snapshot.as_ref().is_some_and(|s| s.stale)
    }
}

/// Handle to a running poller. Dropping it stops the task.
pub struct RatePoller {
    state: watch::Receiver<PollState>,
    trigger: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RatePoller {
    /// Starts polling immediately on the current runtime.
    pub fn spawn<R: RateSource>(source: R, config: PollerConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(PollState::default());
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let task = tokio::spawn(run(source, config, state_tx, trigger_rx));

        Self {
            state: state_rx,
            trigger: trigger_tx,
            task,
        }
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Requests an immediate refresh (e.g. on focus or resume).
    ///
    /// Ignored if one is already pending or in flight.
    pub fn refresh_now(&self) {
        if self.trigger.try_send(()).is_err() {
            debug!("Refresh already pending; trigger dropped");
        }
    }
}

impl Drop for RatePoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<R: RateSource>(
    source: R,
    config: PollerConfig,
    state: watch::Sender<PollState>,
    mut triggers: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut retry_at: Option<Instant> = None;

    loop {
        let retry = async {
            match retry_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ticker.tick() => {}
            _ = retry => {}
            trigger = triggers.recv() => {
                if trigger.is_none() {
                    break;
                }
            }
        }

        retry_at = refresh(&source, &config, &state)
            .await
            .map(|delay| Instant::now() + delay);

        // Triggers that arrived while the refresh was in flight are stale.
        while triggers.try_recv().is_ok() {}
    }
}

/// Runs one refresh and returns the retry delay, if a retry is due.
async fn refresh<R: RateSource>(
    source: &R,
    config: &PollerConfig,
    state: &watch::Sender<PollState>,
) -> Option<Duration> {
    match source.fetch_rates().await {
        Ok(snapshot) => {
            debug!(as_of = %snapshot.as_of, stale = snapshot.stale, "Rates refreshed");
            state.send_modify(|s| {
                s.snapshot = Some(snapshot);
                s.last_error = None;
                s.retry_count = 0;
            });
            None
        }
        Err(err) => {
            let terminal = err
                .status()
                .is_some_and(|status| TERMINAL_STATUSES.contains(&status));
            let mut delay = None;

            state.send_modify(|s| {
                s.last_error = Some(err.to_string());
                if !terminal {
                    delay = Some(config.backoff(s.retry_count));
                    s.retry_count += 1;
                }
            });

            warn!(error = %err, retry_in = ?delay, "Rate refresh failed");
            delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays outcomes (then keeps succeeding) and records call times.
    struct ScriptedSource {
        outcomes: Mutex<VecDeque<Result<RateSnapshot, ClientError>>>,
        calls: Arc<Mutex<Vec<Instant>>>,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(
            outcomes: Vec<Result<RateSnapshot, ClientError>>,
        ) -> (Self, Arc<Mutex<Vec<Instant>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let source = Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: calls.clone(),
                delay: Duration::ZERO,
            };
            (source, calls)
        }
    }

    #[async_trait]
    impl RateSource for ScriptedSource {
        async fn fetch_rates(&self) -> Result<RateSnapshot, ClientError> {
            self.calls.lock().unwrap().push(Instant::now());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(snapshot()))
        }
    }

    fn snapshot() -> RateSnapshot {
        RateSnapshot::new(
            60_000,
            62_000,
            60_050,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn api_error(status: u16) -> ClientError {
        ClientError::Api {
            status,
            message: "upstream failed".into(),
        }
    }

    /// Offsets of each call from the first one, in whole seconds.
    fn offsets(calls: &Arc<Mutex<Vec<Instant>>>) -> Vec<u64> {
        let calls = calls.lock().unwrap();
        calls
            .iter()
            .map(|at| at.duration_since(calls[0]).as_secs())
            .collect()
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let config = PollerConfig::default();

        let delays: Vec<u64> = (0..8).map(|n| config.backoff(n).as_secs()).collect();

        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(config.backoff(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_degraded_when_stale_or_failing() {
        let mut state = PollState {
            snapshot: Some(snapshot()),
            ..PollState::default()
        };
        assert!(!state.is_degraded());

        state.snapshot = Some(snapshot().to_stale("upstream down"));
        assert!(state.is_degraded());

        state.snapshot = Some(snapshot());
        state.last_error = Some("connection refused".into());
        assert!(state.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_initial_snapshot() {
        let (source, _) = ScriptedSource::new(vec![]);
        let poller = RatePoller::spawn(source, PollerConfig::default());
        let mut rx = poller.subscribe();

        rx.changed().await.unwrap();

        let state = rx.borrow().clone();
        assert_eq!(state.snapshot, Some(snapshot()));
        assert_eq!(state.retry_count, 0);
        assert!(!state.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_backoff_then_resets() {
        let (source, calls) = ScriptedSource::new(vec![
            Err(api_error(503)),
            Err(api_error(500)),
            Err(api_error(429)),
        ]);
        let poller = RatePoller::spawn(source, PollerConfig::default());

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(offsets(&calls), vec![0, 1, 3, 7]);
        let state = poller.state();
        assert_eq!(state.retry_count, 0);
        assert!(state.last_error.is_none());
        assert!(state.snapshot.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_waits_for_next_tick() {
        let (source, calls) = ScriptedSource::new(vec![Err(api_error(401))]);
        let poller = RatePoller::spawn(source, PollerConfig::default());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(offsets(&calls), vec![0]);
        assert_eq!(poller.state().retry_count, 0);
        assert!(poller.state().is_degraded());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(offsets(&calls), vec![0, 60]);
        assert!(!poller.state().is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_snapshot() {
        let (source, _) = ScriptedSource::new(vec![Ok(snapshot()), Err(api_error(503))]);
        let poller = RatePoller::spawn(source, PollerConfig::default());

        tokio::time::sleep(Duration::from_secs(1)).await;
        poller.refresh_now();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let state = poller.state();
        assert_eq!(state.snapshot, Some(snapshot()));
        assert_eq!(state.retry_count, 1);
        assert!(state.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_fetches_immediately() {
        let (source, calls) = ScriptedSource::new(vec![]);
        let poller = RatePoller::spawn(source, PollerConfig::default());

        tokio::time::sleep(Duration::from_secs(5)).await;
        poller.refresh_now();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(offsets(&calls), vec![0, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_during_refresh_are_dropped() {
        let (mut source, calls) = ScriptedSource::new(vec![]);
        source.delay = Duration::from_secs(5);
        let poller = RatePoller::spawn(source, PollerConfig::default());

        tokio::time::sleep(Duration::from_secs(1)).await;
        poller.refresh_now();
        poller.refresh_now();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(offsets(&calls), vec![0]);
        assert!(poller.state().snapshot.is_some());
    }
}

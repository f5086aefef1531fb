//! One search from request to outcome.
//!
//! A [`SearchSession`] issues the request, retries transient upstream
//! failures with linear backoff, ticks a synthetic progress estimate while it
//! waits, and normalizes the records on success. Its state is published on a
//! `watch` channel; [`SessionHandle`] is the observer side.
//!
//! ```text
//! idle -> running -> succeeded | failed | cancelled
//!            |  ^
//!            v  |
//!          retrying -> cancelled
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use prospect_core::{AppConfig, CoverageStats, Prospect, SearchQuery};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::classify::SearchFailure;
use crate::client::ProspectClient;
use crate::error::ClientError;
use crate::normalize::normalize_all;
use crate::progress::ProgressEstimator;
use crate::types::{SearchResponse, Timings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    /// Waiting out the backoff delay before the next attempt.
    Retrying,
    Succeeded,
    Failed,
    Cancelled,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Idle => matches!(next, Self::Running | Self::Cancelled),
            Self::Running => matches!(
                next,
                Self::Succeeded | Self::Retrying | Self::Failed | Self::Cancelled
            ),
            Self::Retrying => matches!(next, Self::Running | Self::Cancelled),
            Self::Succeeded | Self::Failed | Self::Cancelled => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linear backoff: retry `n` waits `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub retry: RetryPolicy,
    pub progress_tick: Duration,
    pub progress_ceiling_pct: f64,
    /// How long 100% stays visible after a success.
    pub display_hold: Duration,
}

impl SessionSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.retry_base_delay_ms),
            },
            progress_tick: Duration::from_millis(config.progress_tick_ms),
            progress_ceiling_pct: config.progress_ceiling_pct,
            display_hold: Duration::from_millis(config.progress_hold_ms),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            progress_tick: Duration::from_millis(500),
            progress_ceiling_pct: 92.0,
            display_hold: Duration::from_millis(1_000),
        }
    }
}

/// Everything a successful search produced.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub prospects: Vec<Prospect>,
    /// `count` as reported by the server.
    pub reported_count: Option<u64>,
    /// The query as the server understood it.
    pub query_echo: Option<Value>,
    pub timings: Option<Timings>,
    pub coverage: Option<CoverageStats>,
    pub elapsed: Duration,
    /// Retries spent before the successful attempt.
    pub retries: u32,
}

impl SearchResults {
    fn from_response(response: SearchResponse, elapsed: Duration, retries: u32) -> Self {
        let coverage = response.coverage_stats();
        Self {
            prospects: normalize_all(response.results),
            reported_count: response.count,
            query_echo: response.query,
            timings: response.timings,
            coverage,
            elapsed,
            retries,
        }
    }

    /// Records enriched from their websites, when the server reported it.
    #[must_use]
    pub fn enriched_count(&self) -> Option<u64> {
        self.timings
            .as_ref()
            .and_then(|t| t.enrichment.as_ref())
            .map(|e| e.enriched_count)
    }

    /// Server-side duration if reported, else the wall-clock time here.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.timings
            .as_ref()
            .and_then(|t| t.total_seconds)
            .unwrap_or_else(|| self.elapsed.as_secs_f64())
    }
}

/// Observable state of a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: u64,
    pub status: SessionStatus,
    /// Retries issued so far.
    pub attempt: u32,
    pub progress_pct: f64,
    /// Set only when the session fails.
    pub last_error: Option<SearchFailure>,
    pub results: Option<Arc<SearchResults>>,
}

impl SessionSnapshot {
    fn idle(session_id: u64) -> Self {
        Self {
            session_id,
            status: SessionStatus::Idle,
            attempt: 0,
            progress_pct: 0.0,
            last_error: None,
            results: None,
        }
    }
}

/// Observer and cancel switch for one session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    rx: watch::Receiver<SessionSnapshot>,
    cancel: CancellationToken,
}

impl SessionHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.rx.borrow().status
    }

    /// Asks the session to stop. Has no effect once it is terminal.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A fresh receiver for progress and status updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.rx.clone()
    }

    /// Waits until the session reaches a terminal state.
    pub async fn wait(&self) -> SessionSnapshot {
        let mut rx = self.rx.clone();
        if let Ok(snapshot) = rx.wait_for(|s| s.status.is_terminal()).await {
            return snapshot.clone();
        }
        // Session dropped without finishing.
        self.snapshot()
    }
}

/// A single search lineage: one query, up to `1 + max_retries` requests,
/// never more than one in flight.
pub struct SearchSession {
    id: u64,
    client: Arc<ProspectClient>,
    query: SearchQuery,
    settings: SessionSettings,
    cancel: CancellationToken,
    tx: watch::Sender<SessionSnapshot>,
    progress: ProgressEstimator,
    attempt: u32,
}

impl SearchSession {
    /// Creates an idle session and its handle. Nothing happens until
    /// [`SearchSession::run`] is polled.
    #[must_use]
    pub fn new(
        id: u64,
        client: Arc<ProspectClient>,
        query: SearchQuery,
        settings: SessionSettings,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = watch::channel(SessionSnapshot::idle(id));
        let cancel = CancellationToken::new();
        let progress = ProgressEstimator::new(settings.progress_ceiling_pct);
        let handle = SessionHandle {
            id,
            rx,
            cancel: cancel.clone(),
        };
        let session = Self {
            id,
            client,
            query,
            settings,
            cancel,
            tx,
            progress,
            attempt: 0,
        };
        (session, handle)
    }

    /// Drives the session to a terminal state.
    pub async fn run(mut self) {
        let started = Instant::now();
        if self.cancel.is_cancelled() {
            self.finish_cancelled();
            return;
        }
        self.publish(SessionStatus::Running, |_| {});

        loop {
            let Some(result) = self.request_once().await else {
                self.finish_cancelled();
                return;
            };

            let err = match result {
                Ok(response) => {
                    self.finish_succeeded(response, started.elapsed()).await;
                    return;
                }
                Err(err) => err,
            };

            let failure = SearchFailure::from(&err);
            let retry = self.settings.retry;
            if !failure.is_retriable() || self.attempt >= retry.max_retries {
                self.finish_failed(failure, &err);
                return;
            }

            self.attempt += 1;
            let delay = retry.delay_for(self.attempt);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(
                session = self.id,
                attempt = self.attempt,
                max_retries = retry.max_retries,
                delay_ms,
                error = %failure.message,
                "transient upstream error, retrying after delay"
            );
            self.progress.reset();
            self.publish(SessionStatus::Retrying, |_| {});

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    self.finish_cancelled();
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            self.publish(SessionStatus::Running, |_| {});
        }
    }

    /// One request, racing cancellation and the progress ticker. `None`
    /// means the session was cancelled; the request future is dropped,
    /// which aborts it.
    async fn request_once(&mut self) -> Option<Result<SearchResponse, ClientError>> {
        let period = self.settings.progress_tick.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let request = self.client.search(&self.query);
        tokio::pin!(request);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return None,
                result = &mut request => return Some(result),
                _ = ticker.tick() => {
                    let pct = self.progress.tick();
                    self.tx.send_modify(|s| s.progress_pct = pct);
                }
            }
        }
    }

    async fn finish_succeeded(&mut self, response: SearchResponse, elapsed: Duration) {
        // A late response must never overwrite a cancellation.
        if self.cancel.is_cancelled() {
            self.finish_cancelled();
            return;
        }

        let results = Arc::new(SearchResults::from_response(
            response,
            elapsed,
            self.attempt,
        ));
        tracing::info!(
            session = self.id,
            results = results.prospects.len(),
            retries = self.attempt,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "search succeeded"
        );
        self.progress.complete();
        self.publish(SessionStatus::Succeeded, |s| {
            s.results = Some(results);
            s.last_error = None;
        });

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {}
            () = tokio::time::sleep(self.settings.display_hold) => {}
        }
        self.progress.reset();
        self.tx.send_modify(|s| s.progress_pct = 0.0);
    }

    fn finish_failed(&mut self, failure: SearchFailure, err: &ClientError) {
        tracing::warn!(
            session = self.id,
            kind = %failure.kind,
            status = ?failure.status,
            attempt = self.attempt,
            error = %err,
            "search failed"
        );
        self.progress.reset();
        self.publish(SessionStatus::Failed, |s| s.last_error = Some(failure));
    }

    fn finish_cancelled(&mut self) {
        self.progress.reset();
        self.publish(SessionStatus::Cancelled, |_| {});
    }

    /// Moves to `status`, unless the current state does not allow it.
    fn publish(&self, status: SessionStatus, update: impl FnOnce(&mut SessionSnapshot)) {
        let attempt = self.attempt;
        let pct = self.progress.pct();
        let applied = self.tx.send_if_modified(|snapshot| {
            if !snapshot.status.can_transition_to(status) {
                return false;
            }
            snapshot.status = status;
            snapshot.attempt = attempt;
            snapshot.progress_pct = pct;
            update(snapshot);
            true
        });
        if applied {
            tracing::debug!(session = self.id, status = %status, attempt, "session transition");
        }
    }
}

//! Poller - the live feed state machine
//!
//! Each tick fetches the full CDR collection and classifies the result:
//!
//! ```text
//!            non-empty                    empty
//! BUILDING ────────────▶ LIVE ─────────────────────▶ STOPPED
//!   │  ▲                 │  ▲                        (timer cancelled,
//!   └──┘ empty / error   └──┘ non-empty / error       no more fetches)
//! ```
//!
//! An empty answer before any data arrived means the backend is still
//! loading; the same answer after data arrived means the feed is drained.
//! Errors never move the machine.
//!
//! # Overlapping ticks
//!
//! Ticks are not serialized: a slow fetch does not hold back the next tick,
//! so two fetches can be in flight. Every tick gets a sequence number and a
//! successful result is only applied when it is newer than the last applied
//! one. Older results are dropped with a debug log.

mod task;

pub use task::{run, CancelHandle};

use crate::api::{CdrFeed, FetchError};
use crate::auth::TokenSource;
use crate::model::Cdr;
use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Where the feed is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No data seen yet
    Building,
    /// Data arrived, still polling
    Live,
    /// Feed drained, polling cancelled for good
    Stopped,
}

/// Process-wide poll state
///
/// Flags only ever go false -> true. Constructible with arbitrary starting
/// flags so the machine can be tested from any state.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    /// Latest applied collection, in server order
    pub full_data: Arc<Vec<Cdr>>,
    pub have_received_data: bool,
    pub stop_polling: bool,
    pub last_updated: Option<DateTime<Local>>,
    /// Sequence number handed to the most recent tick
    issued_seq: u64,
    /// Sequence number of the last successful result that was applied
    applied_seq: u64,
}

impl PollState {
    pub fn with_flags(have_received_data: bool, stop_polling: bool) -> Self {
        Self {
            have_received_data,
            stop_polling: stop_polling && have_received_data,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> PollPhase {
        if self.stop_polling {
            PollPhase::Stopped
        } else if self.have_received_data {
            PollPhase::Live
        } else {
            PollPhase::Building
        }
    }
}

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Status line text with an optional lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    /// None keeps the message until replaced
    pub clear_after: Option<Duration>,
}

impl StatusMessage {
    pub fn sticky(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            clear_after: None,
        }
    }

    pub fn transient(kind: StatusKind, text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            text: text.into(),
            kind,
            clear_after: Some(ttl),
        }
    }
}

/// What the poller asks the dashboard to do
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// Re-render table and charts from this collection
    Render(Arc<Vec<Cdr>>),
    Status(StatusMessage),
    LastUpdated(DateTime<Local>),
    /// Show or hide the live indicator after `delay`
    LiveIndicator { visible: bool, delay: Duration },
    /// Polling has ended for this session
    Stopped,
}

/// Receiver of poll events
pub trait PollObserver: Send {
    fn on_event(&mut self, event: PollEvent);
}

impl PollObserver for mpsc::Sender<PollEvent> {
    fn on_event(&mut self, event: PollEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Dashboard is not keeping up, dropped a poll event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Dashboard closed, poll event dropped");
            }
        }
    }
}

impl PollObserver for Vec<PollEvent> {
    fn on_event(&mut self, event: PollEvent) {
        self.push(event);
    }
}

/// Result of applying one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Already stopped; no fetch was issued or the result was dropped
    Skipped,
    /// An older tick finished after a newer one had been applied
    Stale,
    /// Empty answer or error while building
    StillBuilding,
    /// First data arrived
    WentLive { rows: usize },
    /// More data while live
    Refreshed { rows: usize },
    /// Empty answer while live; terminal
    Stopped,
    /// Fetch failed while live
    Failed,
}

/// Timing knobs for the poll loop and its status messages
#[derive(Debug, Clone, Copy)]
pub struct PollTiming {
    pub interval: Duration,
    /// Lifetime of transient status messages
    pub status_ttl: Duration,
    /// Delay before the live indicator hides after the feed drains
    pub indicator_hide_delay: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            status_ttl: Duration::from_secs(2),
            indicator_hide_delay: Duration::from_secs(3),
        }
    }
}

/// The state machine plus its collaborators
pub struct Poller<O> {
    feed: Arc<dyn CdrFeed>,
    tokens: Arc<dyn TokenSource>,
    observer: O,
    timer: CancelHandle,
    timing: PollTiming,
    state: PollState,
}

impl<O: PollObserver> Poller<O> {
    pub fn new(
        feed: Arc<dyn CdrFeed>,
        tokens: Arc<dyn TokenSource>,
        observer: O,
        timer: CancelHandle,
        timing: PollTiming,
    ) -> Self {
        Self::with_state(feed, tokens, observer, timer, timing, PollState::default())
    }

    pub fn with_state(
        feed: Arc<dyn CdrFeed>,
        tokens: Arc<dyn TokenSource>,
        observer: O,
        timer: CancelHandle,
        timing: PollTiming,
        state: PollState,
    ) -> Self {
        Self {
            feed,
            tokens,
            observer,
            timer,
            timing,
            state,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn phase(&self) -> PollPhase {
        self.state.phase()
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    pub fn timer(&self) -> &CancelHandle {
        &self.timer
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_state(self) -> PollState {
        self.state
    }

    /// Announce the initial state to the dashboard
    pub fn announce(&mut self) {
        self.observer.on_event(PollEvent::LiveIndicator {
            visible: true,
            delay: Duration::ZERO,
        });
        self.observer.on_event(PollEvent::Status(still_building()));
    }

    /// Reserve a sequence number for a new tick
    ///
    /// Returns None once stopped; callers must not fetch in that case.
    pub fn begin_tick(&mut self) -> Option<u64> {
        if self.state.stop_polling {
            return None;
        }
        self.state.issued_seq += 1;
        Some(self.state.issued_seq)
    }

    /// Future that performs one fetch with a freshly read token
    ///
    /// Owns its collaborators so several can be in flight at once.
    pub fn fetch(&self) -> BoxFuture<'static, Result<Vec<Cdr>, FetchError>> {
        let feed = self.feed.clone();
        let tokens = self.tokens.clone();
        Box::pin(async move {
            let token = tokens.current_token()?;
            feed.fetch_all(&token).await
        })
    }

    /// One complete tick: guard, fetch, apply
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(seq) = self.begin_tick() else {
            return TickOutcome::Skipped;
        };
        let result = self.fetch().await;
        self.apply(seq, result)
    }

    /// Apply the result of tick `seq` to the state machine
    pub fn apply(&mut self, seq: u64, result: Result<Vec<Cdr>, FetchError>) -> TickOutcome {
        if self.state.stop_polling {
            tracing::debug!("Tick {} finished after polling stopped, dropped", seq);
            return TickOutcome::Skipped;
        }

        match result {
            Err(e) => self.apply_failure(seq, e),
            Ok(_) if seq <= self.state.applied_seq => {
                tracing::debug!(
                    "Tick {} finished after tick {} was applied, dropped",
                    seq,
                    self.state.applied_seq
                );
                TickOutcome::Stale
            }
            Ok(records) => {
                self.state.applied_seq = seq;
                if records.is_empty() {
                    self.apply_empty()
                } else {
                    self.apply_records(records)
                }
            }
        }
    }

    fn apply_failure(&mut self, seq: u64, error: FetchError) -> TickOutcome {
        if self.state.have_received_data {
            tracing::warn!("Tick {} failed: {}", seq, error);
            self.observer.on_event(PollEvent::Status(StatusMessage::transient(
                StatusKind::Error,
                format!("⚠️ Failed to fetch records: {}", error),
                self.timing.status_ttl,
            )));
            TickOutcome::Failed
        } else {
            tracing::debug!("Tick {} failed while building: {}", seq, error);
            self.observer.on_event(PollEvent::Status(still_building()));
            TickOutcome::StillBuilding
        }
    }

    fn apply_empty(&mut self) -> TickOutcome {
        if !self.state.have_received_data {
            self.observer.on_event(PollEvent::Status(still_building()));
            return TickOutcome::StillBuilding;
        }

        self.state.stop_polling = true;
        self.timer.cancel();
        tracing::info!(
            "Feed drained after {} records, polling stopped",
            self.state.full_data.len()
        );

        self.observer.on_event(PollEvent::Status(StatusMessage::sticky(
            StatusKind::Success,
            "✅ All records received",
        )));
        self.observer.on_event(PollEvent::LiveIndicator {
            visible: false,
            delay: self.timing.indicator_hide_delay,
        });
        self.observer.on_event(PollEvent::Stopped);
        TickOutcome::Stopped
    }

    fn apply_records(&mut self, records: Vec<Cdr>) -> TickOutcome {
        let rows = records.len();
        let first = !self.state.have_received_data;
        let now = Local::now();

        self.state.full_data = Arc::new(records);
        self.state.have_received_data = true;
        self.state.last_updated = Some(now);

        self.observer
            .on_event(PollEvent::Render(self.state.full_data.clone()));
        self.observer.on_event(PollEvent::LastUpdated(now));

        if first {
            tracing::info!("First {} records arrived, feed is live", rows);
            self.observer.on_event(PollEvent::Status(StatusMessage::transient(
                StatusKind::Info,
                "🏗️ Database built, loading records",
                self.timing.status_ttl,
            )));
            TickOutcome::WentLive { rows }
        } else {
            tracing::debug!("Refreshed {} records", rows);
            self.observer.on_event(PollEvent::Status(StatusMessage::transient(
                StatusKind::Info,
                "📡 Receiving records...",
                self.timing.status_ttl,
            )));
            TickOutcome::Refreshed { rows }
        }
    }
}

fn still_building() -> StatusMessage {
    StatusMessage::sticky(
        StatusKind::Info,
        "⏳ Database is still building, waiting for records...",
    )
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::model::fixtures::cdr;

    fn poller(feed: Arc<ScriptedFeed>) -> Poller<Vec<PollEvent>> {
        Poller::new(
            feed,
            StaticToken::new("token"),
            Vec::new(),
            CancelHandle::new(),
            PollTiming::default(),
        )
    }

    fn renders(events: &[PollEvent]) -> Vec<Vec<i64>> {
        events
            .iter()
            .filter_map(|e| match e {
                PollEvent::Render(records) => Some(records.iter().map(|r| r.id).collect()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn five_tick_scenario() {
        let feed = ScriptedFeed::new(vec![
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![cdr(1, "CALL", Some("0791"))]),
            Ok(vec![cdr(1, "CALL", Some("0791")), cdr(2, "SMS", Some("0792"))]),
            Ok(vec![]),
        ]);
        let mut poller = poller(feed.clone());

        assert_eq!(poller.tick().await, TickOutcome::StillBuilding);
        assert_eq!(poller.tick().await, TickOutcome::StillBuilding);
        assert_eq!(poller.phase(), PollPhase::Building);
        assert!(renders(poller.observer()).is_empty());

        assert_eq!(poller.tick().await, TickOutcome::WentLive { rows: 1 });
        assert_eq!(poller.phase(), PollPhase::Live);

        assert_eq!(poller.tick().await, TickOutcome::Refreshed { rows: 2 });

        assert_eq!(poller.tick().await, TickOutcome::Stopped);
        assert_eq!(poller.phase(), PollPhase::Stopped);
        assert!(poller.timer().is_cancelled());

        // Exactly two renders: one row, then two rows in server order
        assert_eq!(renders(poller.observer()), vec![vec![1], vec![1, 2]]);
        assert_eq!(poller.state().full_data.len(), 2);
        assert!(matches!(poller.observer().last(), Some(PollEvent::Stopped)));

        // Terminal quiescence
        assert_eq!(poller.tick().await, TickOutcome::Skipped);
        assert_eq!(feed.calls(), 5);
    }

    #[tokio::test]
    async fn errors_never_advance_flags() {
        let feed = ScriptedFeed::new(vec![
            Err(server_error()),
            Err(FetchError::Transport("connection refused".to_string())),
        ]);
        let mut poller = poller(feed);

        assert_eq!(poller.tick().await, TickOutcome::StillBuilding);
        assert_eq!(poller.tick().await, TickOutcome::StillBuilding);
        assert!(!poller.state().have_received_data);
        assert!(!poller.state().stop_polling);
    }

    #[tokio::test]
    async fn live_error_keeps_data_and_reports() {
        let feed = ScriptedFeed::new(vec![
            Ok(vec![cdr(1, "CALL", None)]),
            Err(server_error()),
        ]);
        let mut poller = poller(feed);

        poller.tick().await;
        assert_eq!(poller.tick().await, TickOutcome::Failed);
        assert_eq!(poller.phase(), PollPhase::Live);
        assert_eq!(poller.state().full_data.len(), 1);
        assert!(!poller.timer().is_cancelled());

        let last_status = poller.observer().iter().rev().find_map(|e| match e {
            PollEvent::Status(s) => Some(s.clone()),
            _ => None,
        });
        let status = last_status.unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.clear_after.is_some());
        assert!(status.text.contains("503"));
    }

    #[tokio::test]
    async fn missing_token_is_a_failed_tick() {
        let feed = ScriptedFeed::new(vec![Ok(vec![cdr(1, "CALL", None)])]);
        let tokens = StaticToken::new("t");
        *tokens.0.lock().unwrap() = None;

        let mut poller = Poller::new(
            feed.clone(),
            tokens,
            Vec::new(),
            CancelHandle::new(),
            PollTiming::default(),
        );

        assert_eq!(poller.tick().await, TickOutcome::StillBuilding);
        assert_eq!(feed.calls(), 0);
        assert!(!poller.state().have_received_data);
    }

    #[tokio::test]
    async fn token_is_read_fresh_every_tick() {
        let feed = ScriptedFeed::new(vec![
            Ok(vec![cdr(1, "CALL", None)]),
            Ok(vec![cdr(1, "CALL", None)]),
        ]);
        let tokens = StaticToken::new("first");
        let mut poller = Poller::new(
            feed.clone(),
            tokens.clone(),
            Vec::new(),
            CancelHandle::new(),
            PollTiming::default(),
        );

        poller.tick().await;
        *tokens.0.lock().unwrap() = Some("refreshed".to_string());
        poller.tick().await;

        assert_eq!(*feed.tokens_seen.lock().unwrap(), vec!["first", "refreshed"]);
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut poller = poller(ScriptedFeed::new(vec![]));
        let slow = poller.begin_tick().unwrap();
        let fast = poller.begin_tick().unwrap();

        let fresh = vec![cdr(1, "CALL", None), cdr(2, "SMS", None)];
        assert_eq!(
            poller.apply(fast, Ok(fresh)),
            TickOutcome::WentLive { rows: 2 }
        );
        assert_eq!(
            poller.apply(slow, Ok(vec![cdr(1, "CALL", None)])),
            TickOutcome::Stale
        );
        assert_eq!(poller.state().full_data.len(), 2);
    }

    #[test]
    fn stale_empty_result_does_not_stop() {
        let mut poller = poller(ScriptedFeed::new(vec![]));
        let slow = poller.begin_tick().unwrap();
        let fast = poller.begin_tick().unwrap();

        poller.apply(fast, Ok(vec![cdr(1, "CALL", None)]));
        assert_eq!(poller.apply(slow, Ok(vec![])), TickOutcome::Stale);
        assert_eq!(poller.phase(), PollPhase::Live);
    }

    #[test]
    fn results_after_stop_are_dropped() {
        let mut poller = Poller::with_state(
            Arc::new(ScriptedFeed::default()),
            StaticToken::new("t"),
            Vec::new(),
            CancelHandle::new(),
            PollTiming::default(),
            PollState::with_flags(true, false),
        );
        let late = poller.begin_tick().unwrap();
        let last = poller.begin_tick().unwrap();

        assert_eq!(poller.apply(last, Ok(vec![])), TickOutcome::Stopped);
        assert_eq!(
            poller.apply(late, Ok(vec![cdr(9, "DATA", None)])),
            TickOutcome::Skipped
        );
        assert!(poller.state().full_data.is_empty());
        assert_eq!(poller.begin_tick(), None);
    }

    #[test]
    fn monotonic_flags_over_mixed_outcomes() {
        let mut poller = poller(ScriptedFeed::new(vec![]));
        let outcomes: Vec<Result<Vec<Cdr>, FetchError>> = vec![
            Ok(vec![]),
            Err(server_error()),
            Ok(vec![cdr(1, "CALL", None)]),
            Err(server_error()),
            Ok(vec![cdr(2, "SMS", None)]),
            Ok(vec![]),
            Ok(vec![cdr(3, "DATA", None)]),
            Err(server_error()),
        ];

        let mut received_flips = 0;
        let mut stop_flips = 0;
        let mut prev = (false, false);
        for result in outcomes {
            if let Some(seq) = poller.begin_tick() {
                poller.apply(seq, result);
            }
            let now = (
                poller.state().have_received_data,
                poller.state().stop_polling,
            );
            assert!(!(prev.0 && !now.0), "have_received_data reverted");
            assert!(!(prev.1 && !now.1), "stop_polling reverted");
            assert!(!now.1 || now.0, "stopped without data");
            received_flips += (now.0 != prev.0) as usize;
            stop_flips += (now.1 != prev.1) as usize;
            prev = now;
        }

        assert_eq!(received_flips, 1);
        assert_eq!(stop_flips, 1);
        assert_eq!(poller.state().full_data[0].id, 2);
    }

    #[test]
    fn with_flags_cannot_stop_before_data() {
        let state = PollState::with_flags(false, true);
        assert_eq!(state.phase(), PollPhase::Building);
    }
}

// TUI application state
//
// Holds everything the widgets draw: the reconciler and its chart handles,
// the filter selectors, the status line, the live indicator and the table
// scroll position. All time-dependent methods take `now` so the state can be
// driven from tests without a terminal.

use super::components::Toast;
use super::theme::Theme;
use crate::api::{FetchError, FilteredQuery};
use crate::dashboard::{ChartId, ChartSink, ChartSpec, Dataset, Reconciler};
use crate::filter::{FilterAction, FilterController, FilterMode};
use crate::logging::LogBuffer;
use crate::model::Cdr;
use crate::poller::{PollEvent, StatusKind, StatusMessage};
use chrono::{DateTime, Local};
use crossterm::event::KeyCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Debounce duration for action keys (q, L)
/// Prevents rapid-fire triggers on terminals that don't send release events
const ACTION_DEBOUNCE: Duration = Duration::from_millis(150);

/// Lifetime of the callee advisory and filter errors
const ADVISORY_TTL: Duration = Duration::from_secs(2);

const PAGE_ROWS: usize = 10;

/// Chart handles owned by the TUI
///
/// Widgets draw from these datasets; the reconciler mutates them in place.
#[derive(Debug, Default)]
pub struct TuiCharts {
    charts: BTreeMap<ChartId, ChartSpec>,
}

impl TuiCharts {
    pub fn get(&self, id: ChartId) -> Option<&ChartSpec> {
        self.charts.get(&id)
    }
}

impl ChartSink for TuiCharts {
    fn create(&mut self, id: ChartId, spec: &ChartSpec) {
        self.charts.insert(id, spec.clone());
    }

    fn update(&mut self, id: ChartId, data: &Dataset) {
        if let Some(chart) = self.charts.get_mut(&id) {
            chart.dataset = data.clone();
        }
    }
}

/// Status line content and when it goes away
#[derive(Debug, Clone)]
pub struct ActiveStatus {
    pub message: StatusMessage,
    pub expires_at: Option<Instant>,
}

/// Live indicator with an optional delayed change
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveIndicator {
    pub visible: bool,
    pending: Option<(bool, Instant)>,
}

/// Why the dashboard closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Logout,
}

pub struct App {
    pub reconciler: Reconciler<TuiCharts>,
    pub filters: FilterController,

    /// Latest collection from the poller
    pub full_data: Arc<Vec<Cdr>>,

    /// Server-filtered view, shown instead of `full_data` while active
    pub view_data: Option<Arc<Vec<Cdr>>>,

    pub status: Option<ActiveStatus>,
    pub live: LiveIndicator,
    pub last_updated: Option<DateTime<Local>>,
    pub polling_stopped: bool,

    /// Logged-in user for the title bar
    pub user: Option<String>,

    pub log_buffer: LogBuffer,
    pub theme: Theme,

    /// First visible table row
    pub table_offset: usize,

    pub toast: Option<Toast>,

    pub exit: Option<Exit>,

    start_time: Instant,
    last_action_time: Option<Instant>,

    /// Sequence number of the last re-query sent to the backend
    requery_issued: u64,
    /// Highest re-query whose records are on screen
    requery_applied: u64,
}

impl App {
    pub fn new(filter_mode: FilterMode, user: Option<String>, log_buffer: LogBuffer) -> Self {
        Self {
            reconciler: Reconciler::new(TuiCharts::default()),
            filters: FilterController::new(filter_mode),
            full_data: Arc::new(Vec::new()),
            view_data: None,
            status: None,
            live: LiveIndicator::default(),
            last_updated: None,
            polling_stopped: false,
            user,
            log_buffer,
            theme: Theme::default(),
            table_offset: 0,
            toast: None,
            exit: None,
            start_time: Instant::now(),
            last_action_time: None,
            requery_issued: 0,
            requery_applied: 0,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.exit.is_some()
    }

    /// Check if an action should be debounced
    /// Returns true if action should be blocked (too soon since last action)
    pub fn should_debounce_action(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_action_time {
            if now.duration_since(last) < ACTION_DEBOUNCE {
                return true;
            }
        }
        self.last_action_time = Some(now);
        false
    }

    /// Handle a key press
    ///
    /// Returns a query when the selection needs a backend round trip.
    pub fn handle_key(&mut self, key: KeyCode, now: Instant) -> Option<FilteredQuery> {
        let action = match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                if !self.should_debounce_action(now) {
                    self.exit = Some(Exit::Quit);
                }
                return None;
            }
            KeyCode::Char('L') => {
                if !self.should_debounce_action(now) {
                    self.exit = Some(Exit::Logout);
                }
                return None;
            }
            KeyCode::Char('f') => self.filters.cycle_sort(),
            KeyCode::Char('s') => self.filters.cycle_service(),
            KeyCode::Char('d') => self.filters.toggle_date(),
            KeyCode::Char('r') => {
                self.toast = Some(Toast::new("Filters cleared", now));
                self.filters.reset()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll_down(1);
                return None;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll_up(1);
                return None;
            }
            KeyCode::PageDown => {
                self.scroll_down(PAGE_ROWS);
                return None;
            }
            KeyCode::PageUp => {
                self.scroll_up(PAGE_ROWS);
                return None;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.table_offset = 0;
                return None;
            }
            _ => return None,
        };
        self.apply_filter_action(action, now)
    }

    /// Apply an event from the poller
    ///
    /// Returns a query to run when a server-filtered view needs refreshing.
    pub fn handle_poll_event(&mut self, event: PollEvent, now: Instant) -> Option<FilteredQuery> {
        match event {
            PollEvent::Render(records) => {
                self.full_data = records;
                if self.view_data.is_some() {
                    return Some(self.filters.query());
                }
                self.render(now);
            }
            PollEvent::Status(message) => self.set_status(message, now),
            PollEvent::LastUpdated(at) => self.last_updated = Some(at),
            PollEvent::LiveIndicator { visible, delay } => {
                if delay.is_zero() {
                    self.live.visible = visible;
                    self.live.pending = None;
                } else {
                    self.live.pending = Some((visible, now + delay));
                }
            }
            PollEvent::Stopped => self.polling_stopped = true,
        }
        None
    }

    /// Apply what the filter controller decided
    pub fn apply_filter_action(&mut self, action: FilterAction, now: Instant) -> Option<FilteredQuery> {
        match action {
            FilterAction::Requery(query) => {
                tracing::debug!("Re-querying backend: {:?}", query.params());
                Some(query)
            }
            FilterAction::Rerender => {
                if self.filters.query().is_empty() {
                    self.view_data = None;
                }
                self.table_offset = 0;
                self.render(now);
                None
            }
        }
    }

    /// Number the next re-query; its answer comes back through `handle_requery`
    pub fn begin_requery(&mut self) -> u64 {
        self.requery_issued += 1;
        self.requery_issued
    }

    /// Apply the answer to re-query `seq`
    ///
    /// Answers can arrive out of order. One older than the records already
    /// shown, or for a selection that has since changed, is dropped.
    pub fn handle_requery(
        &mut self,
        seq: u64,
        query: FilteredQuery,
        result: Result<Vec<Cdr>, FetchError>,
        now: Instant,
    ) {
        if seq <= self.requery_applied {
            tracing::debug!(
                "Dropping filtered result #{} (already showing #{})",
                seq,
                self.requery_applied
            );
            return;
        }
        if query != self.filters.query() {
            tracing::debug!("Dropping filtered result for outdated selection {:?}", query);
            return;
        }
        match result {
            Ok(records) => {
                self.requery_applied = seq;
                self.view_data = Some(Arc::new(records));
                self.table_offset = 0;
                self.render(now);
            }
            Err(e) => {
                tracing::warn!("Filtered fetch failed: {}", e);
                self.set_status(
                    StatusMessage::transient(
                        StatusKind::Error,
                        format!("⚠️ Failed to fetch filtered records: {}", e),
                        ADVISORY_TTL,
                    ),
                    now,
                );
            }
        }
    }

    /// Re-render the table and charts from the current collection
    pub fn render(&mut self, now: Instant) {
        let data = self.view_data.as_ref().unwrap_or(&self.full_data).clone();
        let options = *self.filters.options();
        let report = self.reconciler.render_at(
            &data,
            &options,
            now,
            Local::now().date_naive(),
        );
        if let Some(advisory) = report.advisory {
            self.set_status(
                StatusMessage::transient(StatusKind::Info, advisory, ADVISORY_TTL),
                now,
            );
        }
        let rows = self.reconciler.table().rows.len();
        self.table_offset = self.table_offset.min(rows.saturating_sub(1));
    }

    pub fn set_status(&mut self, message: StatusMessage, now: Instant) {
        let expires_at = message.clear_after.map(|ttl| now + ttl);
        self.status = Some(ActiveStatus {
            message,
            expires_at,
        });
    }

    /// Timer housekeeping: status expiry, delayed indicator, row highlights
    pub fn tick(&mut self, now: Instant) {
        if let Some(status) = &self.status {
            if status.expires_at.is_some_and(|at| at <= now) {
                self.status = None;
            }
        }

        if let Some((visible, at)) = self.live.pending {
            if at <= now {
                self.live.visible = visible;
                self.live.pending = None;
            }
        }

        if self.toast.as_ref().is_some_and(|t| t.is_expired(now)) {
            self.toast = None;
        }

        self.reconciler.prune_expired(now);
    }

    pub fn scroll_down(&mut self, by: usize) {
        let rows = self.reconciler.table().rows.len();
        self.table_offset = (self.table_offset + by).min(rows.saturating_sub(1));
    }

    pub fn scroll_up(&mut self, by: usize) {
        self.table_offset = self.table_offset.saturating_sub(by);
    }

    /// Rows currently displayed
    pub fn row_count(&self) -> usize {
        self.reconciler.table().rows.len()
    }

    pub fn uptime(&self) -> String {
        let seconds = self.start_time.elapsed().as_secs();
        format!(
            "{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::cdr;
    use crate::model::{ServiceType, SortKey};
    use crate::filter::FilterSelection;

    fn app(mode: FilterMode) -> App {
        App::new(mode, Some("alice".to_string()), LogBuffer::new())
    }

    fn records() -> Arc<Vec<Cdr>> {
        Arc::new(vec![
            cdr(1, "CALL", Some("0791")),
            cdr(2, "DATA", None),
            cdr(3, "SMS", Some("0790")),
        ])
    }

    #[test]
    fn render_event_updates_table_and_charts() {
        let mut app = app(FilterMode::Client);
        let now = Instant::now();

        assert_eq!(app.handle_poll_event(PollEvent::Render(records()), now), None);

        assert_eq!(app.row_count(), 3);
        let distribution = app.reconciler.sink().get(ChartId::Distribution).unwrap();
        assert_eq!(distribution.dataset.values, vec![1, 1, 1]);
    }

    #[test]
    fn transient_status_expires() {
        let mut app = app(FilterMode::Client);
        let now = Instant::now();
        app.handle_poll_event(
            PollEvent::Status(StatusMessage::transient(
                StatusKind::Info,
                "📡 Receiving records...",
                Duration::from_secs(2),
            )),
            now,
        );

        app.tick(now + Duration::from_secs(1));
        assert!(app.status.is_some());
        app.tick(now + Duration::from_secs(2));
        assert!(app.status.is_none());
    }

    #[test]
    fn sticky_status_stays() {
        let mut app = app(FilterMode::Client);
        let now = Instant::now();
        app.set_status(StatusMessage::sticky(StatusKind::Success, "✅ All records received"), now);
        app.tick(now + Duration::from_secs(3600));
        assert!(app.status.is_some());
    }

    #[test]
    fn live_indicator_hides_after_delay() {
        let mut app = app(FilterMode::Client);
        let now = Instant::now();
        app.handle_poll_event(
            PollEvent::LiveIndicator {
                visible: true,
                delay: Duration::ZERO,
            },
            now,
        );
        assert!(app.live.visible);

        app.handle_poll_event(
            PollEvent::LiveIndicator {
                visible: false,
                delay: Duration::from_secs(3),
            },
            now,
        );
        app.tick(now + Duration::from_secs(2));
        assert!(app.live.visible);
        app.tick(now + Duration::from_secs(3));
        assert!(!app.live.visible);
    }

    #[test]
    fn callee_sort_shows_advisory_in_status() {
        let mut app = app(FilterMode::Client);
        let now = Instant::now();
        app.handle_poll_event(PollEvent::Render(records()), now);

        let action = app.filters.select(FilterSelection::FilterBy(Some(SortKey::Bnum)));
        assert_eq!(app.apply_filter_action(action, now), None);

        assert_eq!(app.row_count(), 2);
        assert_eq!(app.full_data.len(), 3);
        let status = app.status.as_ref().unwrap();
        assert!(status.expires_at.is_some());
    }

    #[test]
    fn server_view_does_not_replace_full_data() {
        let mut app = app(FilterMode::Server);
        let now = Instant::now();
        app.handle_poll_event(PollEvent::Render(records()), now);

        let action = app
            .filters
            .select(FilterSelection::ServiceType(Some(ServiceType::Sms)));
        let query = app.apply_filter_action(action, now).unwrap();

        let seq = app.begin_requery();
        app.handle_requery(seq, query, Ok(vec![cdr(3, "SMS", Some("0790"))]), now);
        assert_eq!(app.row_count(), 1);
        assert_eq!(app.full_data.len(), 3);

        // New poll data refreshes the active view through the backend
        let refresh = app.handle_poll_event(PollEvent::Render(records()), now);
        assert_eq!(refresh, Some(app.filters.query()));

        // Clearing the selector drops the view
        let action = app.filters.select(FilterSelection::ServiceType(None));
        app.apply_filter_action(action, now);
        assert!(app.view_data.is_none());
        assert_eq!(app.row_count(), 3);
    }

    #[test]
    fn outdated_requery_result_is_dropped() {
        let mut app = app(FilterMode::Server);
        let now = Instant::now();
        let stale = FilteredQuery {
            sort: Some(SortKey::Usage),
            service_type: None,
        };
        let seq = app.begin_requery();
        app.handle_requery(seq, stale, Ok(vec![cdr(1, "CALL", None)]), now);
        assert!(app.view_data.is_none());
    }

    #[test]
    fn slow_requery_does_not_overwrite_newer_result() {
        let mut app = app(FilterMode::Server);
        let now = Instant::now();
        app.handle_poll_event(PollEvent::Render(records()), now);

        let action = app
            .filters
            .select(FilterSelection::ServiceType(Some(ServiceType::Call)));
        let query = app.apply_filter_action(action, now).unwrap();
        let first = app.begin_requery();

        // Each poll repeats the identical query while the view is active
        let repeat = app.handle_poll_event(PollEvent::Render(records()), now).unwrap();
        assert_eq!(repeat, query);
        let second = app.begin_requery();

        let newer = vec![cdr(1, "CALL", None), cdr(4, "CALL", Some("0791"))];
        app.handle_requery(second, repeat, Ok(newer), now);
        assert_eq!(app.row_count(), 2);

        app.handle_requery(first, query.clone(), Ok(vec![cdr(1, "CALL", None)]), now);
        assert_eq!(app.row_count(), 2);

        // A later answer still lands
        let third = app.begin_requery();
        app.handle_requery(third, query, Ok(vec![cdr(1, "CALL", None)]), now);
        assert_eq!(app.row_count(), 1);
    }

    #[test]
    fn failed_requery_reports_error() {
        let mut app = app(FilterMode::Server);
        let now = Instant::now();
        let action = app
            .filters
            .select(FilterSelection::FilterBy(Some(SortKey::Anum)));
        let query = app.apply_filter_action(action, now).unwrap();

        let seq = app.begin_requery();
        app.handle_requery(seq, query, Err(FetchError::Transport("timeout".to_string())), now);
        assert_eq!(app.status.as_ref().unwrap().message.kind, StatusKind::Error);
    }

    #[test]
    fn keys_drive_selectors() {
        let mut app = app(FilterMode::Client);
        let now = Instant::now();
        app.handle_poll_event(PollEvent::Render(records()), now);

        assert_eq!(app.handle_key(KeyCode::Char('s'), now), None);
        assert_eq!(app.filters.options().service_type, Some(ServiceType::Call));
        assert_eq!(app.row_count(), 1);

        app.handle_key(KeyCode::Char('r'), now);
        assert_eq!(app.row_count(), 3);
        assert!(app.toast.is_some());

        app.handle_key(KeyCode::Down, now);
        app.handle_key(KeyCode::PageDown, now);
        assert_eq!(app.table_offset, 2);
        app.handle_key(KeyCode::Home, now);
        assert_eq!(app.table_offset, 0);
    }

    #[test]
    fn server_mode_keys_return_query() {
        let mut app = app(FilterMode::Server);
        let now = Instant::now();
        let query = app.handle_key(KeyCode::Char('f'), now).unwrap();
        assert_eq!(query.sort, Some(SortKey::Anum));

        // Date never goes to the backend
        assert_eq!(app.handle_key(KeyCode::Char('d'), now), None);
    }

    #[test]
    fn logout_key_sets_exit() {
        let mut app = app(FilterMode::Client);
        app.handle_key(KeyCode::Char('L'), Instant::now());
        assert_eq!(app.exit, Some(Exit::Logout));
        assert!(app.should_quit());
    }

    #[test]
    fn action_keys_are_debounced() {
        let mut app = app(FilterMode::Client);
        let now = Instant::now();
        assert!(!app.should_debounce_action(now));
        assert!(app.should_debounce_action(now + Duration::from_millis(50)));
        assert!(!app.should_debounce_action(now + Duration::from_millis(200)));
    }
}

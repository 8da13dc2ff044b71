// TUI module - Terminal User Interface
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - Event loop (keyboard input, timer ticks, poll events)
// - Server-side filter requests, run off the event loop
// - Rendering the UI

pub mod app;
pub mod components;
pub mod layout;
pub mod theme;
pub mod ui;

use crate::api::{CdrFeed, FetchError, FilteredQuery};
use crate::auth::TokenSource;
use crate::model::Cdr;
use crate::poller::PollEvent;
use anyhow::{Context, Result};
use app::App;
pub use app::Exit;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Sequence number, the query sent and the backend's answer
type RequeryResult = (u64, FilteredQuery, Result<Vec<Cdr>, FetchError>);

/// Backend access for server-side filtering
#[derive(Clone)]
pub struct FilterBackend {
    pub feed: Arc<dyn CdrFeed>,
    pub tokens: Arc<dyn TokenSource>,
}

impl FilterBackend {
    /// Run `query` in the background and send its result, tagged `seq`, to `tx`
    fn spawn_requery(&self, seq: u64, query: FilteredQuery, tx: mpsc::Sender<RequeryResult>) {
        let backend = self.clone();
        tokio::spawn(async move {
            let result = match backend.tokens.current_token() {
                Ok(token) => backend.feed.fetch_filtered(&token, &query).await,
                Err(e) => Err(e.into()),
            };
            if tx.send((seq, query, result)).await.is_err() {
                tracing::debug!("Dashboard closed before filtered result arrived");
            }
        });
    }
}

/// Run the TUI
///
/// Sets up the terminal, runs the event loop and restores the terminal when
/// done, even if the loop failed.
pub async fn run_tui(
    mut poll_rx: mpsc::Receiver<PollEvent>,
    mut app: App,
    backend: FilterBackend,
) -> Result<Exit> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;

    let result = run_event_loop(&mut terminal, &mut app, &mut poll_rx, &backend).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Main event loop
///
/// Waits on four sources and redraws after each:
/// 1. Keyboard input
/// 2. Timer ticks (status expiry, indicator delay, row highlights)
/// 3. Poll events
/// 4. Results of server-side filter requests
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    poll_rx: &mut mpsc::Receiver<PollEvent>,
    backend: &FilterBackend,
) -> Result<Exit> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(200));
    let (requery_tx, mut requery_rx) = mpsc::channel::<RequeryResult>(16);
    let mut poll_open = true;

    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .context("Failed to draw terminal")?;

        let query = tokio::select! {
            key = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(key.code),
                        _ => None,
                    }
                } else {
                    None
                }
            } => key.and_then(|code| app.handle_key(code, Instant::now())),

            _ = tick_interval.tick() => {
                app.tick(Instant::now());
                None
            }

            event = poll_rx.recv(), if poll_open => match event {
                Some(event) => app.handle_poll_event(event, Instant::now()),
                None => {
                    poll_open = false;
                    None
                }
            },

            Some((seq, query, result)) = requery_rx.recv() => {
                app.handle_requery(seq, query, result, Instant::now());
                None
            }
        };

        if let Some(query) = query {
            let seq = app.begin_requery();
            backend.spawn_requery(seq, query, requery_tx.clone());
        }

        if let Some(exit) = app.exit {
            return Ok(exit);
        }
    }
}

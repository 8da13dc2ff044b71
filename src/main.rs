// CDR Dashboard - live terminal dashboard for call detail records
//
// Authenticates against the identity provider, polls the CDR backend and
// renders the records as a table plus per-category charts.
//
// Architecture:
// - Config: file + env, plus the bootstrap document naming the endpoints
// - Auth: cached token, interactive login with refresh, or signup
// - Poller: BUILDING -> LIVE -> STOPPED state machine on a fixed interval
// - Dashboard: reconciles each collection into table rows and chart datasets
// - TUI (ratatui): draws the dashboard; headless mode logs instead
// - Event system: an mpsc channel connects the poller to the dashboard

mod api;
mod auth;
mod cli;
mod config;
mod dashboard;
mod filter;
mod logging;
mod model;
mod poller;
mod signup;
mod startup;
mod storage;
mod tui;

use anyhow::{Context, Result};
use api::{BackendClient, CdrFeed};
use auth::{CachedToken, IdentityProvider, InteractiveSession, StoredSession, TokenSource};
use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, Endpoints};
use dashboard::{LogSink, Reconciler, RenderOptions};
use logging::LogBuffer;
use poller::{CancelHandle, PollEvent, PollTiming, Poller};
use signup::{ConsoleView, SignupFlow, SignupOutcome};
use startup::StartupRegistry;
use std::sync::{Arc, Mutex, PoisonError};
use storage::SessionStore;
use tokio::sync::mpsc;

/// Poll events buffered between the poller and the dashboard
const EVENT_CHANNEL_SIZE: usize = 1000;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands never need the network
    if let Some(Commands::Config {
        show,
        reset,
        edit,
        path,
    }) = &cli.command
    {
        return cli::handle_config(*show, *reset, *edit, *path);
    }

    Config::ensure_config_exists();

    let mut config = Config::from_env()?;
    if cli.no_tui {
        config.enable_tui = false;
    }

    let log_buffer = LogBuffer::new();
    let _file_guard = logging::init(&config.logging, config.enable_tui, &log_buffer);

    let mut store = SessionStore::open_default()?;

    if let Some(Commands::Logout) = &cli.command {
        store.clear_tokens()?;
        println!("Logged out; stored tokens removed from {}", store.path().display());
        return Ok(());
    }

    let mut registry = StartupRegistry::from_config(&config);

    let endpoints = match load_endpoints(&config).await {
        Ok(endpoints) => {
            registry.activate("bootstrap");
            endpoints
        }
        Err(e) => {
            registry.fail("bootstrap", e.to_string());
            tracing::error!("Failed to load bootstrap configuration: {:#}", e);
            report_startup(&config, &registry, None);
            return Err(e);
        }
    };

    let backend = Arc::new(
        BackendClient::new(&endpoints.backend_url, config.request_timeout)
            .context("Failed to create backend client")?,
    );

    if let Some(Commands::Signup { username, password }) = &cli.command {
        run_signup(&backend, &mut store, username.clone(), password.clone()).await?;
    }

    // Stops background work (token refresh) on exit
    let shutdown = CancelHandle::new();
    let store = Arc::new(Mutex::new(store));

    let tokens = match authenticate(&cli, &config, &endpoints, &store, &shutdown).await {
        Ok(tokens) => {
            registry.activate("auth");
            tokens
        }
        Err(e) => {
            registry.fail("auth", e.to_string());
            tracing::error!("Authentication failed: {:#}", e);
            report_startup(&config, &registry, Some(endpoints.backend_url.as_str()));
            return Err(e);
        }
    };
    let user = tokens.display_name();

    let feed: Arc<dyn CdrFeed> = backend.clone();
    let (event_tx, mut event_rx) = mpsc::channel::<PollEvent>(EVENT_CHANNEL_SIZE);
    let timer = CancelHandle::new();
    let timing = PollTiming {
        interval: config.poll_interval,
        ..PollTiming::default()
    };
    let poller = Poller::new(feed.clone(), tokens.clone(), event_tx, timer.clone(), timing);
    let poll_handle = tokio::spawn(poller::run(poller));
    registry.activate("poller");

    if config.enable_tui {
        registry.activate("tui");
    }
    if config.logging.file_enabled {
        registry.activate("log-file");
    }

    report_startup(&config, &registry, Some(endpoints.backend_url.as_str()));

    let exit = if config.enable_tui {
        tracing::info!("Starting TUI");
        let app = tui::app::App::new(config.filter_mode, user, log_buffer);
        let filter_backend = tui::FilterBackend { feed, tokens };
        match tui::run_tui(event_rx, app, filter_backend).await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!("TUI error: {:?}", e);
                tui::Exit::Quit
            }
        }
    } else {
        tracing::info!("TUI disabled, running in headless mode");
        run_headless(&mut event_rx).await;
        tui::Exit::Quit
    };

    tracing::info!("Shutting down...");

    timer.cancel();
    shutdown.cancel();
    match poll_handle.await {
        Ok(state) => tracing::debug!("Poller finished in {:?}", state.phase()),
        Err(e) => tracing::warn!("Poller task failed: {}", e),
    }

    if exit == tui::Exit::Logout {
        store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear_tokens()?;
        tracing::info!("Logged out");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Banner on stdout plus the same summary in the log
fn report_startup(config: &Config, registry: &StartupRegistry, backend: Option<&str>) {
    startup::print_startup(config, registry, backend);
    startup::log_startup(registry, backend);
}

async fn load_endpoints(config: &Config) -> Result<Endpoints> {
    let source = config.bootstrap_source()?;
    tracing::info!("Loading endpoints from {}", source);
    let endpoints = source.load(config.request_timeout).await?;
    tracing::info!(
        "Realm {} at {}, backend {}",
        endpoints.realm,
        endpoints.auth_url,
        endpoints.backend_url
    );
    Ok(endpoints)
}

/// Keep asking until the backend accepts a registration
async fn run_signup(
    backend: &BackendClient,
    store: &mut SessionStore,
    mut username: Option<String>,
    mut password: Option<String>,
) -> Result<()> {
    let mut view = ConsoleView;
    loop {
        let user = cli::value_or_prompt(username.take(), "Username: ")?;
        let pass = cli::value_or_prompt(password.take(), "Password: ")?;

        let outcome = SignupFlow::new(backend, store)
            .submit(&user, &pass, &mut view)
            .await;
        match outcome {
            SignupOutcome::Registered => return Ok(()),
            SignupOutcome::Rejected(_) | SignupOutcome::Failed(_) => {
                eprintln!("Try again (Ctrl+C to abort).");
            }
        }
    }
}

/// Pick the token source for this run
///
/// An unexpired stored token is reused unless `--login` asks for a fresh
/// session. An expired one is replaced through the stored refresh token, and
/// only when that fails does the user log in. Sessions holding a refresh token
/// are refreshed in the background and every new pair is written back to the
/// store.
async fn authenticate(
    cli: &Cli,
    config: &Config,
    endpoints: &Endpoints,
    store: &Arc<Mutex<SessionStore>>,
    shutdown: &CancelHandle,
) -> Result<Arc<dyn TokenSource>> {
    let stored = if cli.login {
        StoredSession::Login
    } else {
        StoredSession::from_store(&store.lock().unwrap_or_else(PoisonError::into_inner))
    };

    let provider = IdentityProvider::new(endpoints, config.request_timeout)?;

    let session = match stored {
        StoredSession::Current(tokens) if tokens.refresh_token.is_none() => {
            tracing::info!("Using stored access token");
            return Ok(Arc::new(CachedToken::new(tokens.access_token)));
        }
        StoredSession::Current(tokens) => {
            tracing::info!("Using stored session");
            InteractiveSession::new(tokens)
        }
        StoredSession::Refresh(refresh_token) => {
            match InteractiveSession::resume(&provider, &refresh_token).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!("Stored session could not be resumed: {}", e);
                    login(&provider).await?
                }
            }
        }
        StoredSession::Login => login(&provider).await?,
    };

    store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .persist_tokens(&session.tokens())?;

    let refresh_store = store.clone();
    session.spawn_refresher(provider, shutdown.clone(), move |tokens| {
        let mut store = refresh_store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = store.persist_tokens(tokens) {
            tracing::warn!("Could not store refreshed tokens: {:#}", e);
        }
    });

    Ok(Arc::new(session))
}

async fn login(provider: &IdentityProvider) -> Result<InteractiveSession> {
    let username = cli::prompt("Username: ")?;
    let password = cli::prompt("Password: ")?;
    Ok(InteractiveSession::login(provider, &username, &password).await?)
}

/// Headless mode: reconcile into a logging sink until polling stops
async fn run_headless(event_rx: &mut mpsc::Receiver<PollEvent>) {
    let mut reconciler = Reconciler::new(LogSink);
    let options = RenderOptions::default();

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(PollEvent::Render(records)) => {
                    let report = reconciler.render(&records, &options);
                    tracing::info!(
                        "{} records ({} new) | {}",
                        report.rows,
                        report.new_rows,
                        reconciler.labels().join(" | ")
                    );
                }
                Some(PollEvent::Status(status)) => tracing::info!("{}", status.text),
                Some(PollEvent::LastUpdated(at)) => {
                    tracing::debug!("Last updated {}", at.format("%H:%M:%S"))
                }
                Some(PollEvent::LiveIndicator { visible, .. }) => {
                    tracing::debug!("Live indicator {}", if visible { "on" } else { "off" })
                }
                Some(PollEvent::Stopped) | None => {
                    tracing::info!("Polling stopped");
                    return;
                }
            },
            _ = tokio::signal::ctrl_c() => return,
        }
    }
}

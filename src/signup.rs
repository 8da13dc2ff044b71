// Signup flow
//
// One-shot credential exchange against the backend's signup endpoint. On
// success the returned tokens are persisted so the dashboard starts with a
// cached session and skips the login prompt. Nothing here touches polling.

use crate::auth::TokenPair;
use crate::storage::SessionStore;
use async_trait::async_trait;
use std::time::Duration;

pub const PLEASE_WAIT: &str = "ℹ️ Please wait...";
pub const SIGNUP_OK: &str = "✅ Signup successful!";
pub const REDIRECT_MESSAGE: &str = "Created user, skipping login, redirecting to CDRs";

/// Why the backend did not create the user
#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    /// Server refused; the text is its own explanation
    #[error("{0}")]
    Rejected(String),
    /// Request never got an answer
    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait SignupBackend: Send + Sync {
    async fn register(&self, username: &str, password: &str) -> Result<TokenPair, SignupError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Error,
}

/// Where the flow reports progress
pub trait SignupView {
    /// Replace the message line
    fn show(&mut self, text: &str, kind: MessageKind);

    /// Draw one frame of the redirect label
    fn redirect_frame(&mut self, text: &str);
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// User created and tokens stored
    Registered,
    /// Server refused with this text; the form can be retried
    Rejected(String),
    /// Could not complete the request; the form can be retried
    Failed(String),
}

/// Animated "redirecting" label
#[derive(Debug, Clone, Copy)]
pub struct RedirectAnimation {
    pub frame_interval: Duration,
    pub duration: Duration,
}

impl Default for RedirectAnimation {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(300),
            duration: Duration::from_secs(3),
        }
    }
}

impl RedirectAnimation {
    /// Label for the given frame counter; dots cycle through 0..=3
    pub fn frame(counter: usize) -> String {
        format!("{}{}", REDIRECT_MESSAGE, ".".repeat(counter % 4))
    }

    /// Draw frames until the duration has elapsed; returns the frame count
    ///
    /// The first frame is drawn one interval after the start.
    pub async fn play(&self, view: &mut dyn SignupView) -> usize {
        let start = tokio::time::Instant::now();
        let deadline = start + self.duration;
        let mut interval =
            tokio::time::interval_at(start + self.frame_interval, self.frame_interval);

        let mut counter = 0;
        loop {
            let at = interval.tick().await;
            if at >= deadline {
                break;
            }
            view.redirect_frame(&Self::frame(counter));
            counter += 1;
        }
        tokio::time::sleep_until(deadline).await;
        counter
    }
}

pub struct SignupFlow<'a> {
    backend: &'a dyn SignupBackend,
    store: &'a mut SessionStore,
    animation: RedirectAnimation,
}

impl<'a> SignupFlow<'a> {
    pub fn new(backend: &'a dyn SignupBackend, store: &'a mut SessionStore) -> Self {
        Self {
            backend,
            store,
            animation: RedirectAnimation::default(),
        }
    }

    pub fn with_animation(mut self, animation: RedirectAnimation) -> Self {
        self.animation = animation;
        self
    }

    /// Submit the form once
    pub async fn submit(
        &mut self,
        username: &str,
        password: &str,
        view: &mut dyn SignupView,
    ) -> SignupOutcome {
        let username = username.trim();
        let password = password.trim();

        view.show(PLEASE_WAIT, MessageKind::Info);

        let tokens = match self.backend.register(username, password).await {
            Ok(tokens) => tokens,
            Err(SignupError::Rejected(text)) => {
                tracing::info!("Signup for {} rejected: {}", username, text);
                view.show(&text, MessageKind::Error);
                return SignupOutcome::Rejected(text);
            }
            Err(SignupError::Transport(error)) => {
                tracing::warn!("Signup request failed: {}", error);
                let text = format!("❌ Signup failed: {}", error);
                view.show(&text, MessageKind::Error);
                return SignupOutcome::Failed(text);
            }
        };

        if let Err(e) = self.store.persist_tokens(&tokens) {
            tracing::error!("Could not store signup tokens: {:#}", e);
            let text = format!("❌ Signup failed: {:#}", e);
            view.show(&text, MessageKind::Error);
            return SignupOutcome::Failed(text);
        }

        tracing::info!("Created user {}", username);
        view.show(SIGNUP_OK, MessageKind::Success);
        self.animation.play(view).await;
        SignupOutcome::Registered
    }
}

/// Terminal view: messages and frames go to stdout
#[derive(Debug, Default)]
pub struct ConsoleView;

impl SignupView for ConsoleView {
    fn show(&mut self, text: &str, _kind: MessageKind) {
        println!("{}", text);
    }

    fn redirect_frame(&mut self, text: &str) {
        use std::io::Write;
        // Redraw in place; pad so a shorter frame wipes the previous dots
        print!("\r{:<width$}", text, width = REDIRECT_MESSAGE.len() + 3);
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{REFRESH_KEY, TOKEN_KEY};
    use std::sync::Mutex;

    struct FakeBackend {
        answer: Mutex<Option<Result<TokenPair, SignupError>>>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FakeBackend {
        fn answering(answer: Result<TokenPair, SignupError>) -> Self {
            Self {
                answer: Mutex::new(Some(answer)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SignupBackend for FakeBackend {
        async fn register(&self, username: &str, password: &str) -> Result<TokenPair, SignupError> {
            self.seen
                .lock()
                .unwrap()
                .push((username.to_string(), password.to_string()));
            self.answer
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(SignupError::Transport("no answer".to_string())))
        }
    }

    #[derive(Default)]
    struct RecordingView {
        messages: Vec<(String, MessageKind)>,
        frames: Vec<String>,
    }

    impl SignupView for RecordingView {
        fn show(&mut self, text: &str, kind: MessageKind) {
            self.messages.push((text.to_string(), kind));
        }

        fn redirect_frame(&mut self, text: &str) {
            self.frames.push(text.to_string());
        }
    }

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();
        (dir, store)
    }

    #[tokio::test(start_paused = true)]
    async fn success_persists_tokens_and_animates() {
        let backend = FakeBackend::answering(Ok(TokenPair {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
        }));
        let (_dir, mut store) = store();
        let mut view = RecordingView::default();

        let outcome = SignupFlow::new(&backend, &mut store)
            .submit("  alice ", " secret  ", &mut view)
            .await;

        assert_eq!(outcome, SignupOutcome::Registered);
        assert_eq!(
            *backend.seen.lock().unwrap(),
            vec![("alice".to_string(), "secret".to_string())]
        );
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("access"));
        assert_eq!(store.get(REFRESH_KEY).as_deref(), Some("refresh"));

        let texts: Vec<&str> = view.messages.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec![PLEASE_WAIT, SIGNUP_OK]);

        // Frames at 300ms steps before the 3s cutoff
        assert_eq!(view.frames.len(), 9);
        assert_eq!(view.frames[0], REDIRECT_MESSAGE);
        assert_eq!(view.frames[3], format!("{}...", REDIRECT_MESSAGE));
        assert_eq!(view.frames[4], REDIRECT_MESSAGE);
    }

    #[tokio::test]
    async fn rejection_shows_server_text_verbatim() {
        let backend =
            FakeBackend::answering(Err(SignupError::Rejected("User already exists".to_string())));
        let (_dir, mut store) = store();
        let mut view = RecordingView::default();

        let outcome = SignupFlow::new(&backend, &mut store)
            .submit("bob", "pw", &mut view)
            .await;

        assert_eq!(outcome, SignupOutcome::Rejected("User already exists".to_string()));
        assert_eq!(
            view.messages.last(),
            Some(&("User already exists".to_string(), MessageKind::Error))
        );
        assert!(view.frames.is_empty());
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn transport_failure_gets_generic_prefix() {
        let backend =
            FakeBackend::answering(Err(SignupError::Transport("connection refused".to_string())));
        let (_dir, mut store) = store();
        let mut view = RecordingView::default();

        let mut flow = SignupFlow::new(&backend, &mut store);
        let outcome = flow.submit("bob", "pw", &mut view).await;

        assert_eq!(
            outcome,
            SignupOutcome::Failed("❌ Signup failed: connection refused".to_string())
        );

        // Form stays usable: a second attempt reaches the backend again
        flow.submit("bob", "pw", &mut view).await;
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn frames_cycle_dots() {
        let frames: Vec<String> = (0..5).map(RedirectAnimation::frame).collect();
        assert!(frames[0].ends_with("CDRs"));
        assert!(frames[2].ends_with("CDRs.."));
        assert_eq!(frames[4], frames[0]);
    }
}

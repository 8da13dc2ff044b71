//! Token sources for authenticated backend calls
//!
//! The poller only needs "the bearer token right now". Two variants supply it:
//!
//! ```text
//! TokenSource trait
//! ├── CachedToken        (token persisted by a previous session or signup)
//! └── InteractiveSession (login against the identity provider, refreshed
//!                         in the background)
//! ```
//!
//! Neither variant verifies signatures. Claims are decoded only to show who
//! is logged in.

mod cached;
mod jwt;
mod session;

pub use cached::{CachedToken, StoredSession};
pub use jwt::Claims;
pub use session::{IdentityProvider, InteractiveSession};

use serde::{Deserialize, Serialize};

/// Refresh (or stop trusting) an access token this long before it expires
pub(crate) const REFRESH_MARGIN_SECS: i64 = 30;

/// Errors from the token sources and the identity provider
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable token; the user has to log in
    #[error("interactive login required")]
    LoginRequired,
    /// Identity provider answered with a non-2xx status
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// Identity provider could not be reached
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("malformed token: {0}")]
    MalformedToken(String),
}

/// Access/refresh pair as returned by signup and the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Supplies the bearer token for each request
///
/// Implementations must return the freshest token on every call; callers
/// never cache the result across ticks.
pub trait TokenSource: Send + Sync {
    /// Current bearer token, or `LoginRequired` when there is none
    fn current_token(&self) -> Result<String, AuthError>;

    /// Name shown in the title bar
    fn display_name(&self) -> Option<String>;
}

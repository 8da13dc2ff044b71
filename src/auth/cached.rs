// Cached token variant
//
// Reads the tokens a previous login or signup left in the session store. An
// access token whose `exp` has passed (or falls inside the refresh margin) is
// not used; the stored refresh token resumes the session instead, and with
// neither the user logs in again.

use super::{AuthError, Claims, TokenPair, TokenSource, REFRESH_MARGIN_SECS};
use crate::storage::{SessionStore, REFRESH_KEY, TOKEN_KEY};

#[derive(Debug, Clone)]
pub struct CachedToken {
    token: String,
    claims: Option<Claims>,
}

impl CachedToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        // Opaque tokens are fine, they just have no display name
        let claims = Claims::decode(&token).ok();
        Self { token, claims }
    }

    /// Load `cdr-token` from the store, if one was persisted and is unexpired
    pub fn from_store_at(store: &SessionStore, now_epoch: i64) -> Option<Self> {
        let cached = store
            .get(TOKEN_KEY)
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)?;
        if cached.is_expired_at(now_epoch) {
            tracing::debug!("Stored access token has expired");
            return None;
        }
        Some(cached)
    }

    /// Tokens without an `exp` claim are treated as valid
    fn is_expired_at(&self, now_epoch: i64) -> bool {
        self.claims
            .as_ref()
            .is_some_and(|c| c.expires_within(now_epoch, REFRESH_MARGIN_SECS))
    }
}

impl TokenSource for CachedToken {
    fn current_token(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::LoginRequired);
        }
        Ok(self.token.clone())
    }

    fn display_name(&self) -> Option<String> {
        self.claims.as_ref().and_then(Claims::display_name)
    }
}

/// What the session store allows at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    /// Unexpired access token, with the refresh token when one was stored
    Current(TokenPair),
    /// Access token missing or expired, refresh token still present
    Refresh(String),
    /// Nothing usable
    Login,
}

impl StoredSession {
    pub fn from_store(store: &SessionStore) -> Self {
        Self::from_store_at(store, chrono::Utc::now().timestamp())
    }

    pub fn from_store_at(store: &SessionStore, now_epoch: i64) -> Self {
        let refresh_token = store.get(REFRESH_KEY).filter(|t| !t.trim().is_empty());

        match (CachedToken::from_store_at(store, now_epoch), refresh_token) {
            (Some(cached), refresh_token) => StoredSession::Current(TokenPair {
                access_token: cached.token,
                refresh_token,
            }),
            (None, Some(refresh_token)) => StoredSession::Refresh(refresh_token),
            (None, None) => StoredSession::Login,
        }
    }
}

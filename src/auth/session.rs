// Interactive session variant
//
// A terminal login against the identity provider's OpenID Connect token
// endpoint stands in for the browser redirect flow. The resulting access
// token lives behind a lock so the background refresher can swap it while
// the poller keeps reading it fresh on every tick.

use super::{AuthError, Claims, TokenPair, TokenSource, REFRESH_MARGIN_SECS};
use crate::config::Endpoints;
use crate::poller::CancelHandle;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Never refresh more often than this, even for very short-lived tokens
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Delay before retrying a failed refresh
const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Client for the identity provider's token endpoint
#[derive(Clone)]
pub struct IdentityProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
}

impl IdentityProvider {
    pub fn new(endpoints: &Endpoints, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: Self::token_url(&endpoints.auth_url, &endpoints.realm),
            client_id: endpoints.client_id.clone(),
        })
    }

    /// `{auth}/realms/{realm}/protocol/openid-connect/token`
    pub fn token_url(auth_url: &str, realm: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            auth_url.trim_end_matches('/'),
            realm
        )
    }

    /// Exchange username and password for tokens
    pub async fn password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, AuthError> {
        self.request(&[
            ("grant_type", "password"),
            ("client_id", &self.client_id),
            ("username", username),
            ("password", password),
        ])
        .await
    }

    /// Exchange a refresh token for a new pair
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.request(&[
            ("grant_type", "refresh_token"),
            ("client_id", &self.client_id),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn request(&self, form: &[(&str, &str)]) -> Result<TokenPair, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| AuthError::MalformedToken(format!("Failed to parse token response: {}", e)))
    }
}

/// Token source backed by a live identity provider session
#[derive(Clone)]
pub struct InteractiveSession {
    tokens: Arc<RwLock<TokenPair>>,
}

impl InteractiveSession {
    pub fn new(tokens: TokenPair) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(tokens)),
        }
    }

    /// Log in with credentials collected from the terminal
    pub async fn login(
        provider: &IdentityProvider,
        username: &str,
        password: &str,
    ) -> Result<Self, AuthError> {
        let tokens = provider.password_grant(username, password).await?;
        tracing::info!("Logged in as {}", username);
        Ok(Self::new(tokens))
    }

    /// Resume a stored session by redeeming its refresh token
    ///
    /// Providers may omit a new refresh token; the old one is kept then.
    pub async fn resume(
        provider: &IdentityProvider,
        refresh_token: &str,
    ) -> Result<Self, AuthError> {
        let mut tokens = provider.refresh_grant(refresh_token).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        tracing::info!("Resumed stored session");
        Ok(Self::new(tokens))
    }

    /// Snapshot of the current pair
    pub fn tokens(&self) -> TokenPair {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a refreshed pair
    pub fn replace(&self, tokens: TokenPair) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
    }

    /// Seconds until the access token should be refreshed, if it carries `exp`
    fn refresh_delay(&self, now_epoch: i64) -> Option<Duration> {
        let exp = Claims::decode(&self.tokens().access_token).ok()?.exp?;
        let secs = (exp - REFRESH_MARGIN_SECS - now_epoch).max(0) as u64;
        Some(Duration::from_secs(secs).max(MIN_REFRESH_DELAY))
    }

    /// Keep the access token fresh until `cancel` fires
    ///
    /// `on_refresh` runs after every successful refresh (used to persist the
    /// new pair). Sessions without a refresh token or an `exp` claim are left
    /// alone.
    pub fn spawn_refresher<F>(
        &self,
        provider: IdentityProvider,
        cancel: CancelHandle,
        mut on_refresh: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(&TokenPair) + Send + 'static,
    {
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                let Some(mut delay) = session.refresh_delay(chrono::Utc::now().timestamp()) else {
                    tracing::debug!("Access token has no expiry, refresher idle");
                    return;
                };

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }

                    let Some(refresh_token) = session.tokens().refresh_token else {
                        tracing::debug!("No refresh token, refresher idle");
                        return;
                    };

                    match provider.refresh_grant(&refresh_token).await {
                        Ok(tokens) => {
                            session.replace(tokens.clone());
                            on_refresh(&tokens);
                            tracing::debug!("Access token refreshed");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("Token refresh failed: {}", e);
                            delay = REFRESH_RETRY_DELAY;
                        }
                    }
                }
            }
        })
    }
}

impl TokenSource for InteractiveSession {
    fn current_token(&self) -> Result<String, AuthError> {
        let token = self.tokens().access_token;
        if token.is_empty() {
            return Err(AuthError::LoginRequired);
        }
        Ok(token)
    }

    fn display_name(&self) -> Option<String> {
        Claims::decode(&self.tokens().access_token)
            .ok()
            .and_then(|c| c.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::encode_for_test;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one request with `status_line` and a JSON `body`; yields the request text
    async fn serve_once(
        status_line: &'static str,
        body: String,
    ) -> (IdentityProvider, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        let endpoints = Endpoints::from_json(
            &json!({"auth_url": format!("http://{}", addr), "realm": "cdr-realm"}).to_string(),
        )
        .unwrap();
        let provider = IdentityProvider::new(&endpoints, Duration::from_secs(5)).unwrap();
        (provider, handle)
    }

    fn pair(access: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: Some("refresh".to_string()),
        }
    }

    #[test]
    fn token_url_joins_realm() {
        assert_eq!(
            IdentityProvider::token_url("http://localhost:8081/", "cdr-realm"),
            "http://localhost:8081/realms/cdr-realm/protocol/openid-connect/token"
        );
    }

    #[test]
    fn replaced_token_is_visible_on_next_read() {
        let session = InteractiveSession::new(pair("first"));
        assert_eq!(session.current_token().unwrap(), "first");

        let reader = session.clone();
        session.replace(pair("second"));
        assert_eq!(reader.current_token().unwrap(), "second");
    }

    #[test]
    fn refresh_delay_respects_margin_and_floor() {
        let token = encode_for_test(&json!({"exp": 1_000}));
        let session = InteractiveSession::new(pair(&token));

        assert_eq!(session.refresh_delay(870), Some(Duration::from_secs(100)));
        // Already inside the margin: refresh soon, but not in a hot loop
        assert_eq!(session.refresh_delay(990), Some(MIN_REFRESH_DELAY));
    }

    #[test]
    fn opaque_tokens_are_not_refreshed() {
        let session = InteractiveSession::new(pair("opaque"));
        assert_eq!(session.refresh_delay(0), None);
        assert_eq!(session.display_name(), None);
    }

    #[tokio::test]
    async fn resume_redeems_refresh_token() {
        let access = encode_for_test(&json!({"preferred_username": "dave", "exp": 4_000_000_000i64}));
        let body = json!({"access_token": access, "refresh_token": "rotated"}).to_string();
        let (provider, server) = serve_once("HTTP/1.1 200 OK", body).await;

        let session = InteractiveSession::resume(&provider, "stored-refresh")
            .await
            .unwrap();
        assert_eq!(session.current_token().unwrap(), access);
        assert_eq!(session.display_name().as_deref(), Some("dave"));
        assert_eq!(session.tokens().refresh_token.as_deref(), Some("rotated"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /realms/cdr-realm/protocol/openid-connect/token"));
        assert!(request.contains("grant_type=refresh_token"));
        assert!(request.contains("refresh_token=stored-refresh"));
    }

    #[tokio::test]
    async fn resume_keeps_refresh_token_when_not_rotated() {
        let body = json!({"access_token": "fresh"}).to_string();
        let (provider, _server) = serve_once("HTTP/1.1 200 OK", body).await;

        let session = InteractiveSession::resume(&provider, "stored-refresh")
            .await
            .unwrap();
        assert_eq!(session.tokens().refresh_token.as_deref(), Some("stored-refresh"));
    }

    #[tokio::test]
    async fn rejected_refresh_token_is_an_error() {
        let body = json!({"error": "invalid_grant"}).to_string();
        let (provider, _server) = serve_once("HTTP/1.1 400 Bad Request", body).await;

        let err = InteractiveSession::resume(&provider, "revoked")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AuthError::Rejected { status: 400, .. }));
    }
}

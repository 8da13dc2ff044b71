//! Remote bootstrap document
//!
//! Service endpoints are not part of the local config file. They come from a
//! small JSON document served next to the deployment (or a local file), so the
//! same binary works against any environment:
//!
//! ```json
//! {
//!   "auth_url": "http://localhost:8080",
//!   "realm": "cdr-realm",
//!   "client_id": "cdr-frontend",
//!   "backend_url": "http://localhost:8082"
//! }
//! ```
//!
//! The identity provider's own adapter file (`auth-server-url`, `resource`)
//! is accepted as well.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Errors loading configuration; all of them abort startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no bootstrap location configured (set `bootstrap` in the config file or CDR_DASH_BOOTSTRAP)")]
    MissingBootstrap,
    #[error("failed to fetch bootstrap config from {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid bootstrap config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config file {}: {message}", path.display())]
    File { path: PathBuf, message: String },
    #[error("bootstrap config has an empty `{0}`")]
    EmptyField(&'static str),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Service endpoints for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoints {
    /// Identity provider base URL
    #[serde(alias = "auth-server-url")]
    pub auth_url: String,
    pub realm: String,
    #[serde(alias = "resource", default = "default_client_id")]
    pub client_id: String,
    #[serde(alias = "backend", default = "default_backend_url")]
    pub backend_url: String,
}

fn default_client_id() -> String {
    "cdr-frontend".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:8082".to_string()
}

impl Endpoints {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let endpoints: Self = serde_json::from_str(json)?;
        endpoints.validate()?;
        Ok(endpoints)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_url.trim().is_empty() {
            return Err(ConfigError::EmptyField("auth_url"));
        }
        if self.realm.trim().is_empty() {
            return Err(ConfigError::EmptyField("realm"));
        }
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::EmptyField("backend_url"));
        }
        Ok(())
    }
}

/// Where the bootstrap document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapSource {
    Url(String),
    File(PathBuf),
}

impl BootstrapSource {
    pub fn parse(location: &str) -> Option<Self> {
        let location = location.trim();
        if location.is_empty() {
            None
        } else if location.starts_with("http://") || location.starts_with("https://") {
            Some(Self::Url(location.to_string()))
        } else {
            Some(Self::File(PathBuf::from(location)))
        }
    }

    /// Fetch and parse the document
    pub async fn load(&self, timeout: Duration) -> Result<Endpoints, ConfigError> {
        let json = match self {
            Self::Url(url) => fetch(url, timeout).await?,
            Self::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?
            }
        };
        Endpoints::from_json(&json)
    }
}

impl std::fmt::Display for BootstrapSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

async fn fetch(url: &str, timeout: Duration) -> Result<String, ConfigError> {
    let fail = |reason: String| ConfigError::Fetch {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fail(format!("HTTP {}", status)));
    }

    response.text().await.map_err(|e| fail(e.to_string()))
}

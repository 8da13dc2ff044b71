//! Backend API contracts
//!
//! ```text
//! GET  {backend}/api/cdrs                                  -> [Cdr]
//! GET  {backend}/api/cdrs/filtered?sort=..&serviceType=..  -> [Cdr]
//! POST {backend}/api/signup {username, password}           -> TokenPair | text
//! ```
//!
//! An empty array from `/api/cdrs` is a meaningful answer (nothing loaded yet,
//! or everything already delivered) and must never be confused with a
//! failed request.

mod client;

pub use client::BackendClient;

use crate::auth::AuthError;
use crate::model::{Cdr, ServiceType, SortKey};
use async_trait::async_trait;

/// Why a CDR fetch produced no collection
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No bearer token could be obtained
    #[error("not authenticated: {0}")]
    Auth(#[from] AuthError),
    /// Backend answered with a non-2xx status
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// Request never completed
    #[error("request failed: {0}")]
    Transport(String),
    /// Body was not an array of CDRs
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

/// Query parameters for the server-side filtered endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredQuery {
    pub sort: Option<SortKey>,
    pub service_type: Option<ServiceType>,
}

impl FilteredQuery {
    pub fn is_empty(&self) -> bool {
        self.sort.is_none() && self.service_type.is_none()
    }

    /// Query-string pairs in the backend's parameter names
    pub fn params(&self) -> Vec<(&'static str, &'static str)> {
        let mut params = Vec::with_capacity(2);
        if let Some(sort) = self.sort {
            params.push(("sort", sort.as_param()));
        }
        if let Some(service) = self.service_type {
            params.push(("serviceType", service.as_str()));
        }
        params
    }
}

/// Source of CDR collections
///
/// The poller and the filter controller depend on this seam only, so the
/// state machine can be driven by a scripted feed in tests.
#[async_trait]
pub trait CdrFeed: Send + Sync {
    /// Full collection in server order
    async fn fetch_all(&self, token: &str) -> Result<Vec<Cdr>, FetchError>;

    /// Collection pre-sorted / pre-filtered by the backend
    async fn fetch_filtered(
        &self,
        token: &str,
        query: &FilteredQuery,
    ) -> Result<Vec<Cdr>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_use_backend_names() {
        let query = FilteredQuery {
            sort: Some(SortKey::Bnum),
            service_type: Some(ServiceType::Sms),
        };
        assert_eq!(query.params(), vec![("sort", "bnum"), ("serviceType", "SMS")]);
        assert!(FilteredQuery::default().params().is_empty());
        assert!(FilteredQuery::default().is_empty());
    }

    #[test]
    fn auth_errors_convert() {
        let err: FetchError = AuthError::LoginRequired.into();
        assert!(matches!(err, FetchError::Auth(AuthError::LoginRequired)));
        assert_eq!(err.to_string(), "not authenticated: interactive login required");
    }
}

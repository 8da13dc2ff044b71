//! Unverified JWT payload decoding
//!
//! Only the middle segment is read. The issuer is trusted blindly because the
//! claims are used for display and refresh scheduling, never for access
//! decisions.

use super::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry as seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    /// Decode the payload segment of a compact JWT
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::MalformedToken("missing payload segment".to_string()))?;

        // Some issuers pad their segments; the URL-safe engine here does not accept padding
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedToken(format!("payload is not JSON: {}", e)))
    }

    /// True when `exp` falls within `margin_secs` of `now_epoch` or earlier
    ///
    /// Tokens without `exp` never expire as far as the client can tell.
    pub fn expires_within(&self, now_epoch: i64, margin_secs: i64) -> bool {
        self.exp
            .is_some_and(|exp| exp.saturating_sub(margin_secs) <= now_epoch)
    }

    /// Best human-readable identity in the claims
    pub fn display_name(&self) -> Option<String> {
        self.preferred_username
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| self.sub.clone())
    }
}

#[cfg(test)]
pub(crate) fn encode_for_test(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}

//! Token claims and expiry checks

use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Claims returned alongside a token. Only `exp` is inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn with_exp(exp: i64) -> Self {
        Self { exp: Some(exp) }
    }

    /// Expiry check against the system clock
    pub fn is_expired(&self) -> bool {
        is_token_expired(self, unix_now())
    }
}

/// A token counts as expired once `exp <= now`. Claims without `exp`
/// never expire.
pub fn is_token_expired(claims: &TokenClaims, now: i64) -> bool {
    matches!(claims.exp, Some(exp) if exp <= now)
}

/// Current time in whole seconds since the Unix epoch
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

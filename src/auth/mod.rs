//! Azure AD Authentication module
//!
//! OAuth2 client-credentials grant against the v1 token endpoint, which
//! takes the Dynamics 365 organization URL as `resource`.

pub mod claims;
pub mod oauth_error;

pub use claims::{is_token_expired, unix_now, TokenClaims};
pub use oauth_error::OAuthErrorCode;

use crate::config::Credentials;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Cached tokens are treated as expired this many seconds early
const EXPIRY_SKEW_SECS: i64 = 60;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: token endpoint returned {status}: {body}")]
    TokenRequestFailed {
        status: u16,
        code: Option<OAuthErrorCode>,
        body: String,
    },

    #[error("Authentication failed: token response has no access_token")]
    MissingAccessToken,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Token parse error: {0}")]
    ParseError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl AuthError {
    /// OAuth error code reported by the identity provider, if any
    pub fn oauth_code(&self) -> Option<&OAuthErrorCode> {
        match self {
            AuthError::TokenRequestFailed { code, .. } => code.as_ref(),
            _ => None,
        }
    }
}

/// `expires_in`/`expires_on` arrive as strings from the v1 endpoint
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(i64),
    Text(String),
}

impl Seconds {
    fn value(&self) -> Option<i64> {
        match self {
            Seconds::Number(n) => Some(*n),
            Seconds::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Token response from Azure AD
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Seconds>,
    #[serde(default)]
    expires_on: Option<Seconds>,
    #[serde(default)]
    id_token_claims: Option<TokenClaims>,
}

/// Access token held in memory for the life of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    /// Seconds since the Unix epoch
    pub expires_at: Option<i64>,
    /// Claims block, when the identity provider sent one
    pub id_token_claims: Option<TokenClaims>,
}

impl Token {
    pub fn new(access_token: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            id_token_claims: None,
        }
    }

    /// Claims to run the expiry check against: the provider's claims if
    /// present, otherwise just the computed expiry.
    pub fn claims(&self) -> TokenClaims {
        self.id_token_claims.clone().unwrap_or(TokenClaims {
            exp: self.expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.claims().is_expired()
    }

    /// Best known expiry: the claims' `exp`, else the computed one
    fn known_exp(&self) -> Option<i64> {
        self.id_token_claims
            .as_ref()
            .and_then(|c| c.exp)
            .or(self.expires_at)
    }

    /// Still usable for at least `EXPIRY_SKEW_SECS`
    fn is_fresh(&self) -> bool {
        let claims = TokenClaims {
            exp: self.known_exp(),
        };
        !is_token_expired(&claims, unix_now() + EXPIRY_SKEW_SECS)
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Azure AD authentication helper for client credentials flow
#[derive(Debug)]
pub struct AzureAdAuth {
    credentials: Credentials,
    authority_host: String,
    http_client: Client,
    token_cache: Arc<RwLock<Option<Token>>>,
}

impl AzureAdAuth {
    /// Create a new Azure AD auth helper
    pub fn new(credentials: Credentials, authority_host: impl Into<String>) -> Self {
        Self {
            credentials,
            authority_host: authority_host.into().trim_end_matches('/').to_string(),
            http_client: Client::new(),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Use a preconfigured HTTP client (timeouts and the like)
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Get the token endpoint URL for this tenant
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/token",
            self.authority_host, self.credentials.tenant_id
        )
    }

    /// Resource the token is requested for
    pub fn resource(&self) -> &str {
        &self.credentials.resource_url
    }

    pub fn has_client_credentials(&self) -> bool {
        !self.credentials.client_id.is_empty() && !self.credentials.client_secret.is_empty()
    }

    /// Return the cached token while fresh, otherwise acquire a new one.
    pub async fn get_token(&self) -> Result<Token, AuthError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.is_fresh() {
                    tracing::debug!("Using cached token");
                    return Ok(cached.clone());
                }
            }
        }

        tracing::info!(
            "Acquiring new access token for resource: {}",
            self.resource()
        );
        self.acquire_token().await
    }

    /// Acquire a new token regardless of the cache
    pub async fn refresh_token(&self) -> Result<Token, AuthError> {
        tracing::info!("Forcing token refresh for resource: {}", self.resource());
        self.clear_cache().await;
        self.acquire_token().await
    }

    async fn acquire_token(&self) -> Result<Token, AuthError> {
        let c = &self.credentials;
        if c.client_id.is_empty() || c.client_secret.is_empty() {
            return Err(AuthError::MissingCredentials(
                "client_id and client_secret are required".to_string(),
            ));
        }
        if c.tenant_id.is_empty() {
            return Err(AuthError::MissingCredentials(
                "tenant_id is required".to_string(),
            ));
        }

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", c.client_id.as_str()),
            ("client_secret", c.client_secret.as_str()),
            ("resource", c.resource_url.as_str()),
        ];

        let response = self
            .http_client
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Token request failed: {} - {}", status, body);
            return Err(AuthError::TokenRequestFailed {
                status: status.as_u16(),
                code: OAuthErrorCode::from_body(&body),
                body,
            });
        }

        let token = parse_token_response(&body, unix_now())?;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(token.clone());
        }

        match token.expires_at {
            Some(at) => tracing::info!(
                "Token acquired successfully, expires in {} seconds",
                at - unix_now()
            ),
            None => tracing::info!("Token acquired successfully, no expiry reported"),
        }

        Ok(token)
    }

    /// Clear the token cache
    pub async fn clear_cache(&self) {
        let mut cache = self.token_cache.write().await;
        *cache = None;
    }
}

/// Turn a successful token endpoint body into a [`Token`]
fn parse_token_response(body: &str, now: i64) -> Result<Token, AuthError> {
    let response: TokenResponse = serde_json::from_str(body).map_err(|e| {
        AuthError::ParseError(format!("Failed to parse token response: {}", e))
    })?;

    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingAccessToken)?;

    let expires_in = response.expires_in.as_ref().and_then(Seconds::value);
    let expires_at = response
        .expires_on
        .as_ref()
        .and_then(Seconds::value)
        .or_else(|| expires_in.map(|s| now + s));

    Ok(Token {
        access_token,
        expires_at,
        id_token_claims: response.id_token_claims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            client_id: "client-id".to_string(),
            client_secret: "secret".to_string(),
            tenant_id: "my-tenant".to_string(),
            resource_url: "https://org.crm.dynamics.com".to_string(),
        }
    }

    #[test]
    fn test_token_endpoint() {
        let auth = AzureAdAuth::new(credentials(), "https://login.microsoftonline.com/");
        assert_eq!(
            auth.token_endpoint(),
            "https://login.microsoftonline.com/my-tenant/oauth2/token"
        );
        assert_eq!(auth.resource(), "https://org.crm.dynamics.com");
    }

    #[test]
    fn test_parse_v1_string_fields() {
        let body = r#"{"token_type":"Bearer","expires_in":"3599","expires_on":"1700003599","resource":"https://org.crm.dynamics.com","access_token":"eyJ0"}"#;
        let token = parse_token_response(body, 1_700_000_000).unwrap();
        assert_eq!(token.access_token, "eyJ0");
        assert_eq!(token.expires_at, Some(1_700_003_599));
        assert_eq!(token.id_token_claims, None);
    }

    #[test]
    fn test_parse_expires_in_only() {
        let body = r#"{"access_token":"abc","expires_in":3600}"#;
        let token = parse_token_response(body, 1_000).unwrap();
        assert_eq!(token.expires_at, Some(4_600));
    }

    #[test]
    fn test_parse_missing_access_token() {
        let body = r#"{"token_type":"Bearer"}"#;
        let err = parse_token_response(body, 0).unwrap_err();
        assert!(matches!(err, AuthError::MissingAccessToken));
        assert!(err.to_string().starts_with("Authentication failed"));
    }

    #[test]
    fn test_parse_not_json() {
        let err = parse_token_response("<html></html>", 0).unwrap_err();
        assert!(matches!(err, AuthError::ParseError(_)));
    }

    #[test]
    fn test_claims_prefer_id_token_claims() {
        let body = r#"{"access_token":"abc","expires_in":3600,"id_token_claims":{"exp":42}}"#;
        let token = parse_token_response(body, 1_000).unwrap();
        assert_eq!(token.claims().exp, Some(42));
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_freshness() {
        let now = unix_now();
        assert!(Token::new("t", Some(now + 3600)).is_fresh());
        assert!(!Token::new("t", Some(now + 30)).is_fresh());
        assert!(Token::new("t", None).is_fresh());
        assert_eq!(Token::new("t", None).bearer(), "Bearer t");
    }

    #[test]
    fn test_claims_without_exp_fall_back_to_expires_on() {
        let body = r#"{"access_token":"abc","expires_on":"1000","id_token_claims":{"aud":"x"}}"#;
        let token = parse_token_response(body, unix_now()).unwrap();
        assert_eq!(token.expires_at, Some(1000));
        assert!(!token.is_fresh());
        // the expiry check itself still treats a missing exp as unexpired
        assert!(!token.is_expired());
    }
}

//! OAuth2 error codes returned by the identity provider

use serde::Deserialize;
use std::fmt;

/// Error body of a failed token request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Well-known `error` values of a failed OAuth2 request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthErrorCode {
    InvalidClient,
    UnauthorizedClient,
    InvalidGrant,
    InvalidRequest,
    InvalidScope,
    AccessDenied,
    UnsupportedResponseType,
    ServerError,
    TemporarilyUnavailable,
    InteractionRequired,
    ExpiredToken,
    Other(String),
}

impl OAuthErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "invalid_client" => Self::InvalidClient,
            "unauthorized_client" => Self::UnauthorizedClient,
            "invalid_grant" => Self::InvalidGrant,
            "invalid_request" => Self::InvalidRequest,
            "invalid_scope" => Self::InvalidScope,
            "access_denied" => Self::AccessDenied,
            "unsupported_response_type" => Self::UnsupportedResponseType,
            "server_error" => Self::ServerError,
            "temporarily_unavailable" => Self::TemporarilyUnavailable,
            "interaction_required" => Self::InteractionRequired,
            "expired_token" => Self::ExpiredToken,
            other => Self::Other(other.to_string()),
        }
    }

    /// Pull the code out of a raw response body, if it is an OAuth error
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<OAuthErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .map(|code| Self::from_code(&code))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidScope => "invalid_scope",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
            Self::InteractionRequired => "interaction_required",
            Self::ExpiredToken => "expired_token",
            Self::Other(code) => code,
        }
    }

    /// What the operator should look at
    pub fn hint(&self) -> &'static str {
        match self {
            Self::InvalidClient => {
                "The client ID or secret is incorrect. Verify the app registration credentials."
            }
            Self::UnauthorizedClient => {
                "The client is not permitted to use this grant. Check the app permissions in Azure."
            }
            Self::InvalidGrant => "The grant is invalid or expired.",
            Self::InvalidRequest => {
                "The token request is missing a parameter or is otherwise malformed."
            }
            Self::InvalidScope => {
                "The requested resource or scope is invalid. Verify the resource URL."
            }
            Self::AccessDenied => {
                "The authorization server denied the request. Admin consent may be missing."
            }
            Self::UnsupportedResponseType => {
                "The authorization server does not support this response type."
            }
            Self::ServerError => {
                "The authorization server hit an unexpected condition. Try again later."
            }
            Self::TemporarilyUnavailable => {
                "The authorization server is temporarily unavailable. Try again later."
            }
            Self::InteractionRequired => {
                "The request needs user interaction, which client credentials cannot provide."
            }
            Self::ExpiredToken => "The token has expired. A new token is required.",
            Self::Other(_) => "The identity provider rejected the token request.",
        }
    }
}

impl fmt::Display for OAuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Configuration loading
//!
//! Values come from an optional TOML file, then `D365_*` environment
//! variables. Anything still unset falls back to the placeholder literals
//! meant for manual substitution.

use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "d365.toml";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_API_VERSION: &str = "v9.0";

const PLACEHOLDER_CLIENT_ID: &str = "your_client_id";
const PLACEHOLDER_CLIENT_SECRET: &str = "your_client_secret";
const PLACEHOLDER_TENANT_ID: &str = "your_tenant_id";
const PLACEHOLDER_RESOURCE_URL: &str = "https://yourorganization.crm.dynamics.com";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How the credential checker authenticates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Basic,
    #[default]
    #[serde(alias = "oauth2")]
    OAuth,
}

impl FromStr for AuthType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthType::Basic),
            "oauth" | "oauth2" => Ok(AuthType::OAuth),
            other => Err(ConfigError::Invalid(format!(
                "unsupported auth type '{}', expected 'basic' or 'oauth'",
                other
            ))),
        }
    }
}

/// Raw configuration as written in `d365.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub resource_url: Option<String>,
    pub authority_host: Option<String>,
    pub api_version: Option<String>,
    pub auth_type: Option<AuthType>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Client-credentials material for the identity provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub resource_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("resource_url", &self.resource_url)
            .finish()
    }
}

/// Username/password pair for Basic authentication
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated configuration used at runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub credentials: Credentials,
    pub authority_host: String,
    pub api_version: String,
    pub auth_type: AuthType,
    pub basic: Option<BasicCredentials>,
    pub timeout: Option<Duration>,
}

impl Config {
    /// Load `d365.toml` from the working directory if present, then apply
    /// environment overrides.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!(
                "No {} found, using environment and defaults",
                DEFAULT_CONFIG_FILE
            );
            Self::default()
        };
        config.with_env()
    }

    /// Load an explicit config file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_file(path)?.with_env()
    }

    /// Parse a config file without looking at the environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `D365_*` overrides from the process environment
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    /// An unknown `D365_AUTH_TYPE` is rejected like one in the file.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("D365_CLIENT_ID") {
            self.client_id = Some(v);
        }
        if let Some(v) = get("D365_CLIENT_SECRET") {
            self.client_secret = Some(v);
        }
        if let Some(v) = get("D365_TENANT_ID") {
            self.tenant_id = Some(v);
        }
        if let Some(v) = get("D365_RESOURCE_URL") {
            self.resource_url = Some(v);
        }
        if let Some(v) = get("D365_AUTHORITY_HOST") {
            self.authority_host = Some(v);
        }
        if let Some(v) = get("D365_API_VERSION") {
            self.api_version = Some(v);
        }
        if let Some(v) = get("D365_AUTH_TYPE") {
            self.auth_type = Some(v.parse()?);
        }
        if let Some(v) = get("D365_USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = get("D365_PASSWORD") {
            self.password = Some(v);
        }

        Ok(self)
    }

    /// Fill placeholders and validate URLs
    pub fn to_runtime(&self) -> Result<RuntimeConfig, ConfigError> {
        let resource_url = normalize_url(
            "resource_url",
            self.resource_url.as_deref().unwrap_or(PLACEHOLDER_RESOURCE_URL),
        )?;
        let authority_host = normalize_url(
            "authority_host",
            self.authority_host.as_deref().unwrap_or(DEFAULT_AUTHORITY_HOST),
        )?;

        let api_version = self
            .api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        if api_version.is_empty() || api_version.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "api_version must look like 'v9.0', got '{}'",
                api_version
            )));
        }

        let credentials = Credentials {
            client_id: self
                .client_id
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_CLIENT_ID.to_string()),
            client_secret: self
                .client_secret
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_CLIENT_SECRET.to_string()),
            tenant_id: self
                .tenant_id
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_TENANT_ID.to_string()),
            resource_url,
        };

        let basic = match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(BasicCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Ok(RuntimeConfig {
            credentials,
            authority_host,
            api_version,
            auth_type: self.auth_type.unwrap_or_default(),
            basic,
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}

impl RuntimeConfig {
    /// Runtime config for the given credentials with every other setting at
    /// its default.
    pub fn from_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            auth_type: AuthType::OAuth,
            basic: None,
            timeout: None,
        }
    }

    /// True while any credential is still a placeholder literal
    pub fn uses_placeholders(&self) -> bool {
        let c = &self.credentials;
        c.client_id == PLACEHOLDER_CLIENT_ID
            || c.client_secret == PLACEHOLDER_CLIENT_SECRET
            || c.tenant_id == PLACEHOLDER_TENANT_ID
            || c.resource_url == PLACEHOLDER_RESOURCE_URL
    }
}

/// Check the URL parses and strip any trailing slash
fn normalize_url(field: &str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| ConfigError::Invalid(format!("{} '{}': {}", field, raw, e)))?;
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!(
            "{} '{}' has no host",
            field, raw
        )));
    }
    Ok(trimmed.to_string())
}

//! Configuration module
//!
//! Credentials and endpoint settings, loaded from TOML and the environment.

#[allow(clippy::module_inception)]
pub mod config;

pub use config::{
    AuthType, BasicCredentials, Config, ConfigError, Credentials, RuntimeConfig,
    DEFAULT_API_VERSION, DEFAULT_AUTHORITY_HOST, DEFAULT_CONFIG_FILE,
};

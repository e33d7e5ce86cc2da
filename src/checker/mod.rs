//! Credential checker
//!
//! Validates a configuration against a live organization: authenticate,
//! then call `WhoAmI()`, the service root, or a FetchXML query. Every
//! failure is reported to the writer and yields `false`.

use crate::auth::{AuthError, Token};
use crate::config::{AuthType, BasicCredentials, RuntimeConfig};
use crate::odata::{ODataClient, ODataError, RequestAuth};
use std::io::{self, Write};

/// Credential material resolved for one check
#[derive(Debug, Clone)]
enum ResolvedAuth {
    Bearer(Token),
    Basic(BasicCredentials),
}

impl ResolvedAuth {
    fn as_request_auth(&self) -> RequestAuth<'_> {
        match self {
            ResolvedAuth::Bearer(token) => RequestAuth::Bearer(token),
            ResolvedAuth::Basic(basic) => RequestAuth::Basic(basic),
        }
    }
}

#[derive(Debug)]
pub struct AuthenticationChecker {
    client: ODataClient,
    auth_type: AuthType,
    basic: Option<BasicCredentials>,
}

impl AuthenticationChecker {
    pub fn new(client: ODataClient, auth_type: AuthType, basic: Option<BasicCredentials>) -> Self {
        Self {
            client,
            auth_type,
            basic,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ODataError> {
        Ok(Self::new(
            ODataClient::from_config(config)?,
            config.auth_type,
            config.basic.clone(),
        ))
    }

    /// Authenticate, then call `WhoAmI()`; valid iff it answers 2xx.
    pub async fn validate_credentials<W: Write>(&self, out: &mut W) -> io::Result<bool> {
        let auth = match self.resolve_auth(out).await? {
            Some(auth) => auth,
            None => return Ok(false),
        };

        match self.client.who_am_i(auth.as_request_auth()).await {
            Ok(response) => {
                if !response.is_success() {
                    tracing::warn!("WhoAmI returned {}: {}", response.status, response.body);
                }
                Ok(response.is_success())
            }
            Err(e) => {
                writeln!(out, "Error validating credentials: {}", e)?;
                Ok(false)
            }
        }
    }

    /// GET the service root
    pub async fn test_connectivity<W: Write>(&self, out: &mut W) -> io::Result<bool> {
        let auth = match self.resolve_auth(out).await? {
            Some(auth) => auth,
            None => return Ok(false),
        };

        match self.client.service_root(auth.as_request_auth()).await {
            Ok(response) => Ok(response.is_success()),
            Err(e) => {
                writeln!(out, "Connectivity error: {}", e)?;
                Ok(false)
            }
        }
    }

    /// Read one row of `entity_set` through FetchXML. A 403 means the
    /// principal lacks read privilege on the entity.
    pub async fn check_permissions<W: Write>(
        &self,
        entity_set: &str,
        entity_name: &str,
        out: &mut W,
    ) -> io::Result<bool> {
        let auth = match self.resolve_auth(out).await? {
            Some(auth) => auth,
            None => return Ok(false),
        };

        let query = top_one_fetch_xml(entity_name);
        match self
            .client
            .fetch_xml(entity_set, &query, auth.as_request_auth())
            .await
        {
            Ok(response) if response.is_success() => {
                writeln!(out, "Dynamics 365 permission check success")?;
                Ok(true)
            }
            Ok(response) => {
                writeln!(
                    out,
                    "Failed to check permissions, status code: {}",
                    response.status.as_u16()
                )?;
                Ok(false)
            }
            Err(e) => {
                writeln!(out, "Error checking permissions: {}", e)?;
                Ok(false)
            }
        }
    }

    async fn resolve_auth<W: Write>(&self, out: &mut W) -> io::Result<Option<ResolvedAuth>> {
        match self.auth_type {
            AuthType::Basic => match &self.basic {
                Some(basic) if !basic.username.is_empty() && !basic.password.is_empty() => {
                    Ok(Some(ResolvedAuth::Basic(basic.clone())))
                }
                _ => {
                    writeln!(
                        out,
                        "Username and password must be provided for Basic authentication."
                    )?;
                    Ok(None)
                }
            },
            AuthType::OAuth => {
                if !self.client.auth().has_client_credentials() {
                    writeln!(
                        out,
                        "ClientId and ClientSecret must be provided for OAuth authentication."
                    )?;
                    return Ok(None);
                }

                match self.client.auth().get_token().await {
                    Ok(token) => Ok(Some(ResolvedAuth::Bearer(token))),
                    Err(e) => {
                        report_auth_error(out, &e)?;
                        Ok(None)
                    }
                }
            }
        }
    }
}

fn report_auth_error<W: Write>(out: &mut W, error: &AuthError) -> io::Result<()> {
    tracing::error!("{}", error);
    match error.oauth_code() {
        Some(code) => writeln!(out, "{} ({})", code.hint(), code),
        None => writeln!(out, "Error validating credentials: {}", error),
    }
}

/// FetchXML selecting the primary key of a single row
pub fn top_one_fetch_xml(entity_name: &str) -> String {
    format!(
        "<fetch top='1'><entity name='{0}'><attribute name='{0}id' /></entity></fetch>",
        entity_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_fetch_xml() {
        assert_eq!(
            top_one_fetch_xml("contact"),
            "<fetch top='1'><entity name='contact'><attribute name='contactid' /></entity></fetch>"
        );
    }

    #[tokio::test]
    async fn test_basic_without_credentials_is_invalid() {
        let config = Config {
            auth_type: Some(AuthType::Basic),
            ..Default::default()
        }
        .to_runtime()
        .unwrap();
        let checker = AuthenticationChecker::from_config(&config).unwrap();

        let mut out = Vec::new();
        assert!(!checker.validate_credentials(&mut out).await.unwrap());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Username and password must be provided for Basic authentication.\n"
        );
    }

    #[tokio::test]
    async fn test_oauth_without_secret_is_invalid() {
        let config = Config {
            client_secret: Some(String::new()),
            ..Default::default()
        }
        .to_runtime()
        .unwrap();
        let checker = AuthenticationChecker::from_config(&config).unwrap();

        let mut out = Vec::new();
        assert!(!checker.test_connectivity(&mut out).await.unwrap());
        assert!(String::from_utf8(out)
            .unwrap()
            .starts_with("ClientId and ClientSecret must be provided"));
    }
}

//! Entry-point flows
//!
//! Each flow runs top to bottom: token, one call, report.

use crate::auth::AuthError;
use crate::odata::{ODataClient, ODataError};
use crate::report::{self, Outcome, ReportError};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

/// Entity set used by every flow
pub const ACCOUNTS: &str = "accounts";

/// Flow errors. A CRM failure status is not one of these.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    OData(#[from] ODataError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Fields written when creating an account
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub description: String,
}

impl Default for NewAccount {
    fn default() -> Self {
        Self {
            name: "New Account via API".to_string(),
            description: "Created using Rust".to_string(),
        }
    }
}

/// Result of the token-management flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenManagementReport {
    pub outcome: Outcome,
    pub refreshed: bool,
}

/// List accounts and print their names
pub async fn list_accounts<W: Write>(
    client: &ODataClient,
    out: &mut W,
) -> Result<Outcome, FlowError> {
    let token = client.auth().get_token().await?;
    let response = client.list_records(ACCOUNTS, &token).await?;
    Ok(report::report_list(out, &response)?)
}

/// Create one account and print the result
pub async fn create_account<W: Write>(
    client: &ODataClient,
    account: &NewAccount,
    out: &mut W,
) -> Result<Outcome, FlowError> {
    let token = client.auth().get_token().await?;
    let record = serde_json::to_value(account).map_err(|e| {
        ODataError::ParseError(format!("Failed to encode account: {}", e))
    })?;

    tracing::info!("Creating account '{}'", account.name);

    let response = client.create_record(ACCOUNTS, &record, &token).await?;
    Ok(report::report_create(out, &response)?)
}

/// List accounts, then check the token's expiry and refresh it if needed.
///
/// The check runs after the list call has already completed, so a refresh
/// only benefits later calls; the listed response is reported as received.
pub async fn list_accounts_with_refresh_check<W: Write>(
    client: &ODataClient,
    out: &mut W,
) -> Result<TokenManagementReport, FlowError> {
    let token = client.auth().get_token().await?;
    let response = client.list_records(ACCOUNTS, &token).await?;

    let mut refreshed = false;
    if token.is_expired() {
        writeln!(out, "Token expired. Refreshing...")?;
        client.auth().refresh_token().await?;
        refreshed = true;
        writeln!(out, "Token refreshed.")?;
    }

    let outcome = report::report_list(out, &response)?;
    Ok(TokenManagementReport { outcome, refreshed })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_body() {
        let body = serde_json::to_value(NewAccount::default()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "New Account via API",
                "description": "Created using Rust"
            })
        );
    }
}

//! D365 Web API samples
//!
//! Client-credentials authentication against Azure AD and single-shot calls
//! to the Microsoft Dynamics 365 (Dataverse) Web API.

pub mod auth;
pub mod checker;
pub mod config;
pub mod flows;
pub mod odata;
pub mod report;

pub use auth::{is_token_expired, AuthError, AzureAdAuth, Token, TokenClaims};
pub use checker::AuthenticationChecker;
pub use config::{AuthType, Config, Credentials, RuntimeConfig};
pub use flows::{FlowError, NewAccount};
pub use odata::{ApiResponse, ODataClient, ODataError};
pub use report::Outcome;

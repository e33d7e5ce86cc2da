//! OData Client module
//!
//! Single-attempt HTTP calls against the Dataverse Web API

use crate::auth::{AuthError, AzureAdAuth, Token};
use crate::config::{BasicCredentials, RuntimeConfig};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// OData client errors
#[derive(Error, Debug)]
pub enum ODataError {
    #[error(transparent)]
    AuthError(#[from] AuthError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Collection response, `{ "value": [...] }`
#[derive(Debug, Deserialize)]
pub struct ODataResponse {
    #[serde(rename = "@odata.context")]
    pub context: Option<String>,

    pub value: Vec<Value>,
}

/// Status and raw body of a completed call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ODataError> {
        serde_json::from_str(&self.body).map_err(|e| {
            ODataError::ParseError(format!("Failed to parse response body: {}", e))
        })
    }
}

/// How a request is authenticated
#[derive(Debug, Clone, Copy)]
pub enum RequestAuth<'a> {
    Bearer(&'a Token),
    Basic(&'a BasicCredentials),
}

/// Build the shared HTTP client. No timeout unless one is given.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client, ODataError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// OData client for D365 APIs
#[derive(Debug)]
pub struct ODataClient {
    auth: Arc<AzureAdAuth>,
    endpoint: String,
    http_client: Client,
}

impl ODataClient {
    /// Create a new OData client
    ///
    /// # Arguments
    /// * `auth` - Azure AD auth helper
    /// * `resource_url` - Organization URL (e.g., "https://org.crm.dynamics.com")
    /// * `api_version` - Web API version segment (e.g., "v9.0")
    /// * `http_client` - Client used for every call
    pub fn new(
        auth: Arc<AzureAdAuth>,
        resource_url: &str,
        api_version: &str,
        http_client: Client,
    ) -> Self {
        let endpoint = format!(
            "{}/api/data/{}/",
            resource_url.trim_end_matches('/'),
            api_version
        );

        Self {
            auth,
            endpoint,
            http_client,
        }
    }

    /// Wire up auth and client from runtime configuration
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ODataError> {
        let http_client = build_http_client(config.timeout)?;
        let auth = AzureAdAuth::new(
            config.credentials.clone(),
            config.authority_host.clone(),
        )
        .with_http_client(http_client.clone());
        Ok(Self::new(
            Arc::new(auth),
            &config.credentials.resource_url,
            &config.api_version,
            http_client,
        ))
    }

    pub fn auth(&self) -> &AzureAdAuth {
        &self.auth
    }

    /// Get service root URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn entity_url(&self, entity: &str) -> String {
        format!("{}{}", self.endpoint, entity)
    }

    fn request(&self, method: Method, url: &str, auth: RequestAuth<'_>) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0");

        match auth {
            RequestAuth::Bearer(token) => builder.header("Authorization", token.bearer()),
            RequestAuth::Basic(basic) => {
                builder.basic_auth(&basic.username, Some(&basic.password))
            }
        }
    }

    /// Issue one request and collect status and body. Non-2xx statuses are
    /// returned, not raised.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        auth: RequestAuth<'_>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ODataError> {
        tracing::debug!("{} {}", method, url);

        let mut builder = self.request(method, url, auth);
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body).map_err(|e| {
                ODataError::ParseError(format!("Failed to encode request body: {}", e))
            })?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!("Response status: {}", status);

        Ok(ApiResponse { status, body })
    }

    /// GET an entity collection, e.g. "accounts"
    pub async fn list_records(
        &self,
        entity: &str,
        token: &Token,
    ) -> Result<ApiResponse, ODataError> {
        let url = self.entity_url(entity);
        self.send(Method::GET, &url, RequestAuth::Bearer(token), None).await
    }

    /// POST a new record. Dataverse answers 204 No Content on success.
    pub async fn create_record(
        &self,
        entity: &str,
        record: &Value,
        token: &Token,
    ) -> Result<ApiResponse, ODataError> {
        let url = self.entity_url(entity);
        self.send(Method::POST, &url, RequestAuth::Bearer(token), Some(record))
            .await
    }

    /// Call the `WhoAmI()` function
    pub async fn who_am_i(&self, auth: RequestAuth<'_>) -> Result<ApiResponse, ODataError> {
        let url = self.entity_url("WhoAmI()");
        self.send(Method::GET, &url, auth, None).await
    }

    /// GET the service root document
    pub async fn service_root(&self, auth: RequestAuth<'_>) -> Result<ApiResponse, ODataError> {
        let url = self.endpoint.clone();
        self.send(Method::GET, &url, auth, None).await
    }

    /// Run a FetchXML query against an entity set
    pub async fn fetch_xml(
        &self,
        entity_set: &str,
        fetch_xml: &str,
        auth: RequestAuth<'_>,
    ) -> Result<ApiResponse, ODataError> {
        let mut url = reqwest::Url::parse(&self.entity_url(entity_set))
            .map_err(|e| ODataError::ParseError(format!("Invalid entity URL: {}", e)))?;
        url.query_pairs_mut().append_pair("fetchXml", fetch_xml);
        self.send(Method::GET, url.as_str(), auth, None).await
    }
}

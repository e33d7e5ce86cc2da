#![allow(dead_code)]

use d365_webapi_samples::config::{Config, RuntimeConfig};
use d365_webapi_samples::odata::ODataClient;
use httpmock::prelude::*;
use httpmock::Mock;

pub const TENANT: &str = "contoso";
pub const TOKEN_PATH: &str = "/contoso/oauth2/token";
pub const ACCOUNTS_PATH: &str = "/api/data/v9.0/accounts";

pub fn token_json(token: &str, expires_in: u64) -> String {
    format!(
        r#"{{"token_type":"Bearer","expires_in":"{expires_in}","access_token":"{token}"}}"#
    )
}

/// Identity provider and organization served by the same mock server
pub fn runtime_config(server: &MockServer) -> RuntimeConfig {
    Config {
        client_id: Some("int-client".to_string()),
        client_secret: Some("int-secret".to_string()),
        tenant_id: Some(TENANT.to_string()),
        resource_url: Some(server.base_url()),
        authority_host: Some(server.base_url()),
        ..Default::default()
    }
    .to_runtime()
    .unwrap()
}

pub fn client(server: &MockServer) -> ODataClient {
    ODataClient::from_config(&runtime_config(server)).unwrap()
}

pub fn mock_token<'a>(server: &'a MockServer, body: String) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(TOKEN_PATH)
            .body_includes("grant_type=client_credentials")
            .body_includes("client_id=int-client")
            .body_includes("client_secret=int-secret");
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    })
}

pub fn render(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

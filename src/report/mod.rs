//! Result reporting
//!
//! Turns an [`ApiResponse`] into the lines a user sees. A failure status is
//! reported, never raised.

use crate::odata::{ApiResponse, ODataResponse};
use reqwest::StatusCode;
use serde_json::Value;
use std::io::{self, Write};
use thiserror::Error;

pub const CREATE_SUCCESS_MESSAGE: &str = "New Account created successfully.";

/// Errors while reporting
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected response body: {0}")]
    Parse(String),
}

/// What the reporter saw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(StatusCode),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Report a list call: one `Account Name:` line per record on 200.
pub fn report_list<W: Write>(
    out: &mut W,
    response: &ApiResponse,
) -> Result<Outcome, ReportError> {
    if response.status != StatusCode::OK {
        return report_error(out, response);
    }

    let collection: ODataResponse = response
        .json()
        .map_err(|e| ReportError::Parse(e.to_string()))?;

    tracing::debug!("Reporting {} records", collection.value.len());

    for record in &collection.value {
        writeln!(out, "Account Name: {}", record_name(record))?;
    }

    Ok(Outcome::Success)
}

/// Report a create call: success only on 204 No Content.
pub fn report_create<W: Write>(
    out: &mut W,
    response: &ApiResponse,
) -> Result<Outcome, ReportError> {
    if response.status != StatusCode::NO_CONTENT {
        return report_error(out, response);
    }

    writeln!(out, "{}", CREATE_SUCCESS_MESSAGE)?;
    Ok(Outcome::Success)
}

/// `Error: {status} - {body}`
pub fn report_error<W: Write>(
    out: &mut W,
    response: &ApiResponse,
) -> Result<Outcome, ReportError> {
    tracing::warn!("Request failed with status {}", response.status);
    writeln!(out, "Error: {} - {}", response.status.as_u16(), response.body)?;
    Ok(Outcome::Failed(response.status))
}

fn record_name(record: &Value) -> String {
    match record.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Null) | None => {
            tracing::warn!("Record has no name field");
            String::new()
        }
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    fn render<F>(f: F) -> (Result<Outcome, ReportError>, String)
    where
        F: FnOnce(&mut Vec<u8>) -> Result<Outcome, ReportError>,
    {
        let mut out = Vec::new();
        let outcome = f(&mut out);
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_list_prints_names_in_order() {
        let r = response(200, r#"{"value":[{"name":"A"},{"name":"B"}]}"#);
        let (outcome, text) = render(|out| report_list(out, &r));
        assert_eq!(outcome.unwrap(), Outcome::Success);
        assert_eq!(text, "Account Name: A\nAccount Name: B\n");
    }

    #[test]
    fn test_list_empty_collection() {
        let r = response(200, r#"{"value":[]}"#);
        let (outcome, text) = render(|out| report_list(out, &r));
        assert!(outcome.unwrap().is_success());
        assert!(text.is_empty());
    }

    #[test]
    fn test_list_missing_name() {
        let r = response(200, r#"{"value":[{"accountid":"1"},{"name":null}]}"#);
        let (_, text) = render(|out| report_list(out, &r));
        assert_eq!(text, "Account Name: \nAccount Name: \n");
    }

    #[test]
    fn test_list_not_found() {
        let r = response(404, "Resource not found for the segment 'acounts'.");
        let (outcome, text) = render(|out| report_list(out, &r));
        assert_eq!(outcome.unwrap(), Outcome::Failed(StatusCode::NOT_FOUND));
        assert_eq!(
            text,
            "Error: 404 - Resource not found for the segment 'acounts'.\n"
        );
    }

    #[test]
    fn test_list_other_success_status_is_error() {
        let r = response(206, r#"{"value":[]}"#);
        let (outcome, text) = render(|out| report_list(out, &r));
        assert!(!outcome.unwrap().is_success());
        assert!(text.starts_with("Error: 206 - "));
    }

    #[test]
    fn test_list_bad_body() {
        let r = response(200, "not json");
        let (outcome, _) = render(|out| report_list(out, &r));
        assert!(matches!(outcome, Err(ReportError::Parse(_))));
    }

    #[test]
    fn test_create_success() {
        let r = response(204, "");
        let (outcome, text) = render(|out| report_create(out, &r));
        assert!(outcome.unwrap().is_success());
        assert_eq!(text, "New Account created successfully.\n");
    }

    #[test]
    fn test_create_201_is_error() {
        let r = response(201, r#"{"accountid":"x"}"#);
        let (outcome, text) = render(|out| report_create(out, &r));
        assert_eq!(outcome.unwrap(), Outcome::Failed(StatusCode::CREATED));
        assert_eq!(text, "Error: 201 - {\"accountid\":\"x\"}\n");
    }
}

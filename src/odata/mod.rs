//! OData module
//!
//! HTTP caller for the Dataverse Web API

pub mod client;

pub use client::{
    build_http_client, ApiResponse, ODataClient, ODataError, ODataResponse, RequestAuth,
};

//! Transport abstraction.
//!
//! [`HttpTransport`] is the seam between the client's control flow and the
//! wire:
//! - [`ReqwestTransport`]: production HTTPS transport
//! - `ScriptedTransport` (feature `testing`): replays canned responses
//!
//! Requests carry paths relative to the API base URL.

mod http;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TransportError;
use crate::session::{Credentials, Session};

pub use http::ReqwestTransport;

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

/// A request against the Brain API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL
    pub path: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// POST request with a JSON body.
    pub fn post_json<T: Serialize>(path: impl Into<String>, body: &T) -> serde_json::Result<Self> {
        Ok(Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(serde_json::to_value(body)?),
        })
    }

    /// Adds a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

/// A response from the Brain API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code
    pub status: u16,
    /// Headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl ApiResponse {
    /// Empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Response with a JSON body.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(value.to_string())
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All headers with the given name (case-insensitive).
    pub fn headers_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as (lossy) UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the JSON body.
    pub fn json_body<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

// =============================================================================
// TRANSPORT TRAIT
// =============================================================================

/// Wire-level access to the Brain API.
///
/// Implementations perform exactly one round trip per call and never retry;
/// retry and re-authentication policy belongs to
/// [`SimulationClient`](crate::SimulationClient).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs the credential login call.
    async fn login(&self, credentials: &Credentials) -> Result<ApiResponse, TransportError>;

    /// Executes a request authenticated by `session`.
    async fn execute(
        &self,
        request: &ApiRequest,
        session: &Session,
    ) -> Result<ApiResponse, TransportError>;
}

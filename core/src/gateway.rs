//! Request gateway: the only component that issues outbound calls.
//!
//! # Design
//! `Gateway` holds the API key, the base URL, and a `Transport`. Each call is
//! split the same way throughout the crate: `build_request` turns a method,
//! path segments, query pairs, and an optional JSON body into an
//! `HttpRequest`; the transport runs it; `parse_response` turns the
//! `HttpResponse` into a `Payload`. The `Authorization` header is computed
//! while building every request, so a key swapped in with `set_api_key` is
//! used by the very next call.

use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::authorization_header;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.lemlist.com/api";

/// A decoded success body.
///
/// JSON is attempted first for every response. Bodies that are not JSON
/// (the CSV lead export, empty 204 bodies) come back as `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Decoded(Value),
    Raw(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Decoded(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Decoded(_) => None,
            Payload::Raw(text) => Some(text),
        }
    }

    /// The JSON value, or `MalformedResponse` for a raw body.
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Payload::Decoded(value) => Ok(value),
            Payload::Raw(text) => Err(ApiError::MalformedResponse(format!(
                "expected a JSON body, got {} bytes of text",
                text.len()
            ))),
        }
    }
}

/// Authenticated access to the remote API through a transport.
#[derive(Debug, Clone)]
pub struct Gateway<T> {
    api_key: String,
    base_url: String,
    transport: T,
}

impl<T: Transport> Gateway<T> {
    pub fn new(api_key: impl Into<String>, transport: T) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, transport)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str, transport: T) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the API key used for subsequent requests.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build, send, and decode one request.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Payload, ApiError> {
        parse_response(self.send(method, path, query, body)?)
    }

    /// Like `execute`, but returns the success body as text without trying
    /// to decode it.
    pub fn execute_text(
        &self,
        method: HttpMethod,
        path: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<String, ApiError> {
        check_status(self.send(method, path, query, body)?).map(|response| response.body)
    }

    fn send(
        &self,
        method: HttpMethod,
        path: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(method, path, query, body)?;
        debug!(method = method.as_str(), url = %request.url, "sending request");
        self.transport.send(&request)
    }

    /// Describe a request without sending it.
    ///
    /// `path` segments are appended to the base URL and percent-encoded
    /// individually, so emails and ids can be passed as-is.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.build_url(path, query)?;
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;

        Ok(HttpRequest {
            method,
            url,
            headers: vec![
                ("Authorization".to_string(), authorization_header(&self.api_key)),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        })
    }

    fn build_url(&self, path: &[&str], query: &[(&str, String)]) -> Result<String, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ApiError::Config(format!("invalid base URL {:?}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Config(format!("base URL {:?} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(path);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url.into())
    }
}

/// Map a response to a `Payload`, surfacing non-success statuses unchanged.
pub fn parse_response(response: HttpResponse) -> Result<Payload, ApiError> {
    let response = check_status(response)?;
    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => Ok(Payload::Decoded(value)),
        Err(e) => {
            trace!(error = %e, "body is not JSON, returning raw text");
            Ok(Payload::Raw(response.body))
        }
    }
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    warn!(status = response.status, "request failed");
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body,
    })
}

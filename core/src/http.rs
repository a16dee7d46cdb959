//! HTTP transport types and the blocking transport used in production.
//!
//! # Design
//! Requests and responses are plain data. The gateway builds an `HttpRequest`
//! and hands it to a `Transport`, which performs the round-trip and returns an
//! `HttpResponse`. A transport reports 4xx/5xx answers as data; only failures
//! to complete the exchange become `ApiError::Transport`. Status
//! interpretation stays in the gateway, so any transport (ureq, a recording
//! fake in tests) behaves the same from the caller's point of view.

use std::time::Duration;

use tracing::debug;

use crate::error::ApiError;

/// Upper bound on a response body. CSV exports of large campaigns are well
/// above ureq's default 10 MB limit.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries the encoded query string.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// 2xx and 3xx count as success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Executes one HTTP round-trip.
///
/// Implementations must be safe to share between threads if the client is.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).send(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Bounds the whole round-trip (connect, send, receive) by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => apply_headers(self.agent.get(url), &request.headers).call(),
            (HttpMethod::Delete, _) => {
                apply_headers(self.agent.delete(url), &request.headers).call()
            }
            (HttpMethod::Post, Some(body)) => {
                apply_headers(self.agent.post(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => {
                apply_headers(self.agent.post(url), &request.headers).send_empty()
            }
            (HttpMethod::Patch, Some(body)) => {
                apply_headers(self.agent.patch(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Patch, None) => {
                apply_headers(self.agent.patch(url), &request.headers).send_empty()
            }
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn apply_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range_covers_2xx_and_3xx() {
        let mut response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 302;
        assert!(response.is_success());
        response.status = 400;
        assert!(!response.is_success());
        response.status = 199;
        assert!(!response.is_success());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "https://example.test/".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: None,
        };
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn timeout_bounds_a_silent_server() {
        // Connections land in the backlog and are never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = UreqTransport::with_timeout(Duration::from_millis(200));
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: format!("http://{addr}/api/campaigns"),
            headers: Vec::new(),
            body: None,
        };

        let started = std::time::Instant::now();
        let err = transport.send(&request).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
        drop(listener);
    }

    #[test]
    fn method_names() {
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}

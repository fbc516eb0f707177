//! HTTP Client Abstraction
//!
//! The engine only issues two kinds of request: a cheap reachability probe
//! before a candidate URL is handed to the surface, and a partial-range
//! fetch when warming the next track.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Request an inclusive byte range (`Range: bytes=start-end`).
    pub fn range(self, start: u64, end: u64) -> Self {
        self.header("Range", format!("bytes={}-{}", start, end))
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// 2xx, including `206 Partial Content`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// `Content-Type` without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("Content-Type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// Async HTTP client trait
///
/// Non-2xx statuses are *not* errors: they come back as an [`HttpResponse`] so
/// callers can classify them (a 410 evicts a cached URL, a 503 is retried).
/// Only transport failures (DNS, TLS, connection reset, timeout) surface as
/// [`BridgeError::Network`](crate::error::BridgeError::Network).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
///
/// async fn first_kilobyte(client: &dyn HttpClient, url: &str) -> Result<usize> {
///     let request = HttpRequest::new(HttpMethod::Get, url).range(0, 1023);
///     let response = client.execute(request).await?;
///     Ok(response.body.len())
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)]) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new(HttpMethod::Head, "https://cdn.example/a")
            .header("User-Agent", "test")
            .timeout(Duration::from_secs(5));

        assert_eq!(request.url, "https://cdn.example/a");
        assert_eq!(request.method, HttpMethod::Head);
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_range_header() {
        let request = HttpRequest::new(HttpMethod::Get, "https://cdn.example/a").range(0, 1);
        assert_eq!(request.headers.get("Range"), Some(&"bytes=0-1".to_string()));
    }

    #[test]
    fn test_content_type_is_normalized() {
        let response = response(200, &[("content-type", "Text/HTML; charset=utf-8")]);
        assert_eq!(response.content_type().as_deref(), Some("text/html"));
        assert_eq!(response.header("Content-Type"), Some("Text/HTML; charset=utf-8"));
    }

    #[test]
    fn test_partial_content_is_success() {
        assert!(response(206, &[]).is_success());
        assert!(!response(410, &[]).is_success());
        assert!(!response(503, &[]).is_success());
        assert!(response(200, &[]).content_type().is_none());
    }
}

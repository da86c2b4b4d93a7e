//! HTTP capability consumed by the export client.
//!
//! The client never talks to `reqwest` directly; it sends [`HttpRequest`]s
//! through an [`HttpTransport`] and reads the response body as a byte stream.
//! [`ReqwestTransport`] is the production implementation, tests script their
//! own.

mod http;

pub use http::ReqwestTransport;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt};
use url::Url;

use crate::error::TransportError;

/// Response body as an incremental byte stream.
pub type BodyStream = Box<dyn AsyncRead + Send + Unpin>;

/// Outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post(url: Url, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Response with a streaming body.
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl HttpResponse {
    /// Read at most `limit` bytes of the body as lossy UTF-8.
    ///
    /// Used for tokens and error diagnostics, never for archives.
    pub async fn read_text_limited(self, limit: u64) -> std::io::Result<String> {
        let mut buf = Vec::new();
        self.body.take(limit).read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// "Send request, receive status and byte stream".
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_text_limited_truncates() {
        let response = HttpResponse {
            status: StatusCode::UNAUTHORIZED,
            headers: HeaderMap::new(),
            body: Box::new(Cursor::new(b"0123456789".to_vec())),
        };

        let text = response.read_text_limited(4).await.unwrap();
        assert_eq!(text, "0123");
    }

    #[test]
    fn test_sensitive_header_hidden_from_debug() {
        let mut value = HeaderValue::from_static("Bearer top-secret");
        value.set_sensitive(true);
        let request = HttpRequest::get(Url::parse("https://example.com/").unwrap())
            .header(reqwest::header::AUTHORIZATION, value);

        let rendered = format!("{request:?}");
        assert!(!rendered.contains("top-secret"));
    }
}

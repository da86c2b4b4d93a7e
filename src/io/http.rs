use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::TransportError;

/// Default limit for establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport backed by `reqwest`
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests, body download included, give up
    /// after `timeout`.
    ///
    /// This is the only cancellation mechanism for an export call.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();

        // Stream the body instead of buffering the whole archive
        let stream = resp.bytes_stream().map_err(std::io::Error::other);
        let body = StreamReader::new(Box::pin(stream));

        Ok(HttpResponse {
            status,
            headers,
            body: Box::new(body),
        })
    }
}

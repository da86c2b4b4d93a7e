//! Export orchestration.

use std::path::Path;

use reqwest::header::AUTHORIZATION;
use tracing::{info, instrument, warn};
use url::Url;

use crate::auth::CredentialResolver;
use crate::config::{ExportConfig, Selection};
use crate::error::ExportError;
use crate::io::{HttpRequest, HttpTransport};
use crate::zip::{ExtractionSummary, ZipExtractor};

/// Cloud export endpoint.
pub const CLOUD_EXPORT_URL: &str = "https://xray.cloud.getxray.app/api/v2/export/cucumber";

/// Path of the export endpoint below a self-hosted base URL.
pub const SELF_HOSTED_EXPORT_PATH: &str = "/rest/raven/2.0/export/test";

/// How much of a failed export response is logged.
const ERROR_BODY_LIMIT: u64 = 2048;

/// Downloads a feature bundle and extracts it.
///
/// The client keeps no state between calls; each [`submit`](Self::submit)
/// resolves fresh credentials.
pub struct ExportClient<T: HttpTransport> {
    transport: T,
    extractor: ZipExtractor,
}

impl<T: HttpTransport> ExportClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            extractor: ZipExtractor::new(),
        }
    }

    /// Export endpoint for `config`, query string included.
    pub fn export_url(&self, config: &ExportConfig) -> Result<Url, ExportError> {
        let mut url = match config {
            ExportConfig::SelfHosted(server) => {
                let raw = format!(
                    "{}{}",
                    server.base_url().trim_end_matches('/'),
                    SELF_HOSTED_EXPORT_PATH
                );
                let mut url = Url::parse(&raw).map_err(|source| ExportError::InvalidBaseUrl {
                    url: server.base_url().to_string(),
                    source,
                })?;
                // Ask for the zip bundle rather than a single file
                url.query_pairs_mut().append_pair("fz", "true");
                url
            }
            ExportConfig::Cloud(_) => {
                Url::parse(CLOUD_EXPORT_URL).map_err(|source| ExportError::InvalidBaseUrl {
                    url: CLOUD_EXPORT_URL.to_string(),
                    source,
                })?
            }
        };

        append_selection(&mut url, config.selection());
        Ok(url)
    }

    /// Export the selected features and extract them below `output_dir`.
    ///
    /// Nothing is written unless the export request succeeds.
    #[instrument(skip_all, fields(variant = %config.variant()))]
    pub async fn submit(
        &self,
        config: &ExportConfig,
        output_dir: impl AsRef<Path>,
    ) -> Result<ExtractionSummary, ExportError> {
        let token = CredentialResolver::new(&self.transport).resolve(config).await?;
        let url = self.export_url(config)?;
        info!(url = %url, auth = %token, "requesting export");

        let request = HttpRequest::get(url).header(AUTHORIZATION, token.to_header_value()?);
        let resp = self.transport.send(request).await?;

        if !resp.status.is_success() {
            let status = resp.status;
            let body = resp
                .read_text_limited(ERROR_BODY_LIMIT)
                .await
                .unwrap_or_default();
            warn!(%status, body = %body, "export request rejected");
            return Err(ExportError::HttpStatus {
                status,
                variant: config.variant(),
            });
        }

        let summary = self.extractor.extract(resp.body, output_dir).await?;
        info!(
            files = summary.files,
            directories = summary.directories,
            bytes = summary.bytes_written,
            "export extracted"
        );
        Ok(summary)
    }
}

fn append_selection(url: &mut Url, selection: &Selection) {
    if selection.issue_keys().is_none() && selection.filter_id().is_none() {
        return;
    }

    let mut query = url.query_pairs_mut();
    if let Some(keys) = selection.issue_keys() {
        query.append_pair("keys", keys);
    }
    if let Some(filter) = selection.filter_id() {
        query.append_pair("filter", filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::io::HttpResponse;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl HttpTransport for Unreachable {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(std::io::Error::other("no network in unit tests").into())
        }
    }

    fn query(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_self_hosted_url_with_keys() {
        let client = ExportClient::new(Unreachable);
        let config = ExportConfig::self_hosted_token(
            "https://jira.example.com/",
            "pat",
            Selection::all().with_issue_keys("JIRA-1,JIRA-2"),
        );

        let url = client.export_url(&config).unwrap();
        assert_eq!(url.path(), "/rest/raven/2.0/export/test");
        assert_eq!(
            query(&url),
            vec![
                ("fz".to_string(), "true".to_string()),
                ("keys".to_string(), "JIRA-1,JIRA-2".to_string()),
            ]
        );
    }

    #[test]
    fn test_self_hosted_url_keeps_context_path() {
        let client = ExportClient::new(Unreachable);
        let config = ExportConfig::self_hosted_basic(
            "https://example.com/jira",
            "u",
            "p",
            Selection::all().with_filter_id("10100"),
        );

        let url = client.export_url(&config).unwrap();
        assert_eq!(url.path(), "/jira/rest/raven/2.0/export/test");
        assert_eq!(
            query(&url),
            vec![
                ("fz".to_string(), "true".to_string()),
                ("filter".to_string(), "10100".to_string()),
            ]
        );
    }

    #[test]
    fn test_cloud_url_has_no_fz() {
        let client = ExportClient::new(Unreachable);

        let bare = client
            .export_url(&ExportConfig::cloud("id", "secret", Selection::all()))
            .unwrap();
        assert_eq!(bare.as_str(), CLOUD_EXPORT_URL);

        let selected = client
            .export_url(&ExportConfig::cloud(
                "id",
                "secret",
                Selection::all().with_issue_keys("CALC-7").with_filter_id("42"),
            ))
            .unwrap();
        assert_eq!(
            query(&selected),
            vec![
                ("keys".to_string(), "CALC-7".to_string()),
                ("filter".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let client = ExportClient::new(Unreachable);
        let config = ExportConfig::self_hosted_token("not a url", "pat", Selection::all());

        let err = client.export_url(&config).unwrap_err();
        assert!(matches!(err, ExportError::InvalidBaseUrl { .. }));
    }

    #[tokio::test]
    async fn test_submit_surfaces_transport_error() {
        let client = ExportClient::new(Unreachable);
        let temp = tempfile::TempDir::new().unwrap();
        let out = temp.path().join("out");
        let config = ExportConfig::self_hosted_token("https://jira", "pat", Selection::all());

        let err = client.submit(&config, &out).await.unwrap_err();
        assert!(matches!(err, ExportError::Transport(_)));
        assert!(!out.exists());
    }
}

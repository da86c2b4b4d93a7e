//! # xray-export
//!
//! Export Cucumber feature bundles from Xray and extract them safely.
//!
//! This library talks to either a self-hosted Jira Server/Data Center
//! instance or Xray Cloud, downloads the zipped `.feature` files selected
//! by issue keys or a saved filter, and streams the archive onto disk.
//! Archive entries that would land outside the output directory are
//! rejected before anything is written for them.
//!
//! ## Features
//!
//! - Basic, personal access token and cloud client-credential authentication
//! - Streaming extraction with a bounded buffer (STORED and DEFLATE)
//! - Zip-slip protection on canonical paths, symlinks included
//! - Pluggable HTTP transport for testing or custom client setups
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use xray_export::{ExportClient, ExportConfig, ReqwestTransport, Selection};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExportConfig::cloud(
//!         "client-id",
//!         "client-secret",
//!         Selection::all().with_issue_keys("CALC-1,CALC-2"),
//!     );
//!
//!     let client = ExportClient::new(ReqwestTransport::new(Duration::from_secs(300))?);
//!     let summary = client.submit(&config, "features").await?;
//!     println!("{} feature files", summary.files);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod io;
pub mod zip;

pub use auth::{AuthToken, CredentialResolver};
pub use cli::Cli;
pub use client::ExportClient;
pub use config::{ExportConfig, Selection, SelfHostedCredentials, Variant};
pub use error::{AuthenticationError, ConfigError, ExportError, ExtractionError, TransportError};
pub use io::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use zip::{ArchiveEntry, ExtractionSummary, ZipExtractor};

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Variant;

/// Failure of the underlying HTTP capability.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Credential exchange failed.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("authentication rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("authentication request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("could not build authentication request: {0}")]
    Request(String),

    #[error("authentication response did not contain a token")]
    EmptyToken,

    #[error("authentication response exceeds {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("credentials cannot be sent as an HTTP header value")]
    InvalidToken,
}

/// Failure while materializing an archive on disk.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("entry is outside of the target dir: {0}")]
    PathTraversal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid zip archive: {0}")]
    InvalidArchive(String),

    #[error("unsupported zip entry {name}: {reason}")]
    UnsupportedEntry { name: String, reason: String },
}

/// Failure of a whole export call.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error("{variant} export failed with status {status}")]
    HttpStatus { status: StatusCode, variant: Variant },

    #[error("export request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Invalid command-line or environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("either --token or both --username and --password are required")]
    MissingCredentials,
}

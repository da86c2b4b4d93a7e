//! Export configuration.
//!
//! An [`ExportConfig`] is built once through one of its factory functions and
//! never mutated afterwards. The deployment variant is an explicit enum so the
//! client dispatches on it exhaustively instead of guessing from which fields
//! happen to be populated.

use std::fmt;

/// Deployment variant of the remote tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    SelfHosted,
    Cloud,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::SelfHosted => f.write_str("self-hosted"),
            Variant::Cloud => f.write_str("cloud"),
        }
    }
}

/// Optional narrowing of the exported test cases.
///
/// Both fields may be set at once; they are forwarded as-is and the remote
/// decides how to combine them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    issue_keys: Option<String>,
    filter_id: Option<String>,
}

impl Selection {
    /// Export everything the credentials can see.
    pub fn all() -> Self {
        Self::default()
    }

    /// Comma-separated issue keys, e.g. `"CALC-1,CALC-2"`.
    pub fn with_issue_keys(mut self, keys: impl Into<String>) -> Self {
        self.issue_keys = Some(keys.into());
        self
    }

    /// Saved filter identifier.
    pub fn with_filter_id(mut self, filter_id: impl Into<String>) -> Self {
        self.filter_id = Some(filter_id.into());
        self
    }

    pub fn issue_keys(&self) -> Option<&str> {
        self.issue_keys.as_deref()
    }

    pub fn filter_id(&self) -> Option<&str> {
        self.filter_id.as_deref()
    }
}

/// Credentials accepted by a self-hosted instance.
#[derive(Clone, PartialEq, Eq)]
pub enum SelfHostedCredentials {
    Basic { username: String, password: String },
    PersonalAccessToken(String),
}

impl fmt::Debug for SelfHostedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfHostedCredentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            SelfHostedCredentials::PersonalAccessToken(_) => f
                .debug_tuple("PersonalAccessToken")
                .field(&"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfHostedConfig {
    base_url: String,
    credentials: SelfHostedCredentials,
    selection: Selection,
}

impl SelfHostedConfig {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &SelfHostedCredentials {
        &self.credentials
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct CloudConfig {
    client_id: String,
    client_secret: String,
    selection: Selection,
}

impl CloudConfig {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("selection", &self.selection)
            .finish()
    }
}

/// Immutable description of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportConfig {
    SelfHosted(SelfHostedConfig),
    Cloud(CloudConfig),
}

impl ExportConfig {
    /// Self-hosted instance authenticated with HTTP Basic credentials.
    pub fn self_hosted_basic(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        selection: Selection,
    ) -> Self {
        ExportConfig::SelfHosted(SelfHostedConfig {
            base_url: base_url.into(),
            credentials: SelfHostedCredentials::Basic {
                username: username.into(),
                password: password.into(),
            },
            selection,
        })
    }

    /// Self-hosted instance authenticated with a personal access token.
    pub fn self_hosted_token(
        base_url: impl Into<String>,
        token: impl Into<String>,
        selection: Selection,
    ) -> Self {
        ExportConfig::SelfHosted(SelfHostedConfig {
            base_url: base_url.into(),
            credentials: SelfHostedCredentials::PersonalAccessToken(token.into()),
            selection,
        })
    }

    /// Cloud tenant authenticated through an API key pair.
    pub fn cloud(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        selection: Selection,
    ) -> Self {
        ExportConfig::Cloud(CloudConfig {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            selection,
        })
    }

    pub fn variant(&self) -> Variant {
        match self {
            ExportConfig::SelfHosted(_) => Variant::SelfHosted,
            ExportConfig::Cloud(_) => Variant::Cloud,
        }
    }

    pub fn selection(&self) -> &Selection {
        match self {
            ExportConfig::SelfHosted(c) => &c.selection,
            ExportConfig::Cloud(c) => &c.selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_follows_constructor() {
        let server = ExportConfig::self_hosted_token("https://jira", "pat", Selection::all());
        let cloud = ExportConfig::cloud("id", "secret", Selection::all());

        assert_eq!(server.variant(), Variant::SelfHosted);
        assert_eq!(cloud.variant(), Variant::Cloud);
        assert_eq!(cloud.variant().to_string(), "cloud");
    }

    #[test]
    fn test_selection_keeps_both_fields() {
        let selection = Selection::all()
            .with_issue_keys("CALC-1,CALC-2")
            .with_filter_id("10001");
        let config = ExportConfig::cloud("id", "secret", selection);

        assert_eq!(config.selection().issue_keys(), Some("CALC-1,CALC-2"));
        assert_eq!(config.selection().filter_id(), Some("10001"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let basic = ExportConfig::self_hosted_basic("https://jira", "alice", "hunter2", Selection::all());
        let token = ExportConfig::self_hosted_token("https://jira", "s3cr3t-pat", Selection::all());
        let cloud = ExportConfig::cloud("client", "client-secret-value", Selection::all());

        let rendered = format!("{basic:?} {token:?} {cloud:?}");
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("client"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cr3t-pat"));
        assert!(!rendered.contains("client-secret-value"));
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ExportConfig, Selection};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "xray-export")]
#[command(version)]
#[command(about = "Export Xray Cucumber features and extract them", long_about = None)]
#[command(after_help = "Examples:\n  \
  xray-export --keys CALC-1,CALC-2 cloud --client-id ID --client-secret SECRET\n  \
  xray-export -o features server --base-url https://jira.example.com --token PAT\n  \
  xray-export --filter 10100 server --base-url https://jira.example.com --username u --password p")]
pub struct Cli {
    /// Directory receiving the extracted feature files
    #[arg(short = 'o', long, value_name = "DIR", env = "XRAY_OUTPUT_DIR", default_value = "features")]
    pub output: PathBuf,

    /// Comma-separated issue keys to export
    #[arg(long, value_name = "KEYS", env = "XRAY_ISSUE_KEYS")]
    pub keys: Option<String>,

    /// Saved filter id to export
    #[arg(long, value_name = "ID", env = "XRAY_FILTER_ID")]
    pub filter: Option<String>,

    /// Request timeout in seconds, body download included
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub timeout: u64,

    #[command(subcommand)]
    pub target: Target,
}

#[derive(Subcommand, Debug)]
pub enum Target {
    /// Jira Server / Data Center with the Xray plugin
    Server {
        /// Jira base URL, e.g. https://jira.example.com
        #[arg(long, env = "JIRA_BASE_URL")]
        base_url: String,

        /// Username for basic authentication
        #[arg(long, env = "JIRA_USERNAME", requires = "password", conflicts_with = "token")]
        username: Option<String>,

        /// Password for basic authentication
        #[arg(long, env = "JIRA_PASSWORD", requires = "username", hide_env_values = true)]
        password: Option<String>,

        /// Personal access token
        #[arg(long, env = "JIRA_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Xray Cloud
    Cloud {
        /// API key client id
        #[arg(long, env = "XRAY_CLIENT_ID")]
        client_id: String,

        /// API key client secret
        #[arg(long, env = "XRAY_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,
    },
}

impl Cli {
    pub fn selection(&self) -> Selection {
        let mut selection = Selection::all();
        if let Some(keys) = &self.keys {
            selection = selection.with_issue_keys(keys.clone());
        }
        if let Some(filter) = &self.filter {
            selection = selection.with_filter_id(filter.clone());
        }
        selection
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Build the export configuration; a token wins over basic credentials.
    pub fn to_config(&self) -> Result<ExportConfig, ConfigError> {
        let selection = self.selection();
        match &self.target {
            Target::Server {
                base_url,
                token: Some(token),
                ..
            } => Ok(ExportConfig::self_hosted_token(base_url, token, selection)),
            Target::Server {
                base_url,
                username: Some(username),
                password: Some(password),
                ..
            } => Ok(ExportConfig::self_hosted_basic(
                base_url, username, password, selection,
            )),
            Target::Server { .. } => Err(ConfigError::MissingCredentials),
            Target::Cloud {
                client_id,
                client_secret,
            } => Ok(ExportConfig::cloud(client_id, client_secret, selection)),
        }
    }
}

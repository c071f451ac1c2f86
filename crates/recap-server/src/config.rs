use clap::Parser;
use recap_adapters::{openai, GoogleConfig, JiraConfig};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "recap")]
#[command(about = "Multi-source sprint summary server")]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "RECAP_HTTP_ADDR", default_value = "0.0.0.0:8000")]
    pub http_addr: SocketAddr,

    /// Chat-service bot token
    #[arg(long, env = "SLACK_BOT_TOKEN")]
    pub slack_bot_token: Option<String>,

    /// Summarization API key
    #[arg(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,

    /// Summarization API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = openai::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Summarization model identifier
    #[arg(long, env = "OPENAI_MODEL", default_value = openai::DEFAULT_MODEL)]
    pub openai_model: String,

    /// Source-control personal access token
    #[arg(long, env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Repository in owner/name form
    #[arg(long, env = "GITHUB_REPO")]
    pub github_repo: Option<String>,

    /// Issue-tracker base URL, e.g. https://acme.atlassian.net
    #[arg(long, env = "JIRA_SERVER")]
    pub jira_server: Option<String>,

    /// Issue-tracker account email
    #[arg(long, env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    /// Issue-tracker API token
    #[arg(long, env = "JIRA_API_TOKEN")]
    pub jira_api_token: Option<String>,

    /// Calendar OAuth client id
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Calendar OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
    pub google_client_secret: Option<String>,

    /// Path of the persisted calendar token file
    #[arg(long, env = "GOOGLE_TOKEN_PATH", default_value = "./tokens.json")]
    pub google_token_path: PathBuf,
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl Config {
    pub fn slack_configured(&self) -> bool {
        is_set(&self.slack_bot_token)
    }

    pub fn openai_configured(&self) -> bool {
        is_set(&self.openai_api_key)
    }

    pub fn github_configured(&self) -> bool {
        is_set(&self.github_token) && is_set(&self.github_repo)
    }

    pub fn jira_configured(&self) -> bool {
        is_set(&self.jira_server) && is_set(&self.jira_email) && is_set(&self.jira_api_token)
    }

    pub fn calendar_configured(&self) -> bool {
        is_set(&self.google_client_id) && is_set(&self.google_client_secret)
    }

    pub fn jira_config(&self) -> Option<JiraConfig> {
        if !self.jira_configured() {
            return None;
        }
        Some(JiraConfig {
            server: self.jira_server.clone().unwrap_or_default(),
            email: self.jira_email.clone().unwrap_or_default(),
            api_token: self.jira_api_token.clone().unwrap_or_default(),
        })
    }

    pub fn google_config(&self) -> Option<GoogleConfig> {
        if !self.calendar_configured() {
            return None;
        }
        Some(GoogleConfig {
            client_id: self.google_client_id.clone().unwrap_or_default(),
            client_secret: self.google_client_secret.clone().unwrap_or_default(),
            token_path: self.google_token_path.clone(),
        })
    }

    /// Per-integration configured/not_configured map for the health
    /// endpoint. Pure function of the config, so repeated calls with an
    /// unchanged config yield identical maps.
    pub fn service_status(&self) -> BTreeMap<&'static str, &'static str> {
        fn status(configured: bool) -> &'static str {
            if configured {
                "configured"
            } else {
                "not_configured"
            }
        }

        BTreeMap::from([
            ("openai", status(self.openai_configured())),
            ("slack", status(self.slack_configured())),
            ("github", status(self.github_configured())),
            ("jira", status(self.jira_configured())),
            ("calendar", status(self.calendar_configured())),
        ])
    }

    /// Integrations required for readiness that are missing credentials.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.openai_configured() {
            missing.push("openai");
        }
        if !self.slack_configured() {
            missing.push("slack");
        }
        missing
    }
}

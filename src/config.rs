//! Process configuration from CLI flags with environment fallbacks

use clap::Parser;

/// Autosphere MCP server configuration
#[derive(Debug, Clone, Parser)]
#[command(
    name = "autosphere-mcp",
    about = "Autosphere MCP server - AWX automation and Prometheus observability broker",
    version
)]
pub struct Config {
    /// Serve MCP over streamable HTTP at this address instead of stdio
    #[arg(long, value_name = "HOST:PORT")]
    pub http: Option<String>,

    /// Enable debug logging, including HTTP request/response bodies
    #[arg(long)]
    pub debug: bool,

    /// AWX base URL
    #[arg(
        long = "awx-url",
        env = "AWX_URL",
        default_value = "http://awx.autosphere.local:30930"
    )]
    pub awx_url: String,

    /// AWX username (paired with --awx-password)
    #[arg(long = "awx-username", env = "AWX_USERNAME")]
    pub awx_username: Option<String>,

    /// AWX password
    #[arg(long = "awx-password", env = "AWX_PASSWORD", hide_env_values = true)]
    pub awx_password: Option<String>,

    /// AWX API token (alternative to username/password)
    #[arg(long = "awx-token", env = "AWX_TOKEN", hide_env_values = true)]
    pub awx_token: Option<String>,

    /// Prometheus base URL; metrics tools report unavailable when absent
    #[arg(long = "prometheus-url", env = "PROMETHEUS_URL")]
    pub prometheus_url: Option<String>,

    /// Prometheus basic-auth username
    #[arg(long = "prometheus-username", env = "PROMETHEUS_USERNAME")]
    pub prometheus_username: Option<String>,

    /// Prometheus basic-auth password
    #[arg(
        long = "prometheus-password",
        env = "PROMETHEUS_PASSWORD",
        hide_env_values = true
    )]
    pub prometheus_password: Option<String>,
}

impl Config {
    pub fn is_http_mode(&self) -> bool {
        self.http.is_some()
    }

    pub fn has_awx_credentials(&self) -> bool {
        self.awx_token.as_deref().is_some_and(|t| !t.is_empty())
            || self.awx_username.as_deref().is_some_and(|u| !u.is_empty())
    }
}

//! Credential resolution against AWX
//!
//! Four strategies, tried in order, resolved at most once per process:
//! a configured token, a basic-auth probe, token creation via
//! `/api/v2/tokens/`, and the legacy `/api/v2/authtoken/` endpoint. The
//! winning strategy is immutable after resolution.

use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::awx::models::AuthResponse;
use crate::error::{ClientError, ClientResult};

/// The resolved way to authenticate requests
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    Bearer(String),
    Basic { username: String, password: String },
}

impl AuthStrategy {
    /// Attach the strategy's header to an outgoing request.
    pub fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthStrategy::Bearer(token) => req.bearer_auth(token),
            AuthStrategy::Basic { username, password } => req.basic_auth(username, Some(password)),
        }
    }
}

pub struct Authenticator {
    token: Option<String>,
    username: Option<String>,
    password: Option<String>,
    resolved: OnceCell<AuthStrategy>,
}

impl Authenticator {
    pub fn new(token: Option<String>, username: Option<String>, password: Option<String>) -> Self {
        let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());
        Self {
            token: non_empty(token),
            username: non_empty(username),
            password: non_empty(password),
            resolved: OnceCell::new(),
        }
    }

    /// The active strategy, resolving it on first use. Concurrent first
    /// callers race the resolution but exactly one result is retained.
    pub async fn strategy(
        &self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> ClientResult<&AuthStrategy> {
        self.resolved
            .get_or_try_init(|| self.resolve(http, base_url))
            .await
    }

    async fn resolve(&self, http: &reqwest::Client, base_url: &str) -> ClientResult<AuthStrategy> {
        if let Some(token) = &self.token {
            info!("Using provided AWX token");
            return Ok(AuthStrategy::Bearer(token.clone()));
        }

        let (username, password) = match (&self.username, &self.password) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => return Err(ClientError::MissingCredentials),
        };

        debug!("Testing basic auth with AWX");
        match self.test_basic_auth(http, base_url, &username, &password).await {
            Ok(()) => {
                info!("Basic auth accepted; using it directly");
                return Ok(AuthStrategy::Basic { username, password });
            }
            Err(e) => debug!("Basic auth probe failed: {e}"),
        }

        debug!("Trying token creation via /api/v2/tokens/");
        let tokens_err = match self.create_token(http, base_url, &username, &password).await {
            Ok(token) => {
                info!("Created AWX token");
                return Ok(AuthStrategy::Bearer(token));
            }
            Err(e) => e,
        };
        debug!("Token creation failed: {tokens_err}");

        debug!("Trying legacy /api/v2/authtoken/");
        match self
            .create_token_legacy(http, base_url, &username, &password)
            .await
        {
            Ok(token) => {
                info!("Authenticated with AWX via legacy token endpoint");
                Ok(AuthStrategy::Bearer(token))
            }
            Err(e) => Err(ClientError::Auth(e.to_string())),
        }
    }

    /// Probe a benign read endpoint with basic auth; only a 200 counts.
    async fn test_basic_auth(
        &self,
        http: &reqwest::Client,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> ClientResult<()> {
        let resp = http
            .get(format!("{base_url}/api/v2/job_templates/"))
            .basic_auth(username, Some(password))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 200 {
            Ok(())
        } else {
            Err(ClientError::Auth(format!(
                "basic auth test failed with status {}",
                status.as_u16()
            )))
        }
    }

    async fn create_token(
        &self,
        http: &reqwest::Client,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> ClientResult<String> {
        let resp = http
            .post(format!("{base_url}/api/v2/tokens/"))
            .basic_auth(username, Some(password))
            .json(&json!({
                "description": "MCP Autosphere Token",
                "scope": "write",
            }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 201 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!(
                "token creation failed with status {status}: {body}"
            )));
        }

        let auth: AuthResponse = resp.json().await?;
        Ok(auth.token)
    }

    async fn create_token_legacy(
        &self,
        http: &reqwest::Client,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> ClientResult<String> {
        let resp = http
            .post(format!("{base_url}/api/v2/authtoken/"))
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 201 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!(
                "authentication failed with status {status}: {body}"
            )));
        }

        let auth: AuthResponse = resp.json().await?;
        Ok(auth.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_token_wins_without_network() {
        // base_url is unroutable; strategy 1 must return before any request
        let auth = Authenticator::new(Some("tok123".into()), None, None);
        let http = reqwest::Client::new();
        let strategy = auth.strategy(&http, "http://127.0.0.1:1").await.unwrap();
        match strategy {
            AuthStrategy::Bearer(t) => assert_eq!(t, "tok123"),
            other => panic!("expected bearer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_credentials_is_config_error() {
        let auth = Authenticator::new(None, None, None);
        let http = reqwest::Client::new();
        let err = auth
            .strategy(&http, "http://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_empty_strings_are_treated_as_absent() {
        let auth = Authenticator::new(Some(String::new()), Some(String::new()), None);
        let http = reqwest::Client::new();
        let err = auth
            .strategy(&http, "http://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingCredentials));
    }
}

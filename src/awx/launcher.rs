//! Job launch pipeline: resolve template, probe permissions, launch with
//! bounded retry
//!
//! The launch POST runs on its own task and its own per-attempt HTTP client
//! so that dropping the caller's future (tool-call cancellation) cannot
//! abort a launch the backend may already be processing. The per-attempt
//! timeout still bounds wall-clock.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::awx::auth::AuthStrategy;
use crate::awx::client::AwxClient;
use crate::awx::models::JobLaunchResponse;
use crate::error::{ClientError, ClientResult};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub template: String,
    pub extra_vars: Map<String, Value>,
    pub inventory: String,
    pub limit: String,
    pub tags: String,
    pub skip_tags: String,
    pub job_type: String,
    pub verbosity: u8,
    pub diff_mode: bool,
    pub timeout: Option<Duration>,
    /// When set, the launch POST survives caller cancellation
    pub shield_cancellation: bool,
}

impl LaunchOptions {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            extra_vars: Map::new(),
            inventory: String::new(),
            limit: String::new(),
            tags: String::new(),
            skip_tags: String::new(),
            job_type: String::new(),
            verbosity: 0,
            diff_mode: false,
            timeout: None,
            shield_cancellation: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchResult {
    pub job_id: i64,
    pub status: String,
    pub url: String,
    pub message: String,
    pub launch_type: String,
}

pub struct JobLauncher {
    client: Arc<AwxClient>,
}

impl JobLauncher {
    pub fn new(client: Arc<AwxClient>) -> Self {
        Self { client }
    }

    pub async fn launch(&self, options: LaunchOptions) -> ClientResult<LaunchResult> {
        if options.template.is_empty() {
            return Err(ClientError::validation("template name or ID is required"));
        }

        let timeout = options.timeout.unwrap_or(DEFAULT_LAUNCH_TIMEOUT);

        info!("Starting job launch for template: {}", options.template);

        // Phase 1: resolve. Failures surface immediately, no retry.
        let template = self
            .client
            .get_template_by_name_or_id(&options.template)
            .await?;
        info!("Resolved template '{}' to ID: {}", template.name, template.id);

        // Phase 2: permission probe.
        self.validate_permissions(template.id).await?;

        // Phase 3: launch with bounded retry.
        let payload = prepare_payload(&options);
        let response = self
            .execute_with_retry(template.id, payload, timeout, options.shield_cancellation)
            .await?;

        let result = LaunchResult {
            job_id: response.job,
            status: "pending".into(),
            url: format!("{}/#/jobs/playbook/{}", self.client.base_url(), response.job),
            message: success_message(&template.name, response.job, &options),
            launch_type: "api".into(),
        };

        info!(
            "Job launched successfully: ID {}, template: {}",
            result.job_id, template.name
        );
        Ok(result)
    }

    /// GET the launch endpoint to surface permission problems before the
    /// POST. A 403 is permanent; other failures are classified below.
    async fn validate_permissions(&self, template_id: i64) -> ClientResult<()> {
        let url = format!(
            "{}/api/v2/job_templates/{}/launch/",
            self.client.base_url(),
            template_id
        );
        let strategy = self.client.auth_strategy().await?;

        let resp = strategy.apply(self.client.http().get(&url)).send().await?;
        let status = resp.status().as_u16();

        if status == 403 {
            return Err(ClientError::InsufficientPermissions);
        }
        if status >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(())
    }

    async fn execute_with_retry(
        &self,
        template_id: i64,
        payload: Value,
        timeout: Duration,
        shield: bool,
    ) -> ClientResult<JobLaunchResponse> {
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            info!(
                "Launch attempt {}/{} for template {}",
                attempt, MAX_ATTEMPTS, template_id
            );

            match self
                .execute_single(template_id, payload.clone(), timeout, shield)
                .await
            {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Launch attempt {} failed: {}", attempt, e);
                    let stop = is_non_retryable(&e);
                    last_err = Some(e);
                    if stop {
                        break;
                    }
                    if attempt < MAX_ATTEMPTS {
                        debug!("Retrying in {:?}", RETRY_DELAY);
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        let last = last_err.unwrap_or_else(|| ClientError::Backend("no launch attempt ran".into()));
        Err(ClientError::Backend(format!(
            "all launch attempts failed, last error: {last}"
        )))
    }

    async fn execute_single(
        &self,
        template_id: i64,
        payload: Value,
        timeout: Duration,
        shield: bool,
    ) -> ClientResult<JobLaunchResponse> {
        let url = format!(
            "{}/api/v2/job_templates/{}/launch/",
            self.client.base_url(),
            template_id
        );
        let strategy = self.client.auth_strategy().await?.clone();

        if shield {
            // Run on a detached task so dropping this future cannot abort
            // the POST mid-flight.
            match tokio::spawn(launch_once(url, strategy, payload, timeout)).await {
                Ok(result) => result,
                Err(e) => Err(ClientError::Backend(format!("launch task failed: {e}"))),
            }
        } else {
            launch_once(url, strategy, payload, timeout).await
        }
    }
}

/// One launch POST on a fresh client bounded by the per-attempt timeout.
async fn launch_once(
    url: String,
    strategy: AuthStrategy,
    payload: Value,
    timeout: Duration,
) -> ClientResult<JobLaunchResponse> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    debug!("POST {}", url);
    debug!("Request body: {}", payload);

    let resp = strategy
        .apply(client.post(&url))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    let status = resp.status().as_u16();
    let body = resp.text().await?;
    debug!("Response: {} - {}", status, body);

    if status >= 400 {
        return Err(ClientError::Status { status, body });
    }

    Ok(serde_json::from_str(&body)?)
}

/// Only the fields the caller actually set go into the payload; AWX is
/// happy with an empty object.
fn prepare_payload(options: &LaunchOptions) -> Value {
    let mut payload = Map::new();

    if !options.extra_vars.is_empty() {
        payload.insert(
            "extra_vars".into(),
            Value::Object(options.extra_vars.clone()),
        );
    }
    if !options.inventory.is_empty() {
        payload.insert("inventory".into(), options.inventory.clone().into());
    }
    if !options.limit.is_empty() {
        payload.insert("limit".into(), options.limit.clone().into());
    }
    if !options.tags.is_empty() {
        payload.insert("job_tags".into(), options.tags.clone().into());
    }
    if !options.skip_tags.is_empty() {
        payload.insert("skip_tags".into(), options.skip_tags.clone().into());
    }
    if !options.job_type.is_empty() {
        payload.insert("job_type".into(), options.job_type.clone().into());
    }
    if options.verbosity > 0 {
        payload.insert("verbosity".into(), options.verbosity.into());
    }
    if options.diff_mode {
        payload.insert("diff_mode".into(), true.into());
    }

    Value::Object(payload)
}

fn success_message(template_name: &str, job_id: i64, options: &LaunchOptions) -> String {
    let mut message = format!("Successfully launched job {job_id} using template '{template_name}'");

    if !options.extra_vars.is_empty() {
        message.push_str(&format!(
            " with {} extra variables",
            options.extra_vars.len()
        ));
    }
    if !options.limit.is_empty() {
        message.push_str(&format!(" limited to hosts: {}", options.limit));
    }

    message
}

/// Auth, permission, and bad-request failures will not improve on retry.
fn is_non_retryable(err: &ClientError) -> bool {
    let text = err.to_string();
    text.contains("403")
        || text.contains("insufficient permissions")
        || text.contains("400")
        || text.contains("not found")
        || text.contains("401")
        || text.contains("authentication")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_omits_empty_fields() {
        let options = LaunchOptions::new("deploy");
        let payload = prepare_payload(&options);
        assert_eq!(payload, serde_json::json!({}));
    }

    #[test]
    fn test_payload_includes_present_fields() {
        let mut options = LaunchOptions::new("deploy");
        options
            .extra_vars
            .insert("v".into(), Value::String("1".into()));
        options.limit = "web01".into();
        options.verbosity = 3;
        options.diff_mode = true;

        let payload = prepare_payload(&options);
        assert_eq!(
            payload,
            serde_json::json!({
                "extra_vars": {"v": "1"},
                "limit": "web01",
                "verbosity": 3,
                "diff_mode": true,
            })
        );
    }

    #[test]
    fn test_verbosity_zero_is_omitted() {
        let mut options = LaunchOptions::new("deploy");
        options.verbosity = 0;
        let payload = prepare_payload(&options);
        assert!(payload.get("verbosity").is_none());
    }

    #[test]
    fn test_success_message_plain() {
        let options = LaunchOptions::new("deploy");
        assert_eq!(
            success_message("deploy", 1234, &options),
            "Successfully launched job 1234 using template 'deploy'"
        );
    }

    #[test]
    fn test_success_message_with_vars_and_limit() {
        let mut options = LaunchOptions::new("deploy");
        options
            .extra_vars
            .insert("v".into(), Value::String("1".into()));
        options.limit = "web01".into();

        assert_eq!(
            success_message("deploy", 1234, &options),
            "Successfully launched job 1234 using template 'deploy' \
             with 1 extra variables limited to hosts: web01"
        );
    }

    #[test]
    fn test_non_retryable_classification() {
        let permanent = [
            ClientError::InsufficientPermissions,
            ClientError::Status {
                status: 403,
                body: String::new(),
            },
            ClientError::Status {
                status: 400,
                body: "bad request".into(),
            },
            ClientError::Status {
                status: 401,
                body: String::new(),
            },
            ClientError::TemplateNotFound {
                identifier: "x".into(),
                available: String::new(),
            },
            ClientError::Auth("authentication failed".into()),
        ];
        for err in &permanent {
            assert!(is_non_retryable(err), "{err} should be permanent");
        }

        let transient = ClientError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert!(!is_non_retryable(&transient));
    }
}

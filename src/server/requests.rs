//! Tool request types and argument coercion
//!
//! Tool arguments arrive as strings (the schema advertises them that way);
//! the helpers here coerce them into the types the façade expects. A
//! coercion failure is a validation error and never reaches the façade.

use rmcp::schemars;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

// ── Requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LaunchJobRequest {
    #[schemars(description = "Name or ID of the AWX job template")]
    pub job_template: String,
    #[schemars(description = "Extra variables as a JSON object string")]
    pub extra_vars: Option<String>,
    #[schemars(description = "Inventory name or ID")]
    pub inventory: Option<String>,
    #[schemars(description = "Limit the job to specific hosts")]
    pub limit: Option<String>,
    #[schemars(description = "Ansible tags to run")]
    pub tags: Option<String>,
    #[schemars(description = "Ansible tags to skip")]
    pub skip_tags: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CheckJobRequest {
    #[schemars(description = "AWX job ID to check")]
    pub job_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HealthCheckRequest {
    #[schemars(description = "Specific component to check (api, database, cache, web, workers, monitoring, all)")]
    pub component: Option<String>,
    #[schemars(description = "Perform deep health checks (\"true\"/\"false\")")]
    pub deep: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AutoscaleRequest {
    #[schemars(description = "Autoscaling action (scale_up, scale_down, analyze, auto)")]
    pub action: String,
    #[schemars(description = "Service to scale")]
    pub service: Option<String>,
    #[schemars(description = "Target number of replicas")]
    pub replicas: Option<String>,
    #[schemars(description = "Scaling threshold (cpu_high, memory_high, load_high)")]
    pub threshold: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListJobsRequest {
    #[schemars(description = "Maximum number of jobs to return (default 20)")]
    pub limit: Option<String>,
    #[schemars(description = "Filter by job status (pending, running, successful, failed, canceled)")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct JobOutputRequest {
    #[schemars(description = "AWX job ID to fetch output for")]
    pub job_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CancelJobRequest {
    #[schemars(description = "AWX job ID to cancel")]
    pub job_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListResourcesRequest {
    #[schemars(description = "Resource type: templates, inventories, or projects")]
    pub resource_type: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateTemplateRequest {
    #[schemars(description = "Template name")]
    pub name: String,
    #[schemars(description = "Inventory ID")]
    pub inventory: String,
    #[schemars(description = "Project ID")]
    pub project: String,
    #[schemars(description = "Playbook path within the project")]
    pub playbook: String,
    #[schemars(description = "Template description")]
    pub description: Option<String>,
    #[schemars(description = "Job type (default \"run\")")]
    pub job_type: Option<String>,
    #[schemars(description = "Verbosity 0-5")]
    pub verbosity: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryPrometheusRequest {
    #[schemars(description = "PromQL query")]
    pub query: String,
    #[schemars(description = "Range start (RFC3339); with end_time selects a range query")]
    pub start_time: Option<String>,
    #[schemars(description = "Range end (RFC3339)")]
    pub end_time: Option<String>,
    #[schemars(description = "Range step, e.g. 30s, 5m, 1h")]
    pub step: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SystemMetricsRequest {
    #[schemars(description = "Time range hint (unused by the instant snapshot)")]
    pub time_range: Option<String>,
    #[schemars(description = "Node filter hint (unused by the instant snapshot)")]
    pub nodes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AlertsRequest {
    #[schemars(description = "Filter by severity (warning, critical)")]
    pub severity: Option<String>,
    #[schemars(description = "Filter by service")]
    pub service: Option<String>,
    #[schemars(description = "Only active alerts (\"true\"/\"false\")")]
    pub active: Option<String>,
}

// ── Coercion helpers ─────────────────────────────────────────────────────

/// Parse a required integer argument.
pub fn parse_int(field: &str, raw: &str) -> ClientResult<i64> {
    raw.trim().parse().map_err(|_| {
        ClientError::validation(format!("invalid {field}: '{raw}' is not a number"))
    })
}

/// Parse an optional integer argument; absent or empty means 0.
pub fn parse_optional_int(field: &str, raw: Option<&str>) -> ClientResult<i64> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => parse_int(field, raw),
        _ => Ok(0),
    }
}

/// "true" (case-insensitive) is true; anything else is false.
pub fn parse_bool_flag(raw: Option<&str>) -> bool {
    raw.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Verbosity is an integer clamped to the AWX range 0..=5; out-of-range is
/// rejected rather than clamped.
pub fn parse_verbosity(raw: Option<&str>) -> ClientResult<u8> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(0);
    };
    let value = parse_int("verbosity", raw)?;
    if !(0..=5).contains(&value) {
        return Err(ClientError::validation(format!(
            "verbosity must be between 0 and 5, got {value}"
        )));
    }
    Ok(value as u8)
}

/// The extra_vars argument is a JSON object encoded as a string.
pub fn parse_extra_vars(raw: Option<&str>) -> ClientResult<Map<String, Value>> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(Map::new());
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ClientError::validation(
            "extra_vars must be a JSON object, e.g. {\"key\": \"value\"}",
        )),
        Err(e) => Err(ClientError::validation(format!(
            "extra_vars is not valid JSON: {e}"
        ))),
    }
}

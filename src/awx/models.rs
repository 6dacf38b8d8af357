//! Serde models for the AWX REST API
//!
//! Fields the broker does not act on are left out; AWX responses carry far
//! more than we read, and unknown fields are ignored on decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal job states never transition again.
pub fn is_terminal_status(status: &str) -> bool {
    matches!(status, "successful" | "failed" | "canceled" | "error")
}

/// States the job-status cache will serve without re-polling. Narrower than
/// [`is_terminal_status`]: an `error` job is re-fetched each time.
pub fn is_cacheable_status(status: &str) -> bool {
    matches!(status, "successful" | "failed" | "canceled")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inventory: i64,
    #[serde(default)]
    pub project: i64,
    #[serde(default)]
    pub playbook: String,
}

/// Standard AWX paginated list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub count: i64,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    #[serde(default)]
    pub elapsed: f64,
    #[serde(default)]
    pub job_template: i64,
    /// Synthesized browser URL; AWX's own `url` field is an API path
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobLaunchResponse {
    pub job: i64,
    #[serde(default)]
    pub ignored_fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_hosts: i64,
    #[serde(default)]
    pub total_groups: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateJobTemplateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub inventory: i64,
    pub project: i64,
    pub playbook: String,
    pub job_type: String,
    pub verbosity: u8,
}

/// AWX error envelope: `{"detail": "..."}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

//! Typed inputs and outputs for the service façade
//!
//! Inputs arrive from the protocol adapter already coerced (string→int
//! conversions happen there); outputs serialize into the structured half of
//! every tool result.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::awx::models::{Inventory, JobTemplate, Project};
use crate::cache::CacheStats;

// ── Inputs ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LaunchJobInput {
    pub job_template: String,
    pub extra_vars: Map<String, Value>,
    pub inventory: String,
    pub limit: String,
    pub tags: String,
    pub skip_tags: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListJobsInput {
    pub limit: i64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HealthCheckInput {
    pub component: Option<String>,
    pub deep: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AutoscaleInput {
    pub action: String,
    pub service: Option<String>,
    pub replicas: i64,
    pub threshold: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateTemplateInput {
    pub name: String,
    pub description: String,
    pub inventory: i64,
    pub project: i64,
    pub playbook: String,
    pub job_type: String,
    pub verbosity: u8,
}

#[derive(Debug, Clone, Default)]
pub struct QueryMetricsInput {
    pub query: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub step: Option<String>,
}

// ── Outputs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct JobStatusOutput {
    pub job_id: i64,
    pub status: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub finished_at: String,
    pub elapsed_time: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playbook_results: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub started_at: String,
    pub elapsed: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListJobsOutput {
    pub jobs: Vec<JobSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobLogOutput {
    pub job_id: i64,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelJobOutput {
    pub job_id: i64,
    pub status: String,
    pub message: String,
}

/// One variant per resource type; the payload never mixes shapes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "resource_type", content = "items", rename_all = "snake_case")]
pub enum ResourceList {
    Templates(Vec<JobTemplate>),
    Inventories(Vec<Inventory>),
    Projects(Vec<Project>),
}

impl ResourceList {
    pub fn len(&self) -> usize {
        match self {
            ResourceList::Templates(items) => items.len(),
            ResourceList::Inventories(items) => items.len(),
            ResourceList::Projects(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTemplatesOutput {
    pub templates: Vec<JobTemplate>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTemplateOutput {
    pub template: JobTemplate,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub details: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metrics: HashMap<String, String>,
    pub last_checked: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckOutput {
    pub overall_status: String,
    pub components: BTreeMap<String, ComponentHealth>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoscaleOutput {
    pub action: String,
    pub service: String,
    pub old_replicas: i64,
    pub new_replicas: i64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<i64>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsOutput {
    pub awx: CacheStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<CacheStats>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromMetric {
    pub labels: HashMap<String, String>,
    pub value: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryMetricsOutput {
    pub query: String,
    pub result_type: String,
    pub metrics: Vec<PromMetric>,
    pub summary: String,
    pub query_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemMetricsOutput {
    pub overall_health: String,
    pub metrics: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub name: String,
    pub severity: String,
    pub status: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub active_since: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertsOutput {
    pub active_alerts: Vec<AlertSummary>,
    pub total_alerts: usize,
    pub critical: usize,
    pub warning: usize,
    pub summary: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_list_serializes_tagged() {
        let list = ResourceList::Templates(vec![JobTemplate {
            id: 7,
            name: "deploy".into(),
            description: String::new(),
            inventory: 1,
            project: 1,
            playbook: "site.yml".into(),
        }]);

        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["resource_type"], "templates");
        assert_eq!(value["items"][0]["id"], 7);
    }

    #[test]
    fn test_job_status_output_hides_empty_finished() {
        let output = JobStatusOutput {
            job_id: 1,
            status: "running".into(),
            started_at: "2026-01-01 00:00:00".into(),
            finished_at: String::new(),
            elapsed_time: "30s".into(),
            url: String::new(),
            playbook_results: None,
        };
        let value = serde_json::to_value(&output).unwrap();
        assert!(value.get("finished_at").is_none());
        assert!(value.get("playbook_results").is_none());
    }
}

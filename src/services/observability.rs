//! Observability façade over the Prometheus client

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{ClientError, ClientResult};
use crate::prometheus::PrometheusClient;
use crate::services::models::{
    AlertSummary, AlertsOutput, PromMetric, QueryMetricsInput, QueryMetricsOutput,
    SystemMetricsOutput,
};

const DEFAULT_STEP: Duration = Duration::from_secs(5 * 60);

pub struct ObservabilityService {
    prometheus: Option<Arc<PrometheusClient>>,
}

impl ObservabilityService {
    pub fn new(prometheus: Option<Arc<PrometheusClient>>) -> Self {
        Self { prometheus }
    }

    fn client(&self) -> ClientResult<&Arc<PrometheusClient>> {
        self.prometheus
            .as_ref()
            .ok_or(ClientError::MetricsUnavailable)
    }

    /// Instant query, or range query when both start_time and end_time are
    /// given (RFC3339).
    pub async fn query_metrics(
        &self,
        input: QueryMetricsInput,
    ) -> ClientResult<QueryMetricsOutput> {
        let client = self.client()?;

        if input.query.is_empty() {
            return Err(ClientError::validation("query is required"));
        }

        info!("Executing Prometheus query: {}", input.query);

        let response = match (input.start_time.as_deref(), input.end_time.as_deref()) {
            (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => {
                let start = parse_rfc3339("start_time", start)?;
                let end = parse_rfc3339("end_time", end)?;
                let step = input
                    .step
                    .as_deref()
                    .and_then(parse_step)
                    .unwrap_or(DEFAULT_STEP);

                client.query_range(&input.query, start, end, step).await?
            }
            _ => client.query(&input.query).await?,
        };

        let metrics: Vec<PromMetric> = response
            .data
            .result
            .iter()
            .map(|result| {
                let value = result
                    .value
                    .get(1)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let time = result
                    .value
                    .first()
                    .and_then(|v| v.as_f64())
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0))
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default();

                PromMetric {
                    labels: result.metric.clone(),
                    value,
                    time,
                }
            })
            .collect();

        let summary = query_summary(&input.query, &response.data.result_type, metrics.len());
        info!("Prometheus query returned {} metrics", metrics.len());

        Ok(QueryMetricsOutput {
            query: input.query,
            result_type: response.data.result_type,
            metrics,
            summary,
            query_time: Utc::now().to_rfc3339(),
        })
    }

    pub async fn get_system_metrics(&self) -> ClientResult<SystemMetricsOutput> {
        let client = self.client()?;
        let metrics = client.get_system_metrics().await?;

        let (overall_health, alerts, recommendations) = evaluate_system_metrics(&metrics);
        info!("System health: {}, {} alerts", overall_health, alerts.len());

        Ok(SystemMetricsOutput {
            overall_health,
            metrics,
            alerts,
            recommendations,
            timestamp: Utc::now().to_rfc3339(),
        })
    }

    /// Alert listing. AlertManager integration is not wired up; this serves
    /// a representative fixed set so callers can exercise the shape.
    pub fn get_alerts(&self, severity: Option<&str>) -> AlertsOutput {
        let mut alerts = stub_alerts();
        if let Some(severity) = severity.filter(|s| !s.is_empty()) {
            alerts.retain(|a| a.severity == severity);
        }

        let critical = alerts.iter().filter(|a| a.severity == "critical").count();
        let warning = alerts.iter().filter(|a| a.severity == "warning").count();
        let summary = format!(
            "{} total alerts ({} critical, {} warning)",
            alerts.len(),
            critical,
            warning
        );

        AlertsOutput {
            total_alerts: alerts.len(),
            active_alerts: alerts,
            critical,
            warning,
            summary,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

fn parse_rfc3339(field: &str, raw: &str) -> ClientResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClientError::validation(format!("invalid {field} format: {e}")))
}

/// Accepts `30s`, `5m`, `1h`, or a bare number of seconds.
fn parse_step(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let (number, unit) = raw.split_at(raw.len() - 1);
    let number: u64 = number.parse().ok()?;
    match unit {
        "s" => Some(Duration::from_secs(number)),
        "m" => Some(Duration::from_secs(number * 60)),
        "h" => Some(Duration::from_secs(number * 3600)),
        _ => None,
    }
}

/// Threshold evaluation shared by tests and the façade.
/// cpu: warn >80, critical >90; memory: warn >85, critical >95;
/// disk: warn >85, critical >95.
fn evaluate_system_metrics(metrics: &HashMap<String, f64>) -> (String, Vec<String>, Vec<String>) {
    let mut overall = Level::Healthy;
    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    if let Some(&cpu) = metrics.get("cpu_usage_percent") {
        if cpu > 90.0 {
            overall = overall.escalate(Level::Critical);
            alerts.push(format!("High CPU usage: {cpu:.1}%"));
            recommendations
                .push("Consider scaling up or optimizing CPU-intensive processes".to_string());
        } else if cpu > 80.0 {
            overall = overall.escalate(Level::Warning);
            alerts.push(format!("Elevated CPU usage: {cpu:.1}%"));
        }
    }

    if let Some(&memory) = metrics.get("memory_usage_percent") {
        if memory > 95.0 {
            overall = overall.escalate(Level::Critical);
            alerts.push(format!("High memory usage: {memory:.1}%"));
            recommendations.push("Consider adding memory or optimizing memory usage".to_string());
        } else if memory > 85.0 {
            overall = overall.escalate(Level::Warning);
            alerts.push(format!("Elevated memory usage: {memory:.1}%"));
        }
    }

    if let Some(&disk) = metrics.get("disk_usage_percent") {
        if disk > 95.0 {
            overall = overall.escalate(Level::Critical);
            alerts.push(format!("High disk usage: {disk:.1}%"));
            recommendations.push("Clean up disk space or add storage".to_string());
        } else if disk > 85.0 {
            overall = overall.escalate(Level::Warning);
            alerts.push(format!("Elevated disk usage: {disk:.1}%"));
        }
    }

    (overall.as_str().to_string(), alerts, recommendations)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Healthy,
    Warning,
    Critical,
}

impl Level {
    fn escalate(self, other: Level) -> Level {
        self.max(other)
    }

    fn as_str(self) -> &'static str {
        match self {
            Level::Healthy => "healthy",
            Level::Warning => "warning",
            Level::Critical => "critical",
        }
    }
}

fn query_summary(query: &str, result_type: &str, count: usize) -> String {
    if count == 0 {
        return "Query returned no results".to_string();
    }

    let query = query.to_lowercase();
    if query.contains("cpu") {
        format!("Found {count} CPU metrics from {result_type} query")
    } else if query.contains("memory") || query.contains("mem") {
        format!("Found {count} memory metrics from {result_type} query")
    } else if query.contains("disk") || query.contains("filesystem") {
        format!("Found {count} disk/filesystem metrics from {result_type} query")
    } else if query.contains("network") || query.contains("net") {
        format!("Found {count} network metrics from {result_type} query")
    } else if query.contains("http") || query.contains("request") {
        format!("Found {count} HTTP/request metrics from {result_type} query")
    } else {
        format!("Query returned {count} {result_type} results")
    }
}

fn stub_alerts() -> Vec<AlertSummary> {
    vec![
        AlertSummary {
            name: "HighCPUUsage".into(),
            severity: "warning".into(),
            status: "firing".into(),
            labels: [
                ("instance".to_string(), "node-1".to_string()),
                ("job".to_string(), "node-exporter".to_string()),
            ]
            .into_iter()
            .collect(),
            annotations: [
                (
                    "description".to_string(),
                    "CPU usage is above 80% for more than 5 minutes".to_string(),
                ),
                ("summary".to_string(), "High CPU usage detected".to_string()),
            ]
            .into_iter()
            .collect(),
            active_since: "15m".into(),
            value: "85.2%".into(),
        },
        AlertSummary {
            name: "DiskSpaceLow".into(),
            severity: "critical".into(),
            status: "firing".into(),
            labels: [
                ("instance".to_string(), "server-prod-1".to_string()),
                ("mountpoint".to_string(), "/".to_string()),
            ]
            .into_iter()
            .collect(),
            annotations: [
                (
                    "description".to_string(),
                    "Disk space is running low".to_string(),
                ),
                (
                    "summary".to_string(),
                    "Less than 10% disk space remaining".to_string(),
                ),
            ]
            .into_iter()
            .collect(),
            active_since: "2h".into(),
            value: "92.1%".into(),
        },
    ]
}

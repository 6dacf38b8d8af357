//! Dual rendering of service outputs
//!
//! Every successful tool result is a markdown summary for humans followed
//! by a fenced JSON dump of the full structured output. This module is the
//! only place that produces the human-readable half; the façades stay
//! plain.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::awx::LaunchResult;
use crate::services::models::*;

/// Markdown summary + pretty JSON payload in one text content block.
pub fn dual<T: Serialize>(summary: String, payload: &T) -> CallToolResult {
    let json = serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".into());
    CallToolResult::success(vec![Content::text(format!(
        "{summary}\n\n```json\n{json}\n```"
    ))])
}

/// Error tool result with a plain text payload.
pub fn error_text(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

pub fn status_emoji(status: &str) -> &'static str {
    match status {
        "successful" | "healthy" | "completed" => "✅",
        "failed" | "error" | "critical" => "❌",
        "warning" => "⚠️",
        "running" => "🔄",
        "pending" | "waiting" => "⏳",
        "canceled" | "cancel_requested" => "🚫",
        _ => "ℹ️",
    }
}

// ── Per-operation summaries ──────────────────────────────────────────────

pub fn launch(result: &LaunchResult) -> String {
    format!(
        "🚀 **Job Launched**\n\n\
         - **Job ID**: {}\n\
         - **Status**: {} {}\n\
         - **URL**: {}\n\n\
         {}",
        result.job_id,
        result.status,
        status_emoji(&result.status),
        result.url,
        result.message
    )
}

pub fn job_status(output: &JobStatusOutput) -> String {
    let mut summary = format!(
        "{} **Job {}** is `{}`\n\n- **Elapsed**: {}",
        status_emoji(&output.status),
        output.job_id,
        output.status,
        output.elapsed_time
    );
    if !output.started_at.is_empty() {
        summary.push_str(&format!("\n- **Started**: {}", output.started_at));
    }
    if !output.finished_at.is_empty() {
        summary.push_str(&format!("\n- **Finished**: {}", output.finished_at));
    }
    if !output.url.is_empty() {
        summary.push_str(&format!("\n- **URL**: {}", output.url));
    }
    summary
}

pub fn list_jobs(output: &ListJobsOutput) -> String {
    if output.jobs.is_empty() {
        return "📋 **AWX Jobs**\n\nNo jobs found.".to_string();
    }

    let mut summary = format!("📋 **AWX Jobs** ({} shown)\n", output.count);
    for job in &output.jobs {
        summary.push_str(&format!(
            "\n- {} `{}` {} — {} ({})",
            status_emoji(&job.status),
            job.id,
            job.name,
            job.status,
            job.elapsed
        ));
    }
    summary
}

pub fn job_output(output: &JobLogOutput) -> String {
    let lines = output.output.lines().count();
    format!(
        "📜 **Job {} output** ({} line{})",
        output.job_id,
        lines,
        if lines == 1 { "" } else { "s" }
    )
}

pub fn cancel(output: &CancelJobOutput) -> String {
    format!(
        "🚫 **Cancellation requested** for job {}\n\n{}",
        output.job_id, output.message
    )
}

pub fn resources(list: &ResourceList) -> String {
    let (kind, count) = match list {
        ResourceList::Templates(items) => ("job templates", items.len()),
        ResourceList::Inventories(items) => ("inventories", items.len()),
        ResourceList::Projects(items) => ("projects", items.len()),
    };
    format!("📦 **AWX Resources**: {count} {kind}")
}

pub fn templates(output: &ListTemplatesOutput) -> String {
    if output.templates.is_empty() {
        return "📦 **Job Templates**\n\nNo templates found.".to_string();
    }

    let mut summary = format!("📦 **Job Templates** ({})\n", output.count);
    for template in &output.templates {
        summary.push_str(&format!(
            "\n- `{}` {} — {}",
            template.id, template.name, template.playbook
        ));
    }
    summary
}

pub fn create_template(output: &CreateTemplateOutput) -> String {
    format!("✅ **Template created**\n\n{}", output.message)
}

pub fn health(output: &HealthCheckOutput) -> String {
    let mut summary = format!(
        "{} **Overall status**: {}\n",
        status_emoji(&output.overall_status),
        output.overall_status
    );

    for (name, component) in &output.components {
        summary.push_str(&format!(
            "\n- {} **{}**: {}",
            status_emoji(&component.status),
            name,
            component.details
        ));
    }

    if !output.recommendations.is_empty() {
        summary.push_str("\n\n**Recommendations**:");
        for recommendation in &output.recommendations {
            summary.push_str(&format!("\n- {recommendation}"));
        }
    }

    summary
}

pub fn autoscale(output: &AutoscaleOutput) -> String {
    let mut summary = format!(
        "⚖️ **Autoscale {}** for `{}`\n\n\
         - **Replicas**: {} → {}\n\
         - **Reason**: {}",
        output.action, output.service, output.old_replicas, output.new_replicas, output.reason
    );
    if let Some(job_id) = output.job_id {
        summary.push_str(&format!("\n- **Job ID**: {job_id}"));
    }
    summary
}

pub fn cache_stats(output: &CacheStatsOutput) -> String {
    format!("🗃️ **Cache Statistics**\n\n{}", output.summary)
}

pub fn query_metrics(output: &QueryMetricsOutput) -> String {
    format!(
        "📈 **Prometheus query**\n\n- **Query**: `{}`\n- **Result**: {}",
        output.query, output.summary
    )
}

pub fn system_metrics(output: &SystemMetricsOutput) -> String {
    let mut summary = format!(
        "{} **System health**: {}\n",
        status_emoji(&output.overall_health),
        output.overall_health
    );

    let mut keys: Vec<&String> = output.metrics.keys().collect();
    keys.sort();
    for key in keys {
        summary.push_str(&format!("\n- **{}**: {:.1}%", key, output.metrics[key]));
    }

    if !output.alerts.is_empty() {
        summary.push_str("\n\n**Alerts**:");
        for alert in &output.alerts {
            summary.push_str(&format!("\n- ⚠️ {alert}"));
        }
    }

    summary
}

pub fn alerts(output: &AlertsOutput) -> String {
    let mut summary = format!("🔔 **Alerts**: {}\n", output.summary);
    for alert in &output.active_alerts {
        summary.push_str(&format!(
            "\n- {} **{}** ({}) — active {}",
            status_emoji(&alert.severity),
            alert.name,
            alert.severity,
            alert.active_since
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dual_contains_summary_and_json_fence() {
        let result = dual(
            "✅ done".to_string(),
            &serde_json::json!({"job_id": 1234}),
        );
        let text = result.content[0].as_text().unwrap().text.clone();
        assert!(text.starts_with("✅ done"));
        assert!(text.contains("```json"));
        assert!(text.contains("\"job_id\": 1234"));
        assert_ne!(result.is_error, Some(true));
    }

    #[test]
    fn test_error_text_flags_error() {
        let result = error_text("boom");
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.content[0].as_text().unwrap().text, "boom");
    }

    #[test]
    fn test_status_emoji_mapping() {
        assert_eq!(status_emoji("successful"), "✅");
        assert_eq!(status_emoji("failed"), "❌");
        assert_eq!(status_emoji("running"), "🔄");
        assert_eq!(status_emoji("pending"), "⏳");
        assert_eq!(status_emoji("mystery"), "ℹ️");
    }

    #[test]
    fn test_launch_summary() {
        let result = LaunchResult {
            job_id: 1234,
            status: "pending".into(),
            url: "http://awx/#/jobs/playbook/1234".into(),
            message: "Successfully launched job 1234 using template 'deploy'".into(),
            launch_type: "api".into(),
        };
        let summary = launch(&result);
        assert!(summary.contains("1234"));
        assert!(summary.contains("pending"));
        assert!(summary.contains("🚀"));
    }

    #[test]
    fn test_list_jobs_empty() {
        let summary = list_jobs(&ListJobsOutput {
            jobs: vec![],
            count: 0,
        });
        assert!(summary.contains("No jobs found"));
    }
}

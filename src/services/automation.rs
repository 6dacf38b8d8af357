//! Automation façade: composes the AWX client, launcher, and health oracle
//! into the tool-visible operations

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tracing::info;

use crate::awx::models::{is_terminal_status, CreateJobTemplateRequest, Job};
use crate::awx::{AwxClient, JobLauncher, LaunchOptions, LaunchResult};
use crate::error::{ClientError, ClientResult};
use crate::prometheus::PrometheusClient;
use crate::services::health::{
    HealthOracle, JobIdMinter, PlaceholderResults, PlaybookResultProvider, UnixClockMinter,
};
use crate::services::models::*;

/// Components covered by a full health check
const HEALTH_COMPONENTS: [&str; 6] = ["api", "database", "cache", "web", "workers", "monitoring"];

const DEFAULT_JOBS_LIMIT: i64 = 20;

pub struct AutomationService {
    awx: Arc<AwxClient>,
    launcher: JobLauncher,
    prometheus: Option<Arc<PrometheusClient>>,
    health: Arc<dyn HealthOracle>,
    minter: Arc<dyn JobIdMinter>,
    playbook_results: Arc<dyn PlaybookResultProvider>,
    /// Stand-in for observing the current replica count; a real
    /// orchestrator integration replaces this with an observation step.
    baseline_replicas: i64,
}

impl AutomationService {
    pub fn new(
        awx: Arc<AwxClient>,
        prometheus: Option<Arc<PrometheusClient>>,
        health: Arc<dyn HealthOracle>,
    ) -> Self {
        Self {
            launcher: JobLauncher::new(awx.clone()),
            awx,
            prometheus,
            health,
            minter: Arc::new(UnixClockMinter),
            playbook_results: Arc::new(PlaceholderResults),
            baseline_replicas: 3,
        }
    }

    pub fn with_job_id_minter(mut self, minter: Arc<dyn JobIdMinter>) -> Self {
        self.minter = minter;
        self
    }

    pub fn with_playbook_results(mut self, provider: Arc<dyn PlaybookResultProvider>) -> Self {
        self.playbook_results = provider;
        self
    }

    // ── Jobs ─────────────────────────────────────────────────────────────

    pub async fn launch_job(&self, input: LaunchJobInput) -> ClientResult<LaunchResult> {
        if input.job_template.is_empty() {
            return Err(ClientError::validation("job_template is required"));
        }

        let mut options = LaunchOptions::new(input.job_template);
        options.extra_vars = input.extra_vars;
        options.inventory = input.inventory;
        options.limit = input.limit;
        options.tags = input.tags;
        options.skip_tags = input.skip_tags;

        self.launcher.launch(options).await
    }

    pub async fn check_job_status(&self, job_id: i64) -> ClientResult<JobStatusOutput> {
        if job_id <= 0 {
            return Err(ClientError::validation("valid job_id is required"));
        }

        let job = self.awx.get_job(job_id).await?;

        let playbook_results = if job.status == "successful" {
            Some(self.playbook_results.results(&job))
        } else {
            None
        };

        Ok(JobStatusOutput {
            job_id: job.id,
            status: job.status.clone(),
            started_at: job.started.map(format_local).unwrap_or_default(),
            finished_at: job.finished.map(format_local).unwrap_or_default(),
            elapsed_time: format_duration(elapsed_seconds(&job)),
            url: job.url.clone(),
            playbook_results,
        })
    }

    pub async fn list_jobs(&self, input: ListJobsInput) -> ClientResult<ListJobsOutput> {
        let limit = if input.limit <= 0 {
            DEFAULT_JOBS_LIMIT
        } else {
            input.limit
        };

        let jobs = self.awx.get_jobs(limit, input.status.as_deref()).await?;
        let summaries: Vec<JobSummary> = jobs
            .iter()
            .map(|job| JobSummary {
                id: job.id,
                name: job.name.clone(),
                status: job.status.clone(),
                started_at: job.started.map(format_local).unwrap_or_default(),
                elapsed: format_duration(elapsed_seconds(job)),
            })
            .collect();

        Ok(ListJobsOutput {
            count: summaries.len(),
            jobs: summaries,
        })
    }

    pub async fn get_job_output(&self, job_id: i64) -> ClientResult<JobLogOutput> {
        if job_id <= 0 {
            return Err(ClientError::validation("valid job_id is required"));
        }
        let output = self.awx.get_job_output(job_id).await?;
        Ok(JobLogOutput { job_id, output })
    }

    pub async fn cancel_job(&self, job_id: i64) -> ClientResult<CancelJobOutput> {
        if job_id <= 0 {
            return Err(ClientError::validation("valid job_id is required"));
        }
        self.awx.cancel_job(job_id).await?;

        // AWX acknowledges the request before the job actually stops
        Ok(CancelJobOutput {
            job_id,
            status: "cancel_requested".into(),
            message: format!("Cancellation requested for job {job_id}"),
        })
    }

    // ── Resources & templates ────────────────────────────────────────────

    pub async fn list_resources(&self, resource_type: &str) -> ClientResult<ResourceList> {
        match resource_type {
            "templates" => Ok(ResourceList::Templates(self.awx.get_job_templates().await?)),
            "inventories" => Ok(ResourceList::Inventories(self.awx.get_inventories().await?)),
            "projects" => Ok(ResourceList::Projects(self.awx.get_projects().await?)),
            other => Err(ClientError::validation(format!(
                "unknown resource_type '{other}': use templates, inventories, or projects"
            ))),
        }
    }

    pub async fn list_templates(&self) -> ClientResult<ListTemplatesOutput> {
        let templates = self.awx.get_job_templates().await?;
        Ok(ListTemplatesOutput {
            count: templates.len(),
            templates,
        })
    }

    pub async fn create_template(
        &self,
        input: CreateTemplateInput,
    ) -> ClientResult<CreateTemplateOutput> {
        let request = CreateJobTemplateRequest {
            name: input.name,
            description: input.description,
            inventory: input.inventory,
            project: input.project,
            playbook: input.playbook,
            job_type: if input.job_type.is_empty() {
                "run".into()
            } else {
                input.job_type
            },
            verbosity: input.verbosity,
        };

        let template = self.awx.create_job_template(&request).await?;
        let message = format!(
            "Successfully created job template '{}' (ID: {})",
            template.name, template.id
        );

        Ok(CreateTemplateOutput { template, message })
    }

    // ── Health & scaling ─────────────────────────────────────────────────

    pub fn health_check(&self, input: HealthCheckInput) -> HealthCheckOutput {
        let single = input
            .component
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "all");

        let to_check: Vec<&str> = match single {
            Some(component) => vec![component],
            None => HEALTH_COMPONENTS.to_vec(),
        };

        let mut components = BTreeMap::new();
        let mut recommendations = Vec::new();

        for name in to_check {
            let health = self.health.check_component(name, input.deep);

            match health.status.as_str() {
                "warning" => match name {
                    "database" => recommendations.push(
                        "Consider optimizing database queries or scaling database resources"
                            .to_string(),
                    ),
                    "cache" => recommendations.push(
                        "Check cache hit ratio and consider increasing cache size".to_string(),
                    ),
                    "api" => recommendations.push(
                        "Monitor API response times and consider horizontal scaling".to_string(),
                    ),
                    _ => {}
                },
                "critical" => recommendations.push(format!(
                    "URGENT: {name} component requires immediate attention"
                )),
                _ => {}
            }

            components.insert(name.to_string(), health);
        }

        let overall_status = if components.values().any(|c| c.status == "critical") {
            "critical"
        } else if components.values().any(|c| c.status == "warning") {
            "warning"
        } else {
            "healthy"
        };

        HealthCheckOutput {
            overall_status: overall_status.into(),
            components,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            recommendations,
        }
    }

    pub fn autoscale(&self, input: AutoscaleInput) -> ClientResult<AutoscaleOutput> {
        if input.action.is_empty() {
            return Err(ClientError::validation("action is required"));
        }

        let service = input
            .service
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "api".to_string());

        let old_replicas = self.baseline_replicas;
        let mut new_replicas = old_replicas;
        let mut job_id = None;
        let reason;

        match input.action.as_str() {
            "scale_up" => {
                new_replicas = if input.replicas > 0 {
                    input.replicas
                } else {
                    old_replicas + 2
                };
                reason = "Manual scale up requested".to_string();
                job_id = Some(self.minter.mint());
            }
            "scale_down" => {
                new_replicas = if input.replicas > 0 {
                    input.replicas
                } else {
                    (old_replicas - 1).max(1)
                };
                reason = "Manual scale down requested".to_string();
                job_id = Some(self.minter.mint());
            }
            "analyze" => {
                reason = self
                    .health
                    .analyze_load(input.threshold.as_deref().unwrap_or(""));
                if reason.contains("high") {
                    new_replicas = old_replicas + 1;
                } else if reason.contains("low") {
                    new_replicas = (old_replicas - 1).max(1);
                }
            }
            "auto" => {
                let metrics = self.health.system_metrics();
                let cpu = metrics.get("cpu").copied().unwrap_or(0.0);
                let memory = metrics.get("memory").copied().unwrap_or(0.0);

                if cpu > 80.0 || memory > 85.0 {
                    new_replicas = old_replicas + 2;
                    reason = "Auto-scaling up due to high resource usage".to_string();
                    job_id = Some(self.minter.mint());
                } else if cpu < 20.0 && memory < 30.0 && old_replicas > 1 {
                    new_replicas = (old_replicas - 1).max(1);
                    reason = "Auto-scaling down due to low resource usage".to_string();
                    job_id = Some(self.minter.mint());
                } else {
                    reason = "No scaling needed - metrics within normal range".to_string();
                }
            }
            other => {
                return Err(ClientError::validation(format!("unknown action: {other}")));
            }
        }

        let status = if job_id.is_some() {
            "job_launched"
        } else {
            "completed"
        };

        if job_id.is_some() {
            info!(
                "Autoscale {}: {} {} -> {} replicas",
                input.action, service, old_replicas, new_replicas
            );
        }

        Ok(AutoscaleOutput {
            action: input.action,
            service,
            old_replicas,
            new_replicas,
            reason,
            job_id,
            status: status.into(),
        })
    }

    // ── Diagnostics ──────────────────────────────────────────────────────

    pub fn cache_stats(&self) -> CacheStatsOutput {
        let awx = self.awx.cache_stats();
        let prometheus = self.prometheus.as_ref().map(|p| p.cache_stats());

        let mut summary = format!(
            "AWX cache: {} hits, {} misses ({:.1}% hit rate), {} entries",
            awx.hits, awx.misses, awx.hit_rate, awx.current_size
        );
        match &prometheus {
            Some(prom) => summary.push_str(&format!(
                ". Prometheus cache: {} hits, {} misses ({:.1}% hit rate), {} entries",
                prom.hits, prom.misses, prom.hit_rate, prom.current_size
            )),
            None => summary.push_str(". Prometheus cache: not configured"),
        }

        CacheStatsOutput {
            awx,
            prometheus,
            summary,
        }
    }
}

fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Elapsed wall-clock for a job: finished−started once terminal,
/// now−started while in flight, else whatever the backend reported.
fn elapsed_seconds(job: &Job) -> i64 {
    match (job.started, job.finished) {
        (Some(started), Some(finished)) => (finished - started).num_seconds(),
        (Some(started), None) if !is_terminal_status(&job.status) => {
            (Utc::now() - started).num_seconds()
        }
        _ => job.elapsed.round() as i64,
    }
}

/// Render seconds the way a human reads durations: `30s`, `2m5s`, `1h0m30s`.
fn format_duration(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awx::AwxConfig;
    use crate::services::health::SimulatedHealth;
    use std::collections::HashMap;

    struct StubOracle {
        cpu: f64,
        memory: f64,
        component_status: &'static str,
    }

    impl HealthOracle for StubOracle {
        fn check_component(&self, _component: &str, _deep: bool) -> ComponentHealth {
            ComponentHealth {
                status: self.component_status.into(),
                details: String::new(),
                metrics: HashMap::new(),
                last_checked: String::new(),
            }
        }

        fn system_metrics(&self) -> HashMap<String, f64> {
            [
                ("cpu".to_string(), self.cpu),
                ("memory".to_string(), self.memory),
            ]
            .into_iter()
            .collect()
        }

        fn analyze_load(&self, threshold: &str) -> String {
            SimulatedHealth.analyze_load(threshold)
        }
    }

    fn service_with(oracle: Arc<dyn HealthOracle>) -> AutomationService {
        let awx = Arc::new(
            AwxClient::new(AwxConfig {
                base_url: "http://127.0.0.1:1".into(),
                token: Some("test".into()),
                ..Default::default()
            })
            .unwrap(),
        );
        AutomationService::new(awx, None, oracle)
    }

    #[tokio::test]
    async fn test_autoscale_scale_up_default() {
        let service = service_with(Arc::new(SimulatedHealth));
        let output = service
            .autoscale(AutoscaleInput {
                action: "scale_up".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(output.old_replicas, 3);
        assert_eq!(output.new_replicas, 5);
        assert_eq!(output.status, "job_launched");
        assert!(output.job_id.is_some());
        assert_eq!(output.service, "api");
    }

    #[tokio::test]
    async fn test_autoscale_scale_up_explicit_replicas() {
        let service = service_with(Arc::new(SimulatedHealth));
        let output = service
            .autoscale(AutoscaleInput {
                action: "scale_up".into(),
                replicas: 7,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(output.new_replicas, 7);
    }

    #[tokio::test]
    async fn test_autoscale_scale_down_floors_at_one() {
        let service = service_with(Arc::new(SimulatedHealth));
        let output = service
            .autoscale(AutoscaleInput {
                action: "scale_down".into(),
                ..Default::default()
            })
            .unwrap();
        // baseline 3 -> 2, never below 1
        assert_eq!(output.new_replicas, 2);
        assert!(output.new_replicas >= 1);
    }

    #[tokio::test]
    async fn test_autoscale_auto_scales_up_on_high_cpu() {
        let service = service_with(Arc::new(StubOracle {
            cpu: 92.0,
            memory: 40.0,
            component_status: "healthy",
        }));
        let output = service
            .autoscale(AutoscaleInput {
                action: "auto".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(output.new_replicas, 5);
        assert!(output.reason.contains("high resource usage"));
        assert!(output.job_id.is_some());
    }

    #[tokio::test]
    async fn test_autoscale_auto_noop_in_normal_range() {
        let service = service_with(Arc::new(StubOracle {
            cpu: 50.0,
            memory: 50.0,
            component_status: "healthy",
        }));
        let output = service
            .autoscale(AutoscaleInput {
                action: "auto".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(output.new_replicas, 3);
        assert!(output.job_id.is_none());
        assert_eq!(output.status, "completed");
    }

    #[tokio::test]
    async fn test_autoscale_unknown_action() {
        let service = service_with(Arc::new(SimulatedHealth));
        let err = service
            .autoscale(AutoscaleInput {
                action: "explode".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }

    #[tokio::test]
    async fn test_health_check_rolls_up_warning() {
        // SimulatedHealth reports "cache" as warning, rest healthy
        let service = service_with(Arc::new(SimulatedHealth));
        let output = service.health_check(HealthCheckInput::default());

        assert_eq!(output.overall_status, "warning");
        assert_eq!(output.components.len(), 6);
        assert!(output.recommendations.iter().any(|r| r.contains("cache")));
    }

    #[tokio::test]
    async fn test_health_check_critical_wins() {
        let service = service_with(Arc::new(StubOracle {
            cpu: 0.0,
            memory: 0.0,
            component_status: "critical",
        }));
        let output = service.health_check(HealthCheckInput {
            component: Some("api".into()),
            deep: false,
        });

        assert_eq!(output.overall_status, "critical");
        assert_eq!(output.components.len(), 1);
        assert!(output.recommendations[0].starts_with("URGENT"));
    }

    #[tokio::test]
    async fn test_cache_stats_summary_without_prometheus() {
        let service = service_with(Arc::new(SimulatedHealth));
        let stats = service.cache_stats();
        assert!(stats.summary.contains("AWX cache"));
        assert!(stats.summary.contains("not configured"));
        assert!(stats.prometheus.is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(125), "2m5s");
        assert_eq!(format_duration(3630), "1h0m30s");
        assert_eq!(format_duration(-5), "0s");
    }
}

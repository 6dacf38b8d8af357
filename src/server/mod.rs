//! MCP server surface
//!
//! Tool implementations extract and coerce arguments, call the façades, and
//! render results through [`render`]. Argument coercion failures become
//! error tool results without touching a façade.

mod prompts;
mod render;
mod requests;
mod resources;

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};

use crate::services::models::*;
use crate::services::{AutomationService, ObservabilityService};
use requests::*;

#[derive(Clone)]
pub struct AutosphereServer {
    automation: Arc<AutomationService>,
    observability: Arc<ObservabilityService>,
    /// Shown in the `autosphere://config` resource
    pub(crate) awx_base_url: String,
    tool_router: ToolRouter<Self>,
}

impl AutosphereServer {
    pub fn new(
        automation: Arc<AutomationService>,
        observability: Arc<ObservabilityService>,
        awx_base_url: impl Into<String>,
    ) -> Self {
        Self {
            automation,
            observability,
            awx_base_url: awx_base_url.into(),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl AutosphereServer {
    // ── AWX automation ───────────────────────────────────────────────────

    #[tool(description = "Launch an AWX job template (deployment, scaling, health checks, backups).")]
    async fn launch_awx_job(
        &self,
        Parameters(req): Parameters<LaunchJobRequest>,
    ) -> Result<CallToolResult, McpError> {
        let extra_vars = match parse_extra_vars(req.extra_vars.as_deref()) {
            Ok(vars) => vars,
            Err(e) => return Ok(render::error_text(e.to_string())),
        };

        let input = LaunchJobInput {
            job_template: req.job_template,
            extra_vars,
            inventory: req.inventory.unwrap_or_default(),
            limit: req.limit.unwrap_or_default(),
            tags: req.tags.unwrap_or_default(),
            skip_tags: req.skip_tags.unwrap_or_default(),
        };

        match self.automation.launch_job(input).await {
            Ok(result) => Ok(render::dual(render::launch(&result), &result)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "Check the status of a running or completed AWX job.")]
    async fn check_awx_job(
        &self,
        Parameters(req): Parameters<CheckJobRequest>,
    ) -> Result<CallToolResult, McpError> {
        let job_id = match parse_int("job_id", &req.job_id) {
            Ok(id) => id,
            Err(e) => return Ok(render::error_text(e.to_string())),
        };

        match self.automation.check_job_status(job_id).await {
            Ok(output) => Ok(render::dual(render::job_status(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "List recent AWX jobs with status and timing.")]
    async fn list_awx_jobs(
        &self,
        Parameters(req): Parameters<ListJobsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let limit = match parse_optional_int("limit", req.limit.as_deref()) {
            Ok(limit) => limit,
            Err(e) => return Ok(render::error_text(e.to_string())),
        };

        let input = ListJobsInput {
            limit,
            status: req.status,
        };

        match self.automation.list_jobs(input).await {
            Ok(output) => Ok(render::dual(render::list_jobs(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "Fetch the raw stdout of an AWX job.")]
    async fn get_job_output(
        &self,
        Parameters(req): Parameters<JobOutputRequest>,
    ) -> Result<CallToolResult, McpError> {
        let job_id = match parse_int("job_id", &req.job_id) {
            Ok(id) => id,
            Err(e) => return Ok(render::error_text(e.to_string())),
        };

        match self.automation.get_job_output(job_id).await {
            Ok(output) => Ok(render::dual(render::job_output(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "Request cancellation of an AWX job.")]
    async fn cancel_awx_job(
        &self,
        Parameters(req): Parameters<CancelJobRequest>,
    ) -> Result<CallToolResult, McpError> {
        let job_id = match parse_int("job_id", &req.job_id) {
            Ok(id) => id,
            Err(e) => return Ok(render::error_text(e.to_string())),
        };

        match self.automation.cancel_job(job_id).await {
            Ok(output) => Ok(render::dual(render::cancel(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "List AWX resources: templates, inventories, or projects.")]
    async fn list_awx_resources(
        &self,
        Parameters(req): Parameters<requests::ListResourcesRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.automation.list_resources(&req.resource_type).await {
            Ok(list) => Ok(render::dual(render::resources(&list), &list)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "List all AWX job templates.")]
    async fn list_job_templates(&self) -> Result<CallToolResult, McpError> {
        match self.automation.list_templates().await {
            Ok(output) => Ok(render::dual(render::templates(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "Create a new AWX job template.")]
    async fn create_job_template(
        &self,
        Parameters(req): Parameters<CreateTemplateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let parsed = (|| {
            Ok::<_, crate::error::ClientError>(CreateTemplateInput {
                name: req.name.clone(),
                description: req.description.clone().unwrap_or_default(),
                inventory: parse_int("inventory", &req.inventory)?,
                project: parse_int("project", &req.project)?,
                playbook: req.playbook.clone(),
                job_type: req.job_type.clone().unwrap_or_default(),
                verbosity: parse_verbosity(req.verbosity.as_deref())?,
            })
        })();

        let input = match parsed {
            Ok(input) => input,
            Err(e) => return Ok(render::error_text(e.to_string())),
        };

        match self.automation.create_template(input).await {
            Ok(output) => Ok(render::dual(render::create_template(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    // ── Health & scaling ─────────────────────────────────────────────────

    #[tool(description = "Health check for Autosphere components (api, database, cache, web, workers, monitoring).")]
    async fn health_check(
        &self,
        Parameters(req): Parameters<HealthCheckRequest>,
    ) -> Result<CallToolResult, McpError> {
        let input = HealthCheckInput {
            component: req.component,
            deep: parse_bool_flag(req.deep.as_deref()),
        };

        let output = self.automation.health_check(input);
        Ok(render::dual(render::health(&output), &output))
    }

    #[tool(description = "Manage autoscaling of Autosphere services (scale_up, scale_down, analyze, auto).")]
    async fn autoscale(
        &self,
        Parameters(req): Parameters<AutoscaleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let replicas = match parse_optional_int("replicas", req.replicas.as_deref()) {
            Ok(replicas) => replicas,
            Err(e) => return Ok(render::error_text(e.to_string())),
        };

        let input = AutoscaleInput {
            action: req.action,
            service: req.service,
            replicas,
            threshold: req.threshold,
        };

        match self.automation.autoscale(input) {
            Ok(output) => Ok(render::dual(render::autoscale(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "Cache statistics for the AWX and Prometheus clients.")]
    async fn get_cache_stats(&self) -> Result<CallToolResult, McpError> {
        let output = self.automation.cache_stats();
        Ok(render::dual(render::cache_stats(&output), &output))
    }

    // ── Observability ────────────────────────────────────────────────────

    #[tool(description = "Execute a PromQL query (instant, or range with start_time/end_time).")]
    async fn query_prometheus(
        &self,
        Parameters(req): Parameters<QueryPrometheusRequest>,
    ) -> Result<CallToolResult, McpError> {
        let input = QueryMetricsInput {
            query: req.query,
            start_time: req.start_time,
            end_time: req.end_time,
            step: req.step,
        };

        match self.observability.query_metrics(input).await {
            Ok(output) => Ok(render::dual(render::query_metrics(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "CPU, memory, and disk usage with health evaluation.")]
    async fn get_system_metrics(
        &self,
        Parameters(_req): Parameters<SystemMetricsRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.observability.get_system_metrics().await {
            Ok(output) => Ok(render::dual(render::system_metrics(&output), &output)),
            Err(e) => Ok(render::error_text(e.to_string())),
        }
    }

    #[tool(description = "List active alerts with severity tallies.")]
    async fn get_alerts(
        &self,
        Parameters(req): Parameters<AlertsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.observability.get_alerts(req.severity.as_deref());
        Ok(render::dual(render::alerts(&output), &output))
    }
}

#[tool_handler]
impl ServerHandler for AutosphereServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "autosphere-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Autosphere automation broker. Launch and track AWX jobs, manage job \
                 templates, check component health, autoscale services, and query \
                 Prometheus metrics. Job launches retry transient failures and report \
                 the job as pending; poll check_awx_job for progress."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: Self::resource_list(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_resource_text(&request.uri).ok_or_else(|| {
            McpError::invalid_params(format!("Unknown resource URI: {}", request.uri), None)
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: prompts::prompt_list(),
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        match request.name.as_str() {
            "deployment_planning" => Ok(prompts::deployment_planning(request.arguments.as_ref())),
            "troubleshooting" => Ok(prompts::troubleshooting(request.arguments.as_ref())),
            other => Err(McpError::invalid_params(
                format!("Unknown prompt: {other}"),
                None,
            )),
        }
    }
}

//! AWX REST client
//!
//! One pooled HTTP client per instance, lazily resolved credentials, and a
//! TTL cache with fixed keys per endpoint. Job-status entries are served
//! from cache only once the job has reached a terminal state, so in-flight
//! jobs are always re-polled.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::awx::auth::{AuthStrategy, Authenticator};
use crate::awx::models::{
    is_cacheable_status, CreateJobTemplateRequest, ErrorDetail, Inventory, Job, JobTemplate,
    Paginated, Project,
};
use crate::cache::{CacheStats, TtlCache};
use crate::error::{ClientError, ClientResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TIMEOUT: Duration = Duration::from_secs(120);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 10;

pub(crate) const KEY_JOB_TEMPLATES: &str = "awx:job_templates";
const KEY_INVENTORIES: &str = "awx:inventories";
const KEY_PROJECTS: &str = "awx:projects";

const TEMPLATES_TTL: Duration = Duration::from_secs(5 * 60);
const INVENTORIES_TTL: Duration = Duration::from_secs(5 * 60);
const PROJECTS_TTL: Duration = Duration::from_secs(10 * 60);
const JOB_ACTIVE_TTL: Duration = Duration::from_secs(10);
const JOB_TERMINAL_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Default)]
pub struct AwxConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
    pub debug: bool,
}

pub struct AwxClient {
    base_url: String,
    http: reqwest::Client,
    auth: Authenticator,
    cache: TtlCache,
    debug: bool,
}

impl AwxClient {
    pub fn new(config: AwxConfig) -> ClientResult<Self> {
        let timeout = config
            .timeout
            .unwrap_or(DEFAULT_TIMEOUT)
            .min(MAX_TIMEOUT);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            auth: Authenticator::new(config.token, config.username, config.password),
            cache: TtlCache::new(),
            debug: config.debug,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The resolved authentication strategy (resolving it on first use).
    pub(crate) async fn auth_strategy(&self) -> ClientResult<&AuthStrategy> {
        self.auth.strategy(&self.http, &self.base_url).await
    }

    // ── Request core ─────────────────────────────────────────────────────

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> ClientResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let strategy = self.auth_strategy().await?;

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");
        req = strategy.apply(req);

        if self.debug {
            debug!("AWX API request: {} {}", method, url);
            if let Some(body) = body {
                debug!("Request body: {}", body);
            }
        }

        if let Some(body) = body {
            req = req.json(body);
        }

        Ok(req.send().await?)
    }

    /// Execute a request and decode its JSON response. In debug mode the
    /// full body is buffered so it can be logged; otherwise the decode
    /// streams straight off the socket and only the status is logged.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> ClientResult<T> {
        let resp = self.send(method.clone(), endpoint, body).await?;
        let status = resp.status().as_u16();

        if self.debug {
            let text = resp.text().await?;
            debug!("AWX API response: {} - {}", status, text);
            if status >= 400 {
                return Err(extract_error(status, &text));
            }
            Ok(serde_json::from_str(&text)?)
        } else {
            info!("AWX API: {} {} -> {}", method, endpoint, status);
            if status >= 400 {
                let text = resp.text().await.unwrap_or_default();
                return Err(extract_error(status, &text));
            }
            Ok(resp.json().await?)
        }
    }

    /// Execute a request where the response body does not matter.
    async fn request_discard(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> ClientResult<()> {
        let resp = self.send(method.clone(), endpoint, body).await?;
        let status = resp.status().as_u16();

        if self.debug {
            let text = resp.text().await.unwrap_or_default();
            debug!("AWX API response: {} - {}", status, text);
            if status >= 400 {
                return Err(extract_error(status, &text));
            }
        } else {
            info!("AWX API: {} {} -> {}", method, endpoint, status);
            if status >= 400 {
                let text = resp.text().await.unwrap_or_default();
                return Err(extract_error(status, &text));
            }
        }
        Ok(())
    }

    // ── Templates ────────────────────────────────────────────────────────

    pub async fn get_job_templates(&self) -> ClientResult<Vec<JobTemplate>> {
        if let Some(templates) = self.cache.get::<Vec<JobTemplate>>(KEY_JOB_TEMPLATES) {
            if self.debug {
                debug!("Cache HIT: job templates ({} items)", templates.len());
            }
            return Ok(templates);
        }

        let list: Paginated<JobTemplate> = self
            .request(Method::GET, "/api/v2/job_templates/", None)
            .await?;

        self.cache
            .set(KEY_JOB_TEMPLATES, list.results.clone(), TEMPLATES_TTL);
        Ok(list.results)
    }

    /// Resolve a template by exact name, then by numeric id.
    pub async fn get_template_by_name_or_id(&self, name_or_id: &str) -> ClientResult<JobTemplate> {
        let templates = self.get_job_templates().await?;
        resolve_template(&templates, name_or_id)
    }

    pub async fn create_job_template(
        &self,
        spec: &CreateJobTemplateRequest,
    ) -> ClientResult<JobTemplate> {
        let body = serde_json::to_value(spec)?;
        let template: JobTemplate = self
            .request(Method::POST, "/api/v2/job_templates/", Some(&body))
            .await?;

        // A new template makes the cached list stale
        self.cache.delete(KEY_JOB_TEMPLATES);

        info!(
            "Created job template: {} (ID: {})",
            template.name, template.id
        );
        Ok(template)
    }

    // ── Jobs ─────────────────────────────────────────────────────────────

    pub async fn get_jobs(&self, limit: i64, status: Option<&str>) -> ClientResult<Vec<Job>> {
        let mut params = Vec::new();
        if limit > 0 {
            params.push(format!("page_size={limit}"));
        }
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            params.push(format!("status={status}"));
        }

        let mut endpoint = String::from("/api/v2/jobs/");
        if !params.is_empty() {
            endpoint = format!("{endpoint}?{}", params.join("&"));
        }

        let list: Paginated<Job> = self.request(Method::GET, &endpoint, None).await?;
        Ok(list.results)
    }

    pub async fn get_job(&self, job_id: i64) -> ClientResult<Job> {
        let key = format!("awx:job:{job_id}");

        // Only terminal jobs are served from cache; anything still moving
        // must be re-polled even inside its TTL window.
        if let Some(job) = self.cache.get::<Job>(&key) {
            if is_cacheable_status(&job.status) {
                if self.debug {
                    debug!("Cache HIT: job {} (status: {})", job_id, job.status);
                }
                return Ok(job);
            }
        }

        let mut job: Job = self
            .request(Method::GET, &format!("/api/v2/jobs/{job_id}/"), None)
            .await?;

        // AWX reports an API path; callers want the browser URL
        job.url = format!("{}/#/jobs/playbook/{}", self.base_url, job_id);

        let ttl = match job.status.as_str() {
            "running" | "pending" => JOB_ACTIVE_TTL,
            _ => JOB_TERMINAL_TTL,
        };
        self.cache.set(key, job.clone(), ttl);

        Ok(job)
    }

    /// Raw stdout of a job, verbatim (not JSON).
    pub async fn get_job_output(&self, job_id: i64) -> ClientResult<String> {
        let url = format!("{}/api/v2/jobs/{job_id}/stdout/", self.base_url);
        let strategy = self.auth_strategy().await?;

        let resp = strategy.apply(self.http.get(&url)).send().await?;
        let status = resp.status().as_u16();
        if status >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(extract_error(status, &body));
        }

        Ok(resp.text().await?)
    }

    /// Request cancellation. AWX may accept the request before the job
    /// actually stops; callers report `cancel_requested`, not `canceled`.
    pub async fn cancel_job(&self, job_id: i64) -> ClientResult<()> {
        self.request_discard(
            Method::POST,
            &format!("/api/v2/jobs/{job_id}/cancel/"),
            Some(&serde_json::json!({})),
        )
        .await
    }

    // ── Inventories & projects ───────────────────────────────────────────

    pub async fn get_inventories(&self) -> ClientResult<Vec<Inventory>> {
        if let Some(inventories) = self.cache.get::<Vec<Inventory>>(KEY_INVENTORIES) {
            if self.debug {
                debug!("Cache HIT: inventories ({} items)", inventories.len());
            }
            return Ok(inventories);
        }

        let list: Paginated<Inventory> =
            self.request(Method::GET, "/api/v2/inventories/", None).await?;
        self.cache
            .set(KEY_INVENTORIES, list.results.clone(), INVENTORIES_TTL);
        Ok(list.results)
    }

    pub async fn get_projects(&self) -> ClientResult<Vec<Project>> {
        if let Some(projects) = self.cache.get::<Vec<Project>>(KEY_PROJECTS) {
            if self.debug {
                debug!("Cache HIT: projects ({} items)", projects.len());
            }
            return Ok(projects);
        }

        let list: Paginated<Project> =
            self.request(Method::GET, "/api/v2/projects/", None).await?;
        self.cache
            .set(KEY_PROJECTS, list.results.clone(), PROJECTS_TTL);
        Ok(list.results)
    }

    // ── Maintenance ──────────────────────────────────────────────────────

    /// Connectivity probe used at startup; fetches the template list.
    pub async fn test_connection(&self) -> ClientResult<()> {
        self.get_job_templates()
            .await
            .map(|_| ())
            .map_err(|e| ClientError::Backend(format!("AWX connection test failed: {e}")))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        if self.debug {
            debug!("AWX client cache cleared");
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Stop the cache sweeper.
    pub fn close(&self) {
        self.cache.close();
    }
}

/// Match by exact name first, then by numeric id. The not-found error
/// enumerates every available template; that text is part of the contract.
fn resolve_template(templates: &[JobTemplate], name_or_id: &str) -> ClientResult<JobTemplate> {
    if let Some(t) = templates.iter().find(|t| t.name == name_or_id) {
        return Ok(t.clone());
    }

    if let Ok(id) = name_or_id.parse::<i64>() {
        if let Some(t) = templates.iter().find(|t| t.id == id) {
            return Ok(t.clone());
        }
    }

    let available = templates
        .iter()
        .map(|t| format!("'{}' (ID: {})", t.name, t.id))
        .collect::<Vec<_>>()
        .join(", ");

    Err(ClientError::TemplateNotFound {
        identifier: name_or_id.to_string(),
        available,
    })
}

fn extract_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(detail) if !detail.detail.is_empty() => ClientError::Backend(detail.detail),
        _ => ClientError::Status {
            status,
            body: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: i64, name: &str) -> JobTemplate {
        JobTemplate {
            id,
            name: name.into(),
            description: String::new(),
            inventory: 1,
            project: 1,
            playbook: "site.yml".into(),
        }
    }

    #[test]
    fn test_resolve_by_name() {
        let templates = vec![template(7, "deploy"), template(8, "backup")];
        let t = resolve_template(&templates, "deploy").unwrap();
        assert_eq!(t.id, 7);
    }

    #[test]
    fn test_resolve_by_id_string() {
        let templates = vec![template(7, "deploy")];
        let t = resolve_template(&templates, "7").unwrap();
        assert_eq!(t.name, "deploy");
    }

    #[test]
    fn test_name_beats_numeric_id() {
        // A template literally named "8" must win over the template with id 8
        let templates = vec![template(8, "deploy"), template(9, "8")];
        let t = resolve_template(&templates, "8").unwrap();
        assert_eq!(t.id, 9);
    }

    #[test]
    fn test_not_found_enumerates_available() {
        let templates = vec![template(7, "deploy")];
        let err = resolve_template(&templates, "99").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("not found"));
        assert!(text.contains("'deploy' (ID: 7)"));
    }

    #[test]
    fn test_extract_error_prefers_detail() {
        let err = extract_error(403, r#"{"detail": "You do not have permission"}"#);
        assert!(matches!(err, ClientError::Backend(ref d) if d == "You do not have permission"));

        let err = extract_error(502, "upstream unavailable");
        assert!(matches!(err, ClientError::Status { status: 502, .. }));
    }
}

//! Prometheus client: PromQL instant and range queries with short-lived
//! caching of instant results

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::{CacheStats, TtlCache};
use crate::error::{ClientError, ClientResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const QUERY_TTL: Duration = Duration::from_secs(30);
const KEY_SYSTEM_METRICS: &str = "prom:system_metrics";

const CPU_QUERY: &str = r#"100 - (avg(rate(node_cpu_seconds_total{mode="idle"}[5m])) * 100)"#;
const MEMORY_QUERY: &str =
    r#"(1 - (node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes)) * 100"#;
const DISK_QUERY: &str = r#"100 - ((node_filesystem_avail_bytes{mountpoint="/"} / node_filesystem_size_bytes{mountpoint="/"}) * 100)"#;

#[derive(Debug, Clone, Default)]
pub struct PrometheusConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<Duration>,
    pub debug: bool,
}

pub struct PrometheusClient {
    base_url: String,
    http: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
    cache: TtlCache,
    debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: QueryData,
    #[serde(default)]
    pub error: String,
    #[serde(default, rename = "errorType")]
    pub error_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryData {
    #[serde(default, rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<MetricResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricResult {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl PrometheusClient {
    pub fn new(config: PrometheusConfig) -> ClientResult<Self> {
        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            username: config.username.filter(|s| !s.is_empty()),
            password: config.password.filter(|s| !s.is_empty()),
            cache: TtlCache::new(),
            debug: config.debug,
        })
    }

    /// Instant query at the current wall-clock time. Results are cached for
    /// 30 seconds keyed by a hash of the query text.
    pub async fn query(&self, query: &str) -> ClientResult<QueryResponse> {
        let cache_key = query_cache_key(query);

        if let Some(cached) = self.cache.get::<QueryResponse>(&cache_key) {
            if self.debug {
                debug!("Cache HIT: Prometheus query: {}", query);
            }
            return Ok(cached);
        }

        let now = Utc::now().timestamp().to_string();
        let resp = self
            .make_request("/api/v1/query", &[("query", query), ("time", &now)])
            .await?;

        self.cache.set(cache_key, resp.clone(), QUERY_TTL);
        Ok(resp)
    }

    /// Range query. Not cached; the parameter space is too wide to be worth
    /// it.
    pub async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> ClientResult<QueryResponse> {
        let start = start.timestamp().to_string();
        let end = end.timestamp().to_string();
        let step = step.as_secs().to_string();

        self.make_request(
            "/api/v1/query_range",
            &[
                ("query", query),
                ("start", &start),
                ("end", &end),
                ("step", &step),
            ],
        )
        .await
    }

    async fn make_request(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> ClientResult<QueryResponse> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut req = self.http.get(&url).query(params);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            req = req.basic_auth(username, Some(password));
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        if status >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let query_resp: QueryResponse = resp.json().await?;
        if query_resp.status != "success" {
            return Err(ClientError::MetricsQuery {
                error_type: query_resp.error_type,
                message: query_resp.error,
            });
        }

        Ok(query_resp)
    }

    /// CPU, memory, and disk usage percentages in one map. Sub-queries that
    /// fail or return nothing are simply absent from the result.
    pub async fn get_system_metrics(&self) -> ClientResult<HashMap<String, f64>> {
        if let Some(metrics) = self.cache.get::<HashMap<String, f64>>(KEY_SYSTEM_METRICS) {
            if self.debug {
                debug!("Cache HIT: system metrics");
            }
            return Ok(metrics);
        }

        let mut metrics = HashMap::new();

        for (name, query) in [
            ("cpu_usage_percent", CPU_QUERY),
            ("memory_usage_percent", MEMORY_QUERY),
            ("disk_usage_percent", DISK_QUERY),
        ] {
            if let Ok(resp) = self.query(query).await {
                if let Some(value) = first_value(&resp) {
                    metrics.insert(name.to_string(), value);
                }
            }
        }

        self.cache
            .set(KEY_SYSTEM_METRICS, metrics.clone(), QUERY_TTL);
        Ok(metrics)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn close(&self) {
        self.cache.close();
    }
}

/// `prom:query:` + hex of the first 8 bytes of sha256(query)
fn query_cache_key(query: &str) -> String {
    let hash = Sha256::digest(query.as_bytes());
    let hex: String = hash[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("prom:query:{hex}")
}

/// The scalar from the first sample of an instant-query result.
/// Prometheus encodes samples as `[timestamp, "value"]`.
pub fn first_value(resp: &QueryResponse) -> Option<f64> {
    resp.data
        .result
        .first()?
        .value
        .get(1)?
        .as_str()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_and_prefixed() {
        let a = query_cache_key("up");
        let b = query_cache_key("up");
        assert_eq!(a, b);
        assert!(a.starts_with("prom:query:"));
        // 8 bytes -> 16 hex chars
        assert_eq!(a.len(), "prom:query:".len() + 16);
    }

    #[test]
    fn test_cache_key_differs_per_query() {
        assert_ne!(query_cache_key("up"), query_cache_key("up == 1"));
    }

    #[test]
    fn test_first_value_parses_sample() {
        let resp: QueryResponse = serde_json::from_str(
            r#"{"status": "success", "data": {"resultType": "vector",
                "result": [{"metric": {}, "value": [1700000000, "42.5"]}]}}"#,
        )
        .unwrap();
        assert_eq!(first_value(&resp), Some(42.5));
    }

    #[test]
    fn test_first_value_empty_result() {
        let resp: QueryResponse = serde_json::from_str(
            r#"{"status": "success", "data": {"resultType": "vector", "result": []}}"#,
        )
        .unwrap();
        assert_eq!(first_value(&resp), None);
    }
}

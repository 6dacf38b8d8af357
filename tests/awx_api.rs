//! End-to-end tests against a local mock AWX API
//!
//! A real axum server stands in for AWX on an ephemeral port; the client,
//! launcher, and automation façade run against it unmodified.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use autosphere_mcp::awx::{AwxClient, AwxConfig, JobLauncher, LaunchOptions};
use autosphere_mcp::services::models::ListJobsInput;
use autosphere_mcp::services::{AutomationService, SimulatedHealth};

// ── Mock AWX ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockAwx {
    template_fetches: AtomicUsize,
    job_fetches: AtomicUsize,
    launch_attempts: AtomicUsize,
    /// Status returned by the permission probe (default 200)
    probe_status: Mutex<Option<u16>>,
    /// Statuses for successive launch attempts; exhausted list means 201
    launch_script: Mutex<Vec<u16>>,
    /// Job document served by GET /api/v2/jobs/{id}/
    job: Mutex<Option<Value>>,
    /// When set, reads require `Authorization: Bearer <this>`
    require_bearer: Mutex<Option<String>>,
    /// Last query string seen on the jobs list endpoint
    last_jobs_query: Mutex<String>,
}

impl MockAwx {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(required) = self.require_bearer.lock().unwrap().clone() else {
            return true;
        };
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {required}"))
            .unwrap_or(false)
    }
}

async fn list_templates(
    State(state): State<Arc<MockAwx>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Authentication credentials were not provided."}))).into_response();
    }

    state.template_fetches.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "count": 1,
        "results": [{
            "id": 7,
            "name": "deploy",
            "description": "Deploy the stack",
            "inventory": 1,
            "project": 2,
            "playbook": "site.yml",
        }],
    }))
    .into_response()
}

async fn create_template(Json(body): Json<Value>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 99,
            "name": body["name"],
            "description": body.get("description").cloned().unwrap_or(json!("")),
            "inventory": body["inventory"],
            "project": body["project"],
            "playbook": body["playbook"],
        })),
    )
}

async fn probe(State(state): State<Arc<MockAwx>>) -> impl IntoResponse {
    let status = state.probe_status.lock().unwrap().unwrap_or(200);
    (
        StatusCode::from_u16(status).unwrap(),
        Json(json!({"can_start_without_user_input": true})),
    )
}

async fn launch(State(state): State<Arc<MockAwx>>) -> impl IntoResponse {
    state.launch_attempts.fetch_add(1, Ordering::SeqCst);

    let next = {
        let mut script = state.launch_script.lock().unwrap();
        if script.is_empty() {
            201
        } else {
            script.remove(0)
        }
    };

    if next == 201 {
        (
            StatusCode::CREATED,
            Json(json!({"job": 1234, "ignored_fields": {}})),
        )
            .into_response()
    } else {
        (
            StatusCode::from_u16(next).unwrap(),
            Json(json!({"detail": "upstream error"})),
        )
            .into_response()
    }
}

async fn get_job(State(state): State<Arc<MockAwx>>, Path(id): Path<i64>) -> impl IntoResponse {
    state.job_fetches.fetch_add(1, Ordering::SeqCst);

    let job = state.job.lock().unwrap().clone().unwrap_or_else(|| {
        json!({
            "id": id,
            "name": "deploy job",
            "status": "successful",
            "started": "2026-01-01T00:00:00Z",
            "finished": "2026-01-01T00:00:30Z",
            "elapsed": 30.0,
            "job_template": 7,
        })
    });
    Json(job)
}

async fn list_jobs(State(state): State<Arc<MockAwx>>, RawQuery(query): RawQuery) -> impl IntoResponse {
    *state.last_jobs_query.lock().unwrap() = query.unwrap_or_default();
    Json(json!({
        "count": 1,
        "results": [{
            "id": 1234,
            "name": "deploy job",
            "status": "successful",
            "started": "2026-01-01T00:00:00Z",
            "finished": "2026-01-01T00:00:30Z",
            "elapsed": 30.0,
            "job_template": 7,
        }],
    }))
}

async fn cancel(Path(_id): Path<i64>) -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(json!({})))
}

async fn stdout(Path(_id): Path<i64>) -> impl IntoResponse {
    "PLAY [all] *****\nok: [web01]\n"
}

async fn mint_token(headers: HeaderMap) -> impl IntoResponse {
    // Token creation itself authenticates with basic auth
    if headers.get("authorization").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "no credentials"}))).into_response();
    }
    (StatusCode::CREATED, Json(json!({"token": "minted"}))).into_response()
}

async fn spawn_mock(state: Arc<MockAwx>) -> String {
    let app = Router::new()
        .route(
            "/api/v2/job_templates/",
            get(list_templates).post(create_template),
        )
        .route("/api/v2/job_templates/{id}/launch/", get(probe).post(launch))
        .route("/api/v2/jobs/", get(list_jobs))
        .route("/api/v2/jobs/{id}/", get(get_job))
        .route("/api/v2/jobs/{id}/cancel/", post(cancel))
        .route("/api/v2/jobs/{id}/stdout/", get(stdout))
        .route("/api/v2/tokens/", post(mint_token))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn client_for(base_url: &str) -> Arc<AwxClient> {
    Arc::new(
        AwxClient::new(AwxConfig {
            base_url: base_url.to_string(),
            token: Some("test-token".into()),
            ..Default::default()
        })
        .unwrap(),
    )
}

// ── Launch pipeline ──────────────────────────────────────────────────────

#[tokio::test]
async fn launch_by_name_happy_path() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state.clone()).await;
    let launcher = JobLauncher::new(client_for(&base));

    let mut options = LaunchOptions::new("deploy");
    options
        .extra_vars
        .insert("v".into(), Value::String("1".into()));

    let result = launcher.launch(options).await.unwrap();

    assert_eq!(result.job_id, 1234);
    assert_eq!(result.status, "pending");
    assert_eq!(result.url, format!("{base}/#/jobs/playbook/1234"));
    assert_eq!(result.launch_type, "api");
    assert_eq!(
        result.message,
        "Successfully launched job 1234 using template 'deploy' with 1 extra variables"
    );
    assert_eq!(state.launch_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn launch_by_unknown_id_enumerates_templates() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state.clone()).await;
    let launcher = JobLauncher::new(client_for(&base));

    let err = launcher
        .launch(LaunchOptions::new("99"))
        .await
        .unwrap_err();
    let text = err.to_string();

    assert!(text.contains("not found"), "got: {text}");
    assert!(text.contains("'deploy' (ID: 7)"), "got: {text}");
    assert_eq!(state.launch_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn launch_retries_transient_failures_then_succeeds() {
    let state = Arc::new(MockAwx::default());
    *state.launch_script.lock().unwrap() = vec![502, 500];
    let base = spawn_mock(state.clone()).await;
    let launcher = JobLauncher::new(client_for(&base));

    let start = Instant::now();
    let result = launcher.launch(LaunchOptions::new("deploy")).await.unwrap();

    assert_eq!(result.job_id, 1234);
    assert_eq!(state.launch_attempts.load(Ordering::SeqCst), 3);
    // Two fixed 2s delays between the three attempts
    assert!(start.elapsed() >= Duration::from_millis(3900));
}

#[tokio::test]
async fn permission_probe_403_aborts_before_any_attempt() {
    let state = Arc::new(MockAwx::default());
    *state.probe_status.lock().unwrap() = Some(403);
    let base = spawn_mock(state.clone()).await;
    let launcher = JobLauncher::new(client_for(&base));

    let err = launcher
        .launch(LaunchOptions::new("deploy"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("insufficient permissions"));
    assert_eq!(state.launch_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn launch_gives_up_after_three_attempts() {
    let state = Arc::new(MockAwx::default());
    *state.launch_script.lock().unwrap() = vec![502, 502, 502, 502];
    let base = spawn_mock(state.clone()).await;
    let launcher = JobLauncher::new(client_for(&base));

    let err = launcher
        .launch(LaunchOptions::new("deploy"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("all launch attempts failed"));
    assert_eq!(state.launch_attempts.load(Ordering::SeqCst), 3);
}

// ── Job status caching ───────────────────────────────────────────────────

#[tokio::test]
async fn terminal_job_is_served_from_cache() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state.clone()).await;
    let automation = AutomationService::new(client_for(&base), None, Arc::new(SimulatedHealth));

    let first = automation.check_job_status(1234).await.unwrap();
    assert_eq!(first.status, "successful");
    assert_eq!(first.elapsed_time, "30s");
    assert_eq!(
        first.playbook_results.as_ref().unwrap().get("changed"),
        Some(&json!(2))
    );
    assert_eq!(first.url, format!("{base}/#/jobs/playbook/1234"));

    let second = automation.check_job_status(1234).await.unwrap();
    assert_eq!(second.status, "successful");
    // Terminal state: the second read must not hit the backend
    assert_eq!(state.job_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn running_job_is_always_refetched() {
    let state = Arc::new(MockAwx::default());
    *state.job.lock().unwrap() = Some(json!({
        "id": 1234,
        "name": "deploy job",
        "status": "running",
        "started": "2026-01-01T00:00:00Z",
        "finished": null,
        "elapsed": 0.0,
        "job_template": 7,
    }));
    let base = spawn_mock(state.clone()).await;
    let client = client_for(&base);

    let first = client.get_job(1234).await.unwrap();
    assert_eq!(first.status, "running");
    let _ = client.get_job(1234).await.unwrap();

    // Non-terminal entries never satisfy a cache read, even inside the TTL
    assert_eq!(state.job_fetches.load(Ordering::SeqCst), 2);
}

// ── Template cache invalidation ──────────────────────────────────────────

#[tokio::test]
async fn create_template_invalidates_template_cache() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state.clone()).await;
    let client = client_for(&base);

    let _ = client.get_job_templates().await.unwrap();
    let _ = client.get_job_templates().await.unwrap();
    assert_eq!(state.template_fetches.load(Ordering::SeqCst), 1);

    let created = client
        .create_job_template(&autosphere_mcp::awx::models::CreateJobTemplateRequest {
            name: "x".into(),
            description: String::new(),
            inventory: 1,
            project: 2,
            playbook: "x.yml".into(),
            job_type: "run".into(),
            verbosity: 0,
        })
        .await
        .unwrap();
    assert_eq!(created.id, 99);

    let _ = client.get_job_templates().await.unwrap();
    assert_eq!(state.template_fetches.load(Ordering::SeqCst), 2);
}

// ── Authentication ───────────────────────────────────────────────────────

#[tokio::test]
async fn basic_auth_falls_through_to_token_creation() {
    let state = Arc::new(MockAwx::default());
    *state.require_bearer.lock().unwrap() = Some("minted".into());
    let base = spawn_mock(state.clone()).await;

    let client = AwxClient::new(AwxConfig {
        base_url: base,
        username: Some("admin".into()),
        password: Some("secret".into()),
        ..Default::default()
    })
    .unwrap();

    // Basic probe gets 401, /api/v2/tokens/ mints a bearer, reads succeed
    let templates = client.get_job_templates().await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name, "deploy");
}

#[tokio::test]
async fn missing_credentials_is_a_hard_error() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state).await;

    let client = AwxClient::new(AwxConfig {
        base_url: base,
        ..Default::default()
    })
    .unwrap();

    let err = client.get_job_templates().await.unwrap_err();
    assert!(err.to_string().contains("token or username/password"));
}

// ── Remaining operations ─────────────────────────────────────────────────

#[tokio::test]
async fn cancel_reports_cancel_requested_every_time() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state).await;
    let automation = AutomationService::new(client_for(&base), None, Arc::new(SimulatedHealth));

    for _ in 0..2 {
        let output = automation.cancel_job(1234).await.unwrap();
        assert_eq!(output.status, "cancel_requested");
        assert_eq!(output.job_id, 1234);
    }
}

#[tokio::test]
async fn job_output_is_returned_verbatim() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state).await;
    let automation = AutomationService::new(client_for(&base), None, Arc::new(SimulatedHealth));

    let output = automation.get_job_output(1234).await.unwrap();
    assert_eq!(output.output, "PLAY [all] *****\nok: [web01]\n");
}

#[tokio::test]
async fn list_jobs_zero_limit_uses_default_page_size() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state.clone()).await;
    let automation = AutomationService::new(client_for(&base), None, Arc::new(SimulatedHealth));

    let output = automation
        .list_jobs(ListJobsInput {
            limit: 0,
            status: None,
        })
        .await
        .unwrap();

    assert_eq!(output.count, 1);
    let query = state.last_jobs_query.lock().unwrap().clone();
    assert!(query.contains("page_size=20"), "got query: {query}");
}

#[tokio::test]
async fn list_jobs_forwards_status_filter() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state.clone()).await;
    let automation = AutomationService::new(client_for(&base), None, Arc::new(SimulatedHealth));

    let _ = automation
        .list_jobs(ListJobsInput {
            limit: 5,
            status: Some("failed".into()),
        })
        .await
        .unwrap();

    let query = state.last_jobs_query.lock().unwrap().clone();
    assert!(query.contains("page_size=5"));
    assert!(query.contains("status=failed"));
}

#[tokio::test]
async fn list_resources_is_consistent_with_list_templates() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state).await;
    let automation = AutomationService::new(client_for(&base), None, Arc::new(SimulatedHealth));

    let resources = automation.list_resources("templates").await.unwrap();
    let templates = automation.list_templates().await.unwrap();

    let autosphere_mcp::services::models::ResourceList::Templates(items) = resources else {
        panic!("expected templates variant");
    };
    assert_eq!(items.len(), templates.count);
    assert_eq!(items[0].id, templates.templates[0].id);
    assert_eq!(items[0].name, templates.templates[0].name);
}

#[tokio::test]
async fn list_resources_rejects_unknown_type() {
    let state = Arc::new(MockAwx::default());
    let base = spawn_mock(state).await;
    let automation = AutomationService::new(client_for(&base), None, Arc::new(SimulatedHealth));

    let err = automation.list_resources("droplets").await.unwrap_err();
    assert!(err.to_string().contains("unknown resource_type"));
}

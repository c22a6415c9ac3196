#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use devspace::config::ClientConfig;
use devspace::context::DevspaceContext;
use devspace::lifecycle::RecordingOpener;
use devspace::store::{MemoryTokenStore, TokenKey, TokenStore};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "s3cret";
pub const EMAIL: &str = "alice@example.com";
pub const WORKSPACE_URL: &str = "https://ws1.example";

/// In-process fake of the workspace backend.
pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<Mock>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn spawn_backend() -> Result<MockBackend> {
    let state = Arc::new(Mock::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind mock backend")?;
    let addr = listener.local_addr().context("mock backend addr")?;
    let app = router(state.clone());
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(MockBackend {
        base_url: format!("http://{}", addr),
        state,
        task,
    })
}

/// A base URL nothing listens on.
pub async fn dead_url() -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind probe listener")?;
    let addr = listener.local_addr().context("probe addr")?;
    drop(listener);
    Ok(format!("http://{}", addr))
}

pub struct TestClient {
    pub ctx: DevspaceContext,
    pub store: Arc<MemoryTokenStore>,
    pub opener: Arc<RecordingOpener>,
    _state_dir: tempfile::TempDir,
}

pub fn client_for(base_url: &str) -> Result<TestClient> {
    client_with(base_url, |_| {})
}

pub fn client_with(base_url: &str, tweak: impl FnOnce(&mut ClientConfig)) -> Result<TestClient> {
    let state_dir = tempfile::tempdir().context("create state tempdir")?;
    let mut config = ClientConfig::new(base_url, state_dir.path());
    config.lifecycle_poll_interval = Duration::from_millis(20);
    config.log_poll_interval = Duration::from_millis(20);
    tweak(&mut config);

    let store = Arc::new(MemoryTokenStore::new());
    let opener = Arc::new(RecordingOpener::new());
    let ctx = DevspaceContext::new(config, store.clone(), opener.clone())?;
    Ok(TestClient {
        ctx,
        store,
        opener,
        _state_dir: state_dir,
    })
}

pub async fn logged_in(backend: &MockBackend) -> Result<TestClient> {
    logged_in_with(backend, |_| {}).await
}

pub async fn logged_in_with(
    backend: &MockBackend,
    tweak: impl FnOnce(&mut ClientConfig),
) -> Result<TestClient> {
    let client = client_with(&backend.base_url, tweak)?;
    client
        .ctx
        .session
        .login(USERNAME, PASSWORD)
        .await
        .context("log in against mock backend")?;
    Ok(client)
}

pub fn token(store: &MemoryTokenStore, key: TokenKey) -> Option<String> {
    store.get(key).ok().flatten()
}

pub fn workspace_json(status: &str, url: Option<&str>) -> Value {
    json!({
        "id": 1,
        "name": "demo",
        "owner_username": USERNAME,
        "container_status": status,
        "container_url": url,
        "status": "ignored",
        "created_at": "2024-01-01T00:00:00Z",
    })
}

#[derive(Default)]
pub struct Mock {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    access: String,
    refresh: String,
    issued: u32,
    hits: HashMap<&'static str, usize>,

    refresh_status: Option<StatusCode>,
    refresh_delay: Duration,
    me_status: Option<StatusCode>,
    logout_status: Option<StatusCode>,
    start_status: Option<StatusCode>,
    stop_status: Option<StatusCode>,
    login_omits_email: bool,
    is_admin: bool,

    statuses: VecDeque<Value>,
    log_batches: VecDeque<Result<Vec<String>, StatusCode>>,
}

impl Mock {
    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    fn hit(&self, name: &'static str) {
        self.with(|i| *i.hits.entry(name).or_default() += 1);
    }

    pub fn hits(&self, name: &str) -> usize {
        self.with(|i| i.hits.get(name).copied().unwrap_or(0))
    }

    /// Invalidates the access token the client holds.
    pub fn expire_access(&self) {
        self.with(|i| {
            i.issued += 1;
            i.access = format!("access-{}", i.issued);
        });
    }

    pub fn current_access(&self) -> String {
        self.with(|i| i.access.clone())
    }

    pub fn set_refresh_status(&self, status: StatusCode) {
        self.with(|i| i.refresh_status = Some(status));
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.with(|i| i.refresh_delay = delay);
    }

    pub fn set_me_status(&self, status: Option<StatusCode>) {
        self.with(|i| i.me_status = status);
    }

    pub fn set_logout_status(&self, status: StatusCode) {
        self.with(|i| i.logout_status = Some(status));
    }

    pub fn set_start_status(&self, status: StatusCode) {
        self.with(|i| i.start_status = Some(status));
    }

    pub fn set_stop_status(&self, status: StatusCode) {
        self.with(|i| i.stop_status = Some(status));
    }

    pub fn omit_login_email(&self) {
        self.with(|i| i.login_omits_email = true);
    }

    pub fn make_admin(&self) {
        self.with(|i| i.is_admin = true);
    }

    /// Successive `GET /api/workspaces/{id}/` bodies; the last one repeats.
    pub fn queue_statuses(&self, seq: &[(&str, Option<&str>)]) {
        self.with(|i| {
            i.statuses = seq
                .iter()
                .map(|(status, url)| workspace_json(status, *url))
                .collect();
        });
    }

    /// Successive log responses; the last one repeats.
    pub fn queue_logs(&self, batches: Vec<Result<Vec<&str>, StatusCode>>) {
        self.with(|i| {
            i.log_batches = batches
                .into_iter()
                .map(|b| b.map(|lines| lines.into_iter().map(str::to_string).collect()))
                .collect();
        });
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        self.with(|i| !i.access.is_empty() && presented == Some(i.access.as_str()))
    }
}

fn next_or_last<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

fn status_only(status: StatusCode) -> Response {
    (status, Json(json!({"error": format!("forced {}", status.as_u16())}))).into_response()
}

fn router(state: Arc<Mock>) -> Router {
    Router::new()
        .route("/api/jwt/login/", post(login))
        .route("/api/jwt/token/refresh/", post(refresh))
        .route("/api/jwt/me/", get(me))
        .route("/api/users/logout/", post(logout))
        .route("/api/users/register/", post(register))
        .route("/api/workspaces/", get(list_workspaces).post(create_workspace))
        .route("/api/workspaces/templates/", get(templates))
        .route("/api/workspaces/resources/", get(resources))
        .route(
            "/api/workspaces/:id/",
            get(get_workspace).delete(delete_workspace),
        )
        .route("/api/workspaces/:id/start/", post(start_workspace))
        .route("/api/workspaces/:id/stop/", post(stop_workspace))
        .route("/api/workspaces/:id/logs/", get(workspace_logs))
        .with_state(state)
}

async fn login(State(m): State<Arc<Mock>>, Json(body): Json<Value>) -> Response {
    m.hit("login");
    if body["username"] != USERNAME || body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response();
    }
    let (access, refresh, omit_email) = m.with(|i| {
        i.issued += 1;
        i.access = format!("access-{}", i.issued);
        i.refresh = "refresh-1".to_string();
        (i.access.clone(), i.refresh.clone(), i.login_omits_email)
    });
    let mut body = json!({"access": access, "refresh": refresh, "username": USERNAME});
    if !omit_email {
        body["email"] = json!(EMAIL);
    }
    Json(body).into_response()
}

async fn refresh(State(m): State<Arc<Mock>>, Json(body): Json<Value>) -> Response {
    m.hit("refresh");
    let delay = m.with(|i| i.refresh_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = m.with(|i| i.refresh_status) {
        return status_only(status);
    }
    let fresh = m.with(|i| {
        if i.refresh.is_empty() || body["refresh"] != i.refresh.as_str() {
            return None;
        }
        i.issued += 1;
        i.access = format!("access-{}", i.issued);
        Some(i.access.clone())
    });
    match fresh {
        Some(access) => Json(json!({"access": access})).into_response(),
        None => unauthorized(),
    }
}

async fn me(State(m): State<Arc<Mock>>, headers: HeaderMap) -> Response {
    m.hit("me");
    if let Some(status) = m.with(|i| i.me_status) {
        return status_only(status);
    }
    if !m.authorized(&headers) {
        return unauthorized();
    }
    let is_admin = m.with(|i| i.is_admin);
    Json(json!({"username": USERNAME, "email": EMAIL, "is_admin": is_admin})).into_response()
}

async fn logout(State(m): State<Arc<Mock>>) -> Response {
    m.hit("logout");
    match m.with(|i| i.logout_status) {
        Some(status) => status_only(status),
        None => Json(json!({})).into_response(),
    }
}

async fn register(State(m): State<Arc<Mock>>, Json(body): Json<Value>) -> Response {
    m.hit("register");
    if body["username"] == USERNAME {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "username already taken"})),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({"username": body["username"]}))).into_response()
}

async fn list_workspaces(State(m): State<Arc<Mock>>, headers: HeaderMap) -> Response {
    m.hit("list");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([workspace_json("running", Some(WORKSPACE_URL))])).into_response()
}

async fn create_workspace(
    State(m): State<Arc<Mock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    m.hit("create");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    if body["name"].as_str().is_none_or(str::is_empty) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "name is required"})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "7",
            "name": body["name"],
            "owner_username": USERNAME,
            "container_status": "created",
        })),
    )
        .into_response()
}

async fn get_workspace(
    State(m): State<Arc<Mock>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    m.hit("get");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    match m.with(|i| next_or_last(&mut i.statuses)) {
        Some(body) => Json(body).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn delete_workspace(
    State(m): State<Arc<Mock>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    m.hit("delete");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn start_workspace(
    State(m): State<Arc<Mock>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    m.hit("start");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    match m.with(|i| i.start_status) {
        Some(status) => status_only(status),
        None => Json(json!({"status": "starting"})).into_response(),
    }
}

async fn stop_workspace(
    State(m): State<Arc<Mock>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    m.hit("stop");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    match m.with(|i| i.stop_status) {
        Some(status) => status_only(status),
        None => Json(json!({"status": "stopped"})).into_response(),
    }
}

async fn workspace_logs(
    State(m): State<Arc<Mock>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    m.hit("logs");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    match m.with(|i| next_or_last(&mut i.log_batches)) {
        Some(Ok(lines)) => Json(json!({"logs": lines.join("\n")})).into_response(),
        Some(Err(status)) => status_only(status),
        None => Json(json!({"logs": ""})).into_response(),
    }
}

async fn templates(State(m): State<Arc<Mock>>, headers: HeaderMap) -> Response {
    m.hit("templates");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {"id": 1, "name": "Rust", "language": "rust", "repository_url": "https://example.com/rust.git"},
        {"id": 2, "name": "Blank"},
    ]))
    .into_response()
}

async fn resources(State(m): State<Arc<Mock>>, headers: HeaderMap) -> Response {
    m.hit("resources");
    if !m.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {"id": 1, "name": "small", "cpu_count": 2, "memory_gb": 4.0, "disk_space_gb": 20.0, "price_per_hour": "0.05"},
    ]))
    .into_response()
}

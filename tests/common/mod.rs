//! In-process mock of the workspace management + SQL APIs.
//!
//! Each test spins one (or two) of these on a free port and points real
//! `WorkspaceClient`s at them. State is a plain mutex-guarded struct the
//! tests can seed beforehand and inspect afterwards.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub type Shared = Arc<Mutex<WorkspaceState>>;

#[derive(Default)]
pub struct WorkspaceState {
    pub catalogs: Vec<Value>,
    pub schemas: Vec<Value>,
    pub tables: Vec<Value>,
    pub volumes: Vec<Value>,
    pub external_locations: Vec<Value>,
    /// (securable type, full name) → principal → privileges. An entry with an
    /// empty map means "exists, no grants"; a missing entry means 404.
    pub grants: HashMap<(String, String), HashMap<String, Vec<String>>>,
    pub shares: Vec<String>,
    pub recipients: Vec<Value>,
    pub providers: Vec<Value>,

    // Observations the tests assert on.
    pub statements: Vec<String>,
    pub volume_owner_updates: Vec<(String, String)>,
    pub permission_updates: Vec<Value>,
    pub share_updates: Vec<Value>,
    pub share_permission_updates: Vec<Value>,

    /// Statements containing any of these markers report FAILED.
    pub fail_statement_containing: Vec<String>,
    /// Statements containing any of these markers come back PENDING on
    /// submit and reach their terminal state only via get-statement.
    pub slow_statement_containing: Vec<String>,
    /// Statements containing any of these markers never leave RUNNING.
    pub hang_statement_containing: Vec<String>,
}

impl WorkspaceState {
    pub fn add_catalog(&mut self, name: &str, catalog_type: &str) {
        self.catalogs
            .push(json!({"name": name, "catalog_type": catalog_type}));
    }

    pub fn add_schema(&mut self, catalog: &str, name: &str) {
        self.schemas
            .push(json!({"name": name, "catalog_name": catalog}));
    }

    pub fn add_table(&mut self, catalog: &str, schema: &str, name: &str, table_type: &str) {
        self.tables.push(json!({
            "name": name,
            "catalog_name": catalog,
            "schema_name": schema,
            "table_type": table_type,
        }));
    }

    pub fn add_external_table(
        &mut self,
        catalog: &str,
        schema: &str,
        name: &str,
        location: &str,
    ) {
        self.tables.push(json!({
            "name": name,
            "catalog_name": catalog,
            "schema_name": schema,
            "table_type": "EXTERNAL",
            "storage_location": location,
        }));
    }

    pub fn add_view(&mut self, catalog: &str, schema: &str, name: &str, definition: &str) {
        self.tables.push(json!({
            "name": name,
            "catalog_name": catalog,
            "schema_name": schema,
            "table_type": "VIEW",
            "view_definition": definition,
        }));
    }

    pub fn add_location(&mut self, name: &str, url: &str) {
        self.external_locations.push(json!({"name": name, "url": url}));
    }

    pub fn add_volume(
        &mut self,
        catalog: &str,
        schema: &str,
        name: &str,
        volume_type: &str,
        location: &str,
        owner: &str,
    ) {
        self.volumes.push(json!({
            "name": name,
            "catalog_name": catalog,
            "schema_name": schema,
            "volume_type": volume_type,
            "storage_location": location,
            "owner": owner,
        }));
    }

    pub fn seed_grants(&mut self, securable: &str, full_name: &str, entries: &[(&str, &[&str])]) {
        let mut map = HashMap::new();
        for (principal, privs) in entries {
            map.insert(
                principal.to_string(),
                privs.iter().map(|p| p.to_string()).collect(),
            );
        }
        self.grants
            .insert((securable.to_string(), full_name.to_string()), map);
    }
}

pub struct MockWorkspace {
    pub state: Shared,
    pub addr: SocketAddr,
}

impl MockWorkspace {
    pub async fn start(state: WorkspaceState) -> Self {
        let shared: Shared = Arc::new(Mutex::new(state));
        let app = router(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            state: shared,
            addr,
        }
    }

    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, WorkspaceState> {
        self.state.lock().unwrap()
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route(
            "/api/2.1/unity-catalog/catalogs",
            get(list_catalogs).post(create_catalog),
        )
        .route(
            "/api/2.1/unity-catalog/schemas",
            get(list_schemas).post(create_schema),
        )
        .route("/api/2.1/unity-catalog/tables", get(list_tables))
        .route(
            "/api/2.1/unity-catalog/volumes",
            get(list_volumes).post(create_volume),
        )
        .route(
            "/api/2.1/unity-catalog/volumes/{full_name}",
            patch(update_volume),
        )
        .route(
            "/api/2.1/unity-catalog/external-locations",
            get(list_locations),
        )
        .route(
            "/api/2.1/unity-catalog/effective-permissions/{stype}/{name}",
            get(get_grants),
        )
        .route(
            "/api/2.1/unity-catalog/permissions/{stype}/{name}",
            patch(update_grants),
        )
        .route("/api/2.1/unity-catalog/shares", post(create_share))
        .route("/api/2.1/unity-catalog/shares/{name}", patch(update_share))
        .route(
            "/api/2.1/unity-catalog/shares/{name}/permissions",
            patch(update_share_permissions),
        )
        .route(
            "/api/2.1/unity-catalog/recipients",
            get(list_recipients).post(create_recipient),
        )
        .route("/api/2.1/unity-catalog/providers", get(list_providers))
        .route("/api/2.0/sql/statements", post(execute_statement))
        .route("/api/2.0/sql/statements/{id}", get(get_statement))
        .with_state(state)
}

fn err(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"error_code": code, "message": message})),
    )
}

fn ok(body: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(body))
}

// ─── Catalogs ────────────────────────────────────────────────────────────────

async fn list_catalogs(State(s): State<Shared>) -> Json<Value> {
    let s = s.lock().unwrap();
    Json(json!({"catalogs": s.catalogs}))
}

async fn create_catalog(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if s.catalogs.iter().any(|c| c["name"] == name.as_str()) {
        return err(
            StatusCode::BAD_REQUEST,
            "CATALOG_ALREADY_EXISTS",
            "catalog already exists",
        );
    }
    s.catalogs.push(body.clone());
    ok(body)
}

// ─── Schemas ─────────────────────────────────────────────────────────────────

async fn list_schemas(
    State(s): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let s = s.lock().unwrap();
    let catalog = q.get("catalog_name").cloned().unwrap_or_default();
    if !s.catalogs.iter().any(|c| c["name"] == catalog.as_str()) {
        return err(
            StatusCode::NOT_FOUND,
            "CATALOG_DOES_NOT_EXIST",
            "no such catalog",
        );
    }
    let schemas: Vec<&Value> = s
        .schemas
        .iter()
        .filter(|v| v["catalog_name"] == catalog.as_str())
        .collect();
    ok(json!({"schemas": schemas}))
}

async fn create_schema(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    let exists = s.schemas.iter().any(|v| {
        v["catalog_name"] == body["catalog_name"] && v["name"] == body["name"]
    });
    if exists {
        return err(
            StatusCode::CONFLICT,
            "SCHEMA_ALREADY_EXISTS",
            "schema already exists",
        );
    }
    s.schemas.push(body.clone());
    ok(body)
}

// ─── Tables / volumes / locations ────────────────────────────────────────────

async fn list_tables(
    State(s): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let s = s.lock().unwrap();
    let tables: Vec<&Value> = s
        .tables
        .iter()
        .filter(|v| {
            q.get("catalog_name").map_or(true, |c| v["catalog_name"] == c.as_str())
                && q.get("schema_name").map_or(true, |c| v["schema_name"] == c.as_str())
        })
        .collect();
    Json(json!({"tables": tables}))
}

async fn list_volumes(
    State(s): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let s = s.lock().unwrap();
    let volumes: Vec<&Value> = s
        .volumes
        .iter()
        .filter(|v| {
            q.get("catalog_name").map_or(true, |c| v["catalog_name"] == c.as_str())
                && q.get("schema_name").map_or(true, |c| v["schema_name"] == c.as_str())
        })
        .collect();
    Json(json!({"volumes": volumes}))
}

async fn create_volume(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    let exists = s.volumes.iter().any(|v| {
        v["catalog_name"] == body["catalog_name"]
            && v["schema_name"] == body["schema_name"]
            && v["name"] == body["name"]
    });
    if exists {
        return err(
            StatusCode::CONFLICT,
            "RESOURCE_ALREADY_EXISTS",
            "volume already exists",
        );
    }
    s.volumes.push(body.clone());
    ok(body)
}

async fn update_volume(
    State(s): State<Shared>,
    Path(full_name): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    let parts: Vec<&str> = full_name.splitn(3, '.').collect();
    if parts.len() != 3 {
        return err(StatusCode::BAD_REQUEST, "INVALID_PARAMETER_VALUE", "bad name");
    }
    let owner = body["owner"].as_str().unwrap_or_default().to_string();
    let found = s.volumes.iter_mut().find(|v| {
        v["catalog_name"] == parts[0] && v["schema_name"] == parts[1] && v["name"] == parts[2]
    });
    let Some(vol) = found else {
        return err(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            "no such volume",
        );
    };
    vol["owner"] = Value::String(owner.clone());
    let vol = vol.clone();
    s.volume_owner_updates.push((full_name, owner));
    ok(vol)
}

async fn list_locations(State(s): State<Shared>) -> Json<Value> {
    let s = s.lock().unwrap();
    Json(json!({"external_locations": s.external_locations}))
}

// ─── Grants ──────────────────────────────────────────────────────────────────

async fn get_grants(
    State(s): State<Shared>,
    Path((stype, name)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let s = s.lock().unwrap();
    let Some(grants) = s.grants.get(&(stype, name)) else {
        return err(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            "securable not found",
        );
    };
    let assignments: Vec<Value> = grants
        .iter()
        .map(|(principal, privs)| {
            let privileges: Vec<Value> =
                privs.iter().map(|p| json!({"privilege": p})).collect();
            json!({"principal": principal, "privileges": privileges})
        })
        .collect();
    ok(json!({"privilege_assignments": assignments}))
}

async fn update_grants(
    State(s): State<Shared>,
    Path((stype, name)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    s.permission_updates
        .push(json!({"securable": stype, "full_name": name, "body": body}));
    let Some(grants) = s.grants.get_mut(&(stype, name)) else {
        return err(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            "securable not found",
        );
    };
    for change in body["changes"].as_array().cloned().unwrap_or_default() {
        let principal = change["principal"].as_str().unwrap_or_default().to_string();
        let entry = grants.entry(principal).or_default();
        for p in change["add"].as_array().cloned().unwrap_or_default() {
            let p = p.as_str().unwrap_or_default().to_string();
            if !entry.contains(&p) {
                entry.push(p);
            }
        }
        for p in change["remove"].as_array().cloned().unwrap_or_default() {
            entry.retain(|x| x != p.as_str().unwrap_or_default());
        }
    }
    grants.retain(|_, privs| !privs.is_empty());
    ok(json!({}))
}

// ─── Sharing ─────────────────────────────────────────────────────────────────

async fn create_share(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if s.shares.contains(&name) {
        return err(
            StatusCode::BAD_REQUEST,
            "RESOURCE_ALREADY_EXISTS",
            "share already exists",
        );
    }
    s.shares.push(name.clone());
    ok(json!({"name": name}))
}

async fn update_share(
    State(s): State<Shared>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    if !s.shares.contains(&name) {
        return err(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            "no such share",
        );
    }
    s.share_updates
        .push(json!({"share": name, "body": body}));
    ok(json!({"name": name}))
}

async fn update_share_permissions(
    State(s): State<Shared>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    s.share_permission_updates
        .push(json!({"share": name, "body": body}));
    ok(json!({}))
}

async fn list_recipients(State(s): State<Shared>) -> Json<Value> {
    let s = s.lock().unwrap();
    Json(json!({"recipients": s.recipients}))
}

async fn create_recipient(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    let exists = s.recipients.iter().any(|r| r["name"] == body["name"]);
    if exists {
        return err(
            StatusCode::BAD_REQUEST,
            "RESOURCE_ALREADY_EXISTS",
            "recipient already exists",
        );
    }
    s.recipients.push(body.clone());
    ok(body)
}

async fn list_providers(State(s): State<Shared>) -> Json<Value> {
    let s = s.lock().unwrap();
    Json(json!({"providers": s.providers}))
}

// ─── SQL statements ──────────────────────────────────────────────────────────

fn statement_state(s: &WorkspaceState, text: &str, initial: bool) -> Value {
    let matches = |markers: &[String]| markers.iter().any(|m| text.contains(m.as_str()));
    if matches(&s.hang_statement_containing) {
        return json!({"state": "RUNNING"});
    }
    if initial && matches(&s.slow_statement_containing) {
        return json!({"state": "PENDING"});
    }
    if matches(&s.fail_statement_containing) {
        return json!({"state": "FAILED", "error": {"message": format!("injected failure for: {text}")}});
    }
    json!({"state": "SUCCEEDED"})
}

async fn execute_statement(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut s = s.lock().unwrap();
    let text = body["statement"].as_str().unwrap_or_default().to_string();
    let id = format!("stmt-{}", s.statements.len());
    s.statements.push(text.clone());
    let status = statement_state(&s, &text, true);
    ok(json!({"statement_id": id, "status": status}))
}

async fn get_statement(
    State(s): State<Shared>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let s = s.lock().unwrap();
    let index: usize = match id.strip_prefix("stmt-").and_then(|n| n.parse().ok()) {
        Some(i) => i,
        None => {
            return err(
                StatusCode::NOT_FOUND,
                "RESOURCE_DOES_NOT_EXIST",
                "no such statement",
            )
        }
    };
    let Some(text) = s.statements.get(index) else {
        return err(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            "no such statement",
        );
    };
    let status = statement_state(&s, text, false);
    ok(json!({"statement_id": id, "status": status}))
}

// ─── Test config helper ──────────────────────────────────────────────────────

/// A resolved config pointing at two mock workspaces, tuned for tests
/// (instant polling, short statement deadline).
pub fn test_config(source: &MockWorkspace, target: &MockWorkspace) -> lakesync::config::SyncConfig {
    lakesync::config::SyncConfig {
        source_host: source.host(),
        source_token: "src-token".into(),
        target_host: target.host(),
        target_token: "tgt-token".into(),
        num_workers: 4,
        poll_backoff_secs: 0,
        statement_timeout_secs: 10,
        warehouse_id: Some("wh-test".into()),
        source_metastore_id: Some("src-metastore".into()),
        target_metastore_id: Some("tgt-metastore".into()),
        recipient_name: "dr_automation_recipient".into(),
        log: "warn".into(),
    }
}

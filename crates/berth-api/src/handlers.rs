//! Public REST handlers.
//!
//! Each handler resolves the session, delegates to the owning subsystem,
//! and maps its error onto a status code. Success and error payloads
//! carry variable and object names only, never credential values.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use berth_attach::AttachError;
use berth_binding::BindError;
use berth_session::{SessionError, SessionRegistry};
use berth_state::{EnvVar, SessionRecord, StateError, WorkloadRecord, WorkloadSource};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
pub(crate) struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub(crate) fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

pub(crate) fn state_status(err: &StateError) -> StatusCode {
    match err {
        StateError::NotFound(_) => StatusCode::NOT_FOUND,
        StateError::AlreadyExists(_) | StateError::Conflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn session_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::SessionNotFound(_) | SessionError::WorkloadNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        SessionError::NameTaken { .. } => StatusCode::CONFLICT,
        SessionError::DuplicateEnvVar(_)
        | SessionError::InvalidName(_)
        | SessionError::Endpoint(_) => StatusCode::BAD_REQUEST,
        SessionError::State(e) => state_status(e),
    }
}

fn attach_status(err: &AttachError) -> StatusCode {
    match err {
        AttachError::WorkloadNotFound(_) | AttachError::SourceNotFound(_) => StatusCode::NOT_FOUND,
        AttachError::VarCollision { .. }
        | AttachError::CopyNameCollision { .. }
        | AttachError::NotAttached { .. } => StatusCode::CONFLICT,
        AttachError::ReservedKind { .. } => StatusCode::FORBIDDEN,
        AttachError::State(e) => state_status(e),
    }
}

fn bind_status(err: &BindError) -> StatusCode {
    match err {
        BindError::ServiceNotFound(_) | BindError::WorkloadNotFound(_) => StatusCode::NOT_FOUND,
        BindError::NotReady { .. }
        | BindError::InvalidName(_)
        | BindError::UnsupportedType(_)
        | BindError::UnsupportedPlan(_) => StatusCode::BAD_REQUEST,
        BindError::DuplicateBind { .. }
        | BindError::NotBound { .. }
        | BindError::VarCollision { .. }
        | BindError::DeletionGuard { .. }
        | BindError::RetriesExhausted { .. } => StatusCode::CONFLICT,
        BindError::CredentialConvention { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        BindError::Tenancy(e) => session_status(e),
        BindError::State(e) => state_status(e),
    }
}

/// Resolve the session or produce the 404 every downstream call shares.
fn resolve_session(state: &ApiState, id: &str) -> Result<SessionRecord, Response> {
    SessionRegistry::new(state.store.clone())
        .lookup(id)
        .map_err(|e| error_response(&e.to_string(), StatusCode::NOT_FOUND))
}

// ── Views ──────────────────────────────────────────────────────────

/// Sanitized workload view: attachment and binding entries expose the
/// variable names, not the credential-object references behind them.
#[derive(serde::Serialize)]
pub struct WorkloadView {
    name: String,
    namespace: String,
    source: WorkloadSource,
    env: Vec<EnvVar>,
    attached: Vec<AttachmentView>,
    bound: Vec<BindingView>,
    phase: berth_state::WorkloadPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    ready_replicas: u32,
}

#[derive(serde::Serialize)]
struct AttachmentView {
    source: String,
    var_names: Vec<String>,
}

#[derive(serde::Serialize)]
struct BindingView {
    service: String,
    var_names: Vec<String>,
}

impl From<WorkloadRecord> for WorkloadView {
    fn from(w: WorkloadRecord) -> Self {
        WorkloadView {
            name: w.name,
            namespace: w.namespace,
            source: w.source,
            env: w.env,
            attached: w
                .attached_sources
                .into_iter()
                .map(|a| AttachmentView {
                    source: a.source,
                    var_names: a.var_names,
                })
                .collect(),
            bound: w
                .bound_services
                .into_iter()
                .map(|b| BindingView {
                    service: b.service,
                    var_names: b.vars.into_iter().map(|v| v.name).collect(),
                })
                .collect(),
            phase: w.phase,
            build_status: w.build_status,
            image: w.image,
            ready_replicas: w.ready_replicas,
        }
    }
}

#[derive(serde::Serialize)]
struct DataSourceView {
    name: String,
    var_names: Vec<String>,
}

#[derive(serde::Serialize)]
struct AttachView {
    workload: String,
    source: String,
    var_names: Vec<String>,
    already_attached: bool,
}

#[derive(serde::Serialize)]
struct BindView {
    service: String,
    workload: String,
    var_names: Vec<String>,
}

#[derive(serde::Serialize)]
struct ServiceStatusView {
    name: String,
    #[serde(rename = "type")]
    service_type: berth_core::ServiceType,
    plan: berth_core::ServicePlan,
    phase: berth_state::ServicePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    var_names: Option<Vec<String>>,
}

// ── Sessions ───────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
}

/// POST /api/v1/sessions
pub async fn register_session(
    State(state): State<ApiState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    match SessionRegistry::new(state.store.clone()).register(&req.display_name) {
        Ok(session) => (StatusCode::CREATED, ApiResponse::ok(session)).into_response(),
        Err(e) => error_response(&e.to_string(), session_status(&e)),
    }
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match resolve_session(&state, &id) {
        Ok(session) => ApiResponse::ok(session).into_response(),
        Err(resp) => resp,
    }
}

// ── Data sources ───────────────────────────────────────────────────

/// GET /api/v1/datasources
pub async fn list_datasources(State(state): State<ApiState>) -> impl IntoResponse {
    match berth_attach::list_sources(&state.store) {
        Ok(sources) => ApiResponse::ok(
            sources
                .into_iter()
                .map(|s| DataSourceView {
                    name: s.name,
                    var_names: s.var_names,
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => error_response(&e.to_string(), attach_status(&e)),
    }
}

// ── Workloads ──────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
pub struct CreateWorkloadRequest {
    pub name: String,
    pub source: WorkloadSource,
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

/// POST /api/v1/sessions/{id}/workloads
pub async fn create_workload(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<CreateWorkloadRequest>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_session::create_workload(&state.store, &session, &req.name, req.source, req.env) {
        Ok(workload) => (
            StatusCode::CREATED,
            ApiResponse::ok(WorkloadView::from(workload)),
        )
            .into_response(),
        Err(e) => error_response(&e.to_string(), session_status(&e)),
    }
}

/// GET /api/v1/sessions/{id}/workloads/{name}
pub async fn get_workload(
    State(state): State<ApiState>,
    Path((id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.store.get_workload(&session.namespace, &name) {
        Ok(Some(workload)) => ApiResponse::ok(WorkloadView::from(workload)).into_response(),
        Ok(None) => error_response("workload not found", StatusCode::NOT_FOUND),
        Err(e) => error_response(&e.to_string(), state_status(&e)),
    }
}

/// DELETE /api/v1/sessions/{id}/workloads/{name}
pub async fn delete_workload(
    State(state): State<ApiState>,
    Path((id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_session::delete_workload(&state.store, &session, &name) {
        Ok(()) => ApiResponse::ok("deleted").into_response(),
        Err(e) => error_response(&e.to_string(), session_status(&e)),
    }
}

// ── Attachments ────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
pub struct AttachRequest {
    pub source: String,
}

/// POST /api/v1/sessions/{id}/workloads/{name}/datasources
pub async fn attach_datasource(
    State(state): State<ApiState>,
    Path((id, name)): Path<(String, String)>,
    Json(req): Json<AttachRequest>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_attach::attach(&state.store, &session, &name, &req.source) {
        Ok(outcome) => ApiResponse::ok(AttachView {
            workload: outcome.workload,
            source: outcome.source,
            var_names: outcome.var_names,
            already_attached: outcome.already_attached,
        })
        .into_response(),
        Err(e) => error_response(&e.to_string(), attach_status(&e)),
    }
}

/// DELETE /api/v1/sessions/{id}/workloads/{name}/datasources/{source}
pub async fn detach_datasource(
    State(state): State<ApiState>,
    Path((id, name, source)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_attach::detach(&state.store, &session, &name, &source) {
        Ok(()) => ApiResponse::ok("detached").into_response(),
        Err(e) => error_response(&e.to_string(), attach_status(&e)),
    }
}

// ── Managed services ───────────────────────────────────────────────

#[derive(serde::Deserialize)]
pub struct ProvisionRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub plan: String,
}

/// POST /api/v1/sessions/{id}/services
pub async fn provision_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<ProvisionRequest>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_binding::provision(
        &state.store,
        &session,
        &req.name,
        &req.service_type,
        &req.plan,
    ) {
        Ok(service) => (
            StatusCode::CREATED,
            ApiResponse::ok(ServiceStatusView {
                name: service.name,
                service_type: service.service_type,
                plan: service.plan,
                phase: service.phase,
                var_names: None,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e.to_string(), bind_status(&e)),
    }
}

/// GET /api/v1/sessions/{id}/services/{name}
pub async fn service_status(
    State(state): State<ApiState>,
    Path((id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_binding::status(&state.store, &session, &name) {
        Ok(st) => ApiResponse::ok(ServiceStatusView {
            name: st.name,
            service_type: st.service_type,
            plan: st.plan,
            phase: st.phase,
            var_names: st.var_names,
        })
        .into_response(),
        Err(e) => error_response(&e.to_string(), bind_status(&e)),
    }
}

#[derive(serde::Deserialize)]
pub struct BindRequest {
    pub workload: String,
}

/// POST /api/v1/sessions/{id}/services/{name}/bind
pub async fn bind_service(
    State(state): State<ApiState>,
    Path((id, name)): Path<(String, String)>,
    Json(req): Json<BindRequest>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_binding::bind(&state.store, &session, &name, &req.workload) {
        Ok(outcome) => ApiResponse::ok(BindView {
            service: outcome.service,
            workload: outcome.workload,
            var_names: outcome.var_names,
        })
        .into_response(),
        Err(e) => error_response(&e.to_string(), bind_status(&e)),
    }
}

/// POST /api/v1/sessions/{id}/services/{name}/unbind
pub async fn unbind_service(
    State(state): State<ApiState>,
    Path((id, name)): Path<(String, String)>,
    Json(req): Json<BindRequest>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_binding::unbind(&state.store, &session, &name, &req.workload) {
        Ok(()) => ApiResponse::ok("unbound").into_response(),
        Err(e) => error_response(&e.to_string(), bind_status(&e)),
    }
}

/// DELETE /api/v1/sessions/{id}/services/{name}
pub async fn deprovision_service(
    State(state): State<ApiState>,
    Path((id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let session = match resolve_session(&state, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match berth_binding::deprovision(&state.store, &session, &name) {
        Ok(()) => ApiResponse::ok("deprovisioned").into_response(),
        Err(e) => error_response(&e.to_string(), bind_status(&e)),
    }
}

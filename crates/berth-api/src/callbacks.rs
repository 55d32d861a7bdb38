//! Internal callback routes.
//!
//! The external build/deploy subsystem and the database operator own
//! certain record fields this core never writes: workload phase, build
//! status, image, replica count, and database resource conditions. These
//! routes are their write path, applied under the same optimistic-retry
//! discipline as every other shared-record mutation.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use berth_binding::retry_on_conflict;
use berth_state::{Condition, StateError, WorkloadPhase};

use crate::ApiState;
use crate::handlers::{ApiResponse, error_response, state_status};

/// Build-subsystem report for a workload. Absent fields are untouched.
#[derive(serde::Deserialize)]
pub struct WorkloadStatusUpdate {
    pub phase: Option<WorkloadPhase>,
    pub build_status: Option<String>,
    pub image: Option<String>,
    pub ready_replicas: Option<u32>,
}

/// PUT /internal/v1/workloads/{ns}/{name}/status
pub async fn update_workload_status(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
    Json(update): Json<WorkloadStatusUpdate>,
) -> impl IntoResponse {
    let result = retry_on_conflict("record workload status", || {
        let mut workload = state
            .store
            .get_workload(&ns, &name)?
            .ok_or_else(|| StateError::NotFound(format!("{ns}/{name}")))?;
        if let Some(phase) = update.phase {
            workload.phase = phase;
        }
        if let Some(build_status) = &update.build_status {
            workload.build_status = Some(build_status.clone());
        }
        if let Some(image) = &update.image {
            workload.image = Some(image.clone());
        }
        if let Some(replicas) = update.ready_replicas {
            workload.ready_replicas = replicas;
        }
        state.store.update_workload(&mut workload)
    });

    match result {
        Ok(()) => {
            debug!(namespace = %ns, workload = %name, "workload status recorded");
            ApiResponse::ok("recorded").into_response()
        }
        Err(berth_binding::BindError::State(e)) => error_response(&e.to_string(), state_status(&e)),
        Err(e) => error_response(&e.to_string(), StatusCode::CONFLICT),
    }
}

/// Operator report: the full condition list for a database resource.
#[derive(serde::Deserialize)]
pub struct ConditionsUpdate {
    pub conditions: Vec<Condition>,
}

/// PUT /internal/v1/databases/{ns}/{name}/conditions
pub async fn update_db_conditions(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
    Json(update): Json<ConditionsUpdate>,
) -> impl IntoResponse {
    let result = retry_on_conflict("record database conditions", || {
        let mut resource = state
            .store
            .get_db_resource(&ns, &name)?
            .ok_or_else(|| StateError::NotFound(format!("{ns}/{name}")))?;
        resource.conditions = update.conditions.clone();
        state.store.update_db_resource(&mut resource)
    });

    match result {
        Ok(()) => {
            debug!(namespace = %ns, resource = %name, "conditions recorded");
            ApiResponse::ok("recorded").into_response()
        }
        Err(berth_binding::BindError::State(e)) => error_response(&e.to_string(), state_status(&e)),
        Err(e) => error_response(&e.to_string(), StatusCode::CONFLICT),
    }
}

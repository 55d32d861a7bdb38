//! berth-api — REST API for the Berth control plane.
//!
//! Public routes resolve the caller's session to a namespace first; the
//! internal routes are the write path for the external build subsystem
//! and database operator. No route accepts or returns credential values.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/sessions` | Register a session |
//! | GET | `/api/v1/sessions/{id}` | Look up a session |
//! | GET | `/api/v1/datasources` | List the data-source catalog |
//! | POST | `/api/v1/sessions/{id}/workloads` | Create a workload |
//! | GET | `/api/v1/sessions/{id}/workloads/{name}` | Get a workload |
//! | DELETE | `/api/v1/sessions/{id}/workloads/{name}` | Delete a workload |
//! | POST | `/api/v1/sessions/{id}/workloads/{name}/datasources` | Attach a data source |
//! | DELETE | `/api/v1/sessions/{id}/workloads/{name}/datasources/{source}` | Detach a data source |
//! | POST | `/api/v1/sessions/{id}/services` | Provision a managed service |
//! | GET | `/api/v1/sessions/{id}/services/{name}` | Service status |
//! | POST | `/api/v1/sessions/{id}/services/{name}/bind` | Bind to a workload |
//! | POST | `/api/v1/sessions/{id}/services/{name}/unbind` | Unbind from a workload |
//! | DELETE | `/api/v1/sessions/{id}/services/{name}` | Deprovision |
//! | PUT | `/internal/v1/workloads/{ns}/{name}/status` | Build-subsystem callback |
//! | PUT | `/internal/v1/databases/{ns}/{name}/conditions` | Operator callback |

pub mod callbacks;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post, put};
use berth_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
}

/// Build the complete API router.
pub fn build_router(store: StateStore) -> Router {
    let state = ApiState { store };

    let api_routes = Router::new()
        .route("/sessions", post(handlers::register_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/datasources", get(handlers::list_datasources))
        .route(
            "/sessions/{id}/workloads",
            post(handlers::create_workload),
        )
        .route(
            "/sessions/{id}/workloads/{name}",
            get(handlers::get_workload).delete(handlers::delete_workload),
        )
        .route(
            "/sessions/{id}/workloads/{name}/datasources",
            post(handlers::attach_datasource),
        )
        .route(
            "/sessions/{id}/workloads/{name}/datasources/{source}",
            axum::routing::delete(handlers::detach_datasource),
        )
        .route("/sessions/{id}/services", post(handlers::provision_service))
        .route(
            "/sessions/{id}/services/{name}",
            get(handlers::service_status).delete(handlers::deprovision_service),
        )
        .route(
            "/sessions/{id}/services/{name}/bind",
            post(handlers::bind_service),
        )
        .route(
            "/sessions/{id}/services/{name}/unbind",
            post(handlers::unbind_service),
        )
        .with_state(state.clone());

    let internal_routes = Router::new()
        .route(
            "/workloads/{ns}/{name}/status",
            put(callbacks::update_workload_status),
        )
        .route(
            "/databases/{ns}/{name}/conditions",
            put(callbacks::update_db_conditions),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/internal/v1", internal_routes)
}

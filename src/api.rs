use crate::config::ServiceConfiguration;
use crate::error::FrameworkError;
use crate::manager::ApplicationManager;
use crate::models::{ApplicationStatus, ServiceStatus};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared by the core HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ApplicationManager>,
    pub version: String,
}

/// Wire-level error: `{"detail": "..."}` with the mapped status code.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<FrameworkError> for ApiError {
    fn from(err: FrameworkError) -> Self {
        let status = match err {
            FrameworkError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Core application router: status, listing, and the uniform per-service
/// lifecycle endpoints. Service-specific extra routes are merged in by the
/// application when it builds the full router.
pub fn create_core_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_application_status))
        .route("/services", get(list_services))
        .route("/services/:name", get(get_service_status))
        .route("/services/:name/start", post(start_service))
        .route("/services/:name/stop", post(stop_service))
        .route("/services/:name/configure", post(configure_service))
        .route(
            "/services/:name/configure_and_start",
            post(configure_and_start_service),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn get_application_status(State(state): State<AppState>) -> Json<ApplicationStatus> {
    Json(ApplicationStatus {
        version: state.version.clone(),
        state: state.manager.state(),
        services: state.manager.service_statuses(),
    })
}

async fn list_services(State(state): State<AppState>) -> Json<HashMap<String, String>> {
    Json(state.manager.service_kinds())
}

async fn get_service_status(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ServiceStatus>, ApiError> {
    let service = state
        .manager
        .get_service(&name)
        .ok_or(FrameworkError::NotFound { name })?;
    Ok(Json(service.status()))
}

async fn start_service(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    state.manager.start_service(&name).await?;
    Ok(Json(json!({ "status": "started", "service": name })))
}

async fn stop_service(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    state.manager.stop_service(&name).await?;
    Ok(Json(json!({ "status": "stopped", "service": name })))
}

async fn configure_service(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(config): Json<ServiceConfiguration>,
) -> Result<Json<Value>, ApiError> {
    let service = state
        .manager
        .get_service(&name)
        .ok_or_else(|| FrameworkError::NotFound { name: name.clone() })?;
    service.configure(config).await?;
    Ok(Json(json!({ "status": "configured", "service": name })))
}

async fn configure_and_start_service(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(config): Json<ServiceConfiguration>,
) -> Result<Json<Value>, ApiError> {
    let service = state
        .manager
        .get_service(&name)
        .ok_or_else(|| FrameworkError::NotFound { name: name.clone() })?;
    service.configure(config).await?;
    service.start().await?;
    Ok(Json(json!({ "status": "started", "service": name })))
}

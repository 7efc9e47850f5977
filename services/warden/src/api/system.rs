//! System/health API handlers.
//!
//! Served outside the authorization pipeline so probes need no credentials.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::{HealthStatus, SystemInfo};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/api/v2/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 500, description = "Store unavailable", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    if let Err(err) = state.store.health_check().await {
        return Err(api_internal("storage unavailable", &err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        backend: state.store.backend_name().to_string(),
        durable: state.store.is_durable(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v2/system/info",
    tag = "system",
    responses((status = 200, description = "Service build information", body = SystemInfo))
)]
pub(crate) async fn system_info() -> Json<SystemInfo> {
    Json(SystemInfo {
        service: "warden".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: "v2".to_string(),
    })
}

/// Serve the generated OpenAPI document.
pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(crate::api::openapi::ApiDoc::openapi())
}

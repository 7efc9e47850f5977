//! Role API handlers.
//!
//! # Purpose
//! CRUD for roles inside a namespace. Permissions in the request body are
//! stamped with the path namespace by the store before persisting.
use crate::api::error::ApiError;
use crate::api::types::{RoleListResponse, RoleRequest, RoleView, permissions_from_input};
use crate::app::AppState;
use crate::store::RoleStore;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use warden_authz::{OidcGroups, Role};

fn role_from_request(namespace: String, body: RoleRequest) -> Role {
    let mut role = Role::new(
        namespace,
        body.name,
        OidcGroups::new(body.oidc_groups),
        permissions_from_input(body.permissions),
    );
    role.description = body.description;
    role
}

#[utoipa::path(
    get,
    path = "/api/v2/namespaces/{namespace}/roles",
    tag = "roles",
    params(("namespace" = String, Path, description = "Namespace name")),
    responses(
        (status = 200, description = "List roles, oldest first", body = RoleListResponse),
        (status = 403, description = "Access denied", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_roles(
    Path(namespace): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RoleListResponse>, ApiError> {
    let roles = state.store.list_roles(&namespace).await?;
    Ok(Json(RoleListResponse {
        items: roles.into_iter().map(RoleView::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v2/namespaces/{namespace}/roles",
    tag = "roles",
    params(("namespace" = String, Path, description = "Namespace name")),
    request_body = RoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleView),
        (status = 400, description = "Invalid fields", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Role already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_role(
    Path(namespace): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<RoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .store
        .create_role(role_from_request(namespace, body))
        .await?;
    tracing::info!(namespace = %created.namespace, role = %created.name, "role created");
    Ok((StatusCode::CREATED, Json(RoleView::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v2/namespaces/{namespace}/roles/{name}",
    tag = "roles",
    params(
        ("namespace" = String, Path, description = "Namespace name"),
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Fetch role", body = RoleView),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_role(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<RoleView>, ApiError> {
    let role = state.store.get_role(&namespace, &name).await?;
    Ok(Json(role.into()))
}

#[utoipa::path(
    put,
    path = "/api/v2/namespaces/{namespace}/roles/{name}",
    tag = "roles",
    params(
        ("namespace" = String, Path, description = "Namespace name"),
        ("name" = String, Path, description = "Role name")
    ),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role replaced", body = RoleView),
        (status = 400, description = "Invalid fields", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Target name already used", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_role(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<RoleView>, ApiError> {
    let role = role_from_request(namespace.clone(), body);
    let updated = state.store.update_role(&namespace, &name, role).await?;
    tracing::info!(namespace = %updated.namespace, role = %updated.name, "role updated");
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v2/namespaces/{namespace}/roles/{name}",
    tag = "roles",
    params(
        ("namespace" = String, Path, description = "Namespace name"),
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_role(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_role(&namespace, &name).await?;
    tracing::info!(namespace = %namespace, role = %name, "role deleted");
    Ok(StatusCode::NO_CONTENT)
}

//! HTTP API request/response types.
//!
//! # Purpose
//! Wire shapes for the roles and API-token endpoints. Field names are
//! camelCase. Permissions in responses omit the namespace because it is
//! always the owner's.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use warden_authz::{ApiToken, Permission, Permissions, Role};

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
    pub durable: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub service: String,
    pub version: String,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
    /// Field name to message, for `request_data_invalid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<BTreeMap<String, String>>,
}

/// Permission as accepted in request bodies; any namespace is overwritten.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionInput {
    #[serde(default)]
    pub namespace: String,
    pub topic: String,
    pub method: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PermissionView {
    pub topic: String,
    pub method: String,
}

impl From<&Permission> for PermissionView {
    fn from(perm: &Permission) -> Self {
        Self {
            topic: perm.topic.clone(),
            method: perm.method.clone(),
        }
    }
}

pub(crate) fn permissions_from_input(input: Vec<PermissionInput>) -> Permissions {
    input
        .into_iter()
        .map(|perm| Permission {
            namespace: perm.namespace,
            topic: perm.topic,
            method: perm.method,
        })
        .collect()
}

fn permission_views(perms: &Permissions) -> Vec<PermissionView> {
    perms.iter().map(PermissionView::from).collect()
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub oidc_groups: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub name: String,
    pub description: String,
    pub oidc_groups: Vec<String>,
    pub permissions: Vec<PermissionView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            permissions: permission_views(&role.permissions),
            oidc_groups: role.oidc_groups.to_vec(),
            name: role.name,
            description: role.description,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleListResponse {
    pub items: Vec<RoleView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<PermissionInput>,
    /// ISO-8601 duration such as `PT1H` or `P30D`.
    pub duration: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenView {
    pub name: String,
    pub description: String,
    /// First eight hex characters of the stored hash; never the secret.
    pub prefix: String,
    pub permissions: Vec<PermissionView>,
    pub expired_at: DateTime<Utc>,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApiToken> for ApiTokenView {
    fn from(token: ApiToken) -> Self {
        Self {
            prefix: token.prefix(),
            is_expired: token.is_expired(),
            permissions: permission_views(&token.permissions),
            name: token.name,
            description: token.description,
            expired_at: token.expires_at,
            created_at: token.created_at,
            updated_at: token.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenCreateResponse {
    pub api_token: ApiTokenView,
    /// Raw secret; shown once and never stored.
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ApiTokenListResponse {
    pub items: Vec<ApiTokenView>,
}

//! OpenAPI schema aggregation for the warden API.
use crate::api::{
    api_tokens, roles, system,
    types::{
        ApiTokenCreateRequest, ApiTokenCreateResponse, ApiTokenListResponse, ApiTokenView,
        ErrorResponse, HealthStatus, PermissionInput, PermissionView, RoleListResponse,
        RoleRequest, RoleView, SystemInfo,
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "warden",
        version = "v2",
        description = "Warden access-control HTTP API"
    ),
    paths(
        system::system_health,
        system::system_info,
        roles::list_roles,
        roles::create_role,
        roles::get_role,
        roles::update_role,
        roles::delete_role,
        api_tokens::list_api_tokens,
        api_tokens::create_api_token,
        api_tokens::get_api_token,
        api_tokens::delete_api_token
    ),
    components(schemas(
        HealthStatus,
        SystemInfo,
        ErrorResponse,
        PermissionInput,
        PermissionView,
        RoleRequest,
        RoleView,
        RoleListResponse,
        ApiTokenCreateRequest,
        ApiTokenView,
        ApiTokenCreateResponse,
        ApiTokenListResponse
    )),
    tags(
        (name = "system", description = "Health and build information"),
        (name = "roles", description = "Group-to-permission roles"),
        (name = "api_tokens", description = "Opaque API tokens")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        for expected in [
            "/api/v2/system/health",
            "/api/v2/system/info",
            "/api/v2/namespaces/{namespace}/roles",
            "/api/v2/namespaces/{namespace}/roles/{name}",
            "/api/v2/namespaces/{namespace}/api_tokens",
            "/api/v2/namespaces/{namespace}/api_tokens/{name}",
        ] {
            assert!(paths.iter().any(|path| path == expected), "{expected}");
        }
    }
}

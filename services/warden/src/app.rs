//! Warden HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, places the authorization middleware in front of
//! the management routes, and defines the shared state injected into
//! handlers.
//!
//! # Key invariants
//! - `/api/v2/system/*` and the OpenAPI document need no credentials;
//!   every other route passes through [`auth::middleware::authorize`].
//! - Path parameters use the namespace as the first segment after
//!   `/api/v2/namespaces`, which is what the authorization engine scopes on.
use crate::api;
use crate::auth;
use crate::auth::middleware::AuthPipeline;
use crate::observability;
use crate::store::WardenStore;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WardenStore>,
    pub auth: Arc<AuthPipeline>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let protected = Router::new()
        .route(
            "/api/v2/namespaces/:namespace/roles",
            get(api::roles::list_roles).post(api::roles::create_role),
        )
        .route(
            "/api/v2/namespaces/:namespace/roles/:name",
            get(api::roles::get_role)
                .put(api::roles::update_role)
                .delete(api::roles::delete_role),
        )
        .route(
            "/api/v2/namespaces/:namespace/api_tokens",
            get(api::api_tokens::list_api_tokens).post(api::api_tokens::create_api_token),
        )
        .route(
            "/api/v2/namespaces/:namespace/api_tokens/:name",
            get(api::api_tokens::get_api_token).delete(api::api_tokens::delete_api_token),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::authorize,
        ));

    Router::new()
        .route("/api/v2/system/health", get(api::system::system_health))
        .route("/api/v2/system/info", get(api::system::system_info))
        .route("/api/v2/openapi.json", get(api::system::openapi_json))
        .merge(protected)
        .layer(trace_layer)
        .with_state(state)
}

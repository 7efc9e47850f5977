//! Warden access-control service library crate.
//!
//! # Purpose
//! Exposes the authorization pipeline, the role and API-token management API,
//! configuration, and storage backends for use by the binary and tests.
//!
//! # Notes
//! [`build_state`] and [`run_with_shutdown`] keep startup wiring testable and
//! leave `main` with signal handling only.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod observability;
pub mod store;

use anyhow::Context;
use app::{AppState, build_router};
use auth::api_token::ApiTokenResolver;
use auth::cache::CredentialCache;
use auth::engine::AuthorizationEngine;
use auth::middleware::AuthPipeline;
use auth::oidc::OidcResolver;
use auth::roles::RoleDirectory;
use std::future::Future;
use std::sync::Arc;
use store::{RoleStore, TokenStore, WardenStore, memory::InMemoryStore, postgres::PostgresStore};
use warden_license::License;

/// Verify the configured license once; the service never starts without one.
pub fn check_license(config: &config::WardenConfig) -> anyhow::Result<License> {
    let document = config
        .license
        .as_deref()
        .context("missing WARDEN_LICENSE environment variable")?;
    let public_key = config
        .license_public_key
        .as_deref()
        .context("missing WARDEN_LICENSE_PUBLIC_KEY environment variable")?;
    let license =
        warden_license::verify_json(document, public_key).context("verify license")?;
    tracing::info!(
        to = %license.to,
        kind = %license.kind,
        expires_at = %license.expires_at,
        "license verified"
    );
    Ok(license)
}

pub async fn build_state(config: &config::WardenConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn WardenStore> = match config.storage {
        config::StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        config::StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };

    let cache = Arc::new(CredentialCache::new(config.cache_capacity, config.cache_ttl));
    let oidc = OidcResolver::from_config(&config.oidc, cache.clone())
        .context("build oidc resolver")?;

    let token_store: Arc<dyn TokenStore> = store.clone();
    let api_tokens = ApiTokenResolver::new(token_store, cache, config.store_timeout);

    let role_store: Arc<dyn RoleStore> = store.clone();
    let roles = if config.role_cache {
        RoleDirectory::cached(role_store, config.cache_ttl)
    } else {
        RoleDirectory::uncached(role_store)
    };
    let engine = AuthorizationEngine::new(
        config.api_key.clone(),
        config.oidc.admin_group.clone(),
        Arc::new(roles),
        config.store_timeout,
    );

    Ok(AppState {
        store,
        auth: Arc::new(AuthPipeline {
            oidc,
            api_tokens,
            engine,
        }),
    })
}

/// Validate, gate on the license, build state, and serve until `shutdown`
/// resolves. Observability must already be initialised by the caller.
pub async fn run_with_shutdown<F>(
    config: config::WardenConfig,
    metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    check_license(&config)?;
    if config.oidc.dev {
        tracing::warn!("WARDEN_OIDC_DEV is set; bearer tokens resolve to canned groups");
    }

    let state = build_state(&config).await?;
    tracing::info!(
        backend = state.store.backend_name(),
        durable = state.store.is_durable(),
        "store ready"
    );
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "warden listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

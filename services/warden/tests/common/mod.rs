#![allow(dead_code)]

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use warden::app::{AppState, build_router};
use warden::auth::api_token::ApiTokenResolver;
use warden::auth::cache::{CredentialCache, CredentialKind};
use warden::auth::engine::AuthorizationEngine;
use warden::auth::middleware::AuthPipeline;
use warden::auth::oidc::{GroupSource, OidcResolver};
use warden::auth::roles::RoleDirectory;
use warden::store::memory::InMemoryStore;

pub const API_KEY: &str = "s3cret";
pub const ADMIN_GROUP: &str = "admin";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<CredentialCache>,
}

impl TestApp {
    /// Router over an in-memory store with no OIDC issuer. Bearer tokens
    /// only resolve when seeded into the cache with [`TestApp::login`].
    pub fn new(api_key: Option<&str>) -> Self {
        Self::with_source(api_key, GroupSource::Unconfigured)
    }

    pub fn with_source(api_key: Option<&str>, source: GroupSource) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(CredentialCache::new(64, Duration::from_secs(30)));
        let timeout = Duration::from_secs(1);
        let auth = AuthPipeline {
            oidc: OidcResolver::new(source, cache.clone()),
            api_tokens: ApiTokenResolver::new(store.clone(), cache.clone(), timeout),
            engine: AuthorizationEngine::new(
                api_key.map(str::to_string),
                Some(ADMIN_GROUP.to_string()),
                Arc::new(RoleDirectory::uncached(store.clone())),
                timeout,
            ),
        };
        let state = AppState {
            store: store.clone(),
            auth: Arc::new(auth),
        };
        Self {
            router: build_router(state.clone()),
            state,
            store,
            cache,
        }
    }

    /// Pretend `token` was already verified and carries `groups`.
    pub fn login(&self, token: &str, groups: &str) {
        self.cache.put(CredentialKind::Oidc, token, groups);
    }
}

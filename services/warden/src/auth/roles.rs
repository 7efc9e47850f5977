//! Global role lookup for the authorization engine.
//!
//! Group-to-role mapping is cluster-wide, so the engine reads every role on
//! each decision. With `WARDEN_ROLE_CACHE` enabled the full list is kept as a
//! snapshot for the credential TTL, giving the same staleness bound as the
//! credential cache.
use super::{AuthError, AuthResult, bounded_store_call};
use crate::store::RoleStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use warden_authz::Role;

struct Snapshot {
    roles: Arc<Vec<Role>>,
    taken_at: Instant,
}

pub struct RoleDirectory {
    store: Arc<dyn RoleStore>,
    snapshot_ttl: Option<Duration>,
    snapshot: RwLock<Option<Snapshot>>,
}

impl RoleDirectory {
    /// Read through to the store on every call.
    pub fn uncached(store: Arc<dyn RoleStore>) -> Self {
        Self {
            store,
            snapshot_ttl: None,
            snapshot: RwLock::new(None),
        }
    }

    /// Serve the role list from a snapshot refreshed once per `ttl`.
    pub fn cached(store: Arc<dyn RoleStore>, ttl: Duration) -> Self {
        Self {
            store,
            snapshot_ttl: Some(ttl),
            snapshot: RwLock::new(None),
        }
    }

    /// Every role across all namespaces.
    ///
    /// # Errors
    /// - [`AuthError::Internal`] if the store fails or exceeds `timeout`.
    pub async fn list_all(&self, timeout: Duration) -> AuthResult<Arc<Vec<Role>>> {
        let Some(ttl) = self.snapshot_ttl else {
            return self.fetch(timeout).await.map(Arc::new);
        };

        if let Some(snapshot) = self.snapshot.read().await.as_ref()
            && snapshot.taken_at.elapsed() < ttl
        {
            return Ok(Arc::clone(&snapshot.roles));
        }

        let mut guard = self.snapshot.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(snapshot) = guard.as_ref()
            && snapshot.taken_at.elapsed() < ttl
        {
            return Ok(Arc::clone(&snapshot.roles));
        }
        let roles = Arc::new(self.fetch(timeout).await?);
        *guard = Some(Snapshot {
            roles: Arc::clone(&roles),
            taken_at: Instant::now(),
        });
        Ok(roles)
    }

    async fn fetch(&self, timeout: Duration) -> AuthResult<Vec<Role>> {
        bounded_store_call("list_all_roles", timeout, self.store.list_all_roles())
            .await?
            .map_err(|err| {
                tracing::error!(error = %err, "listing roles failed");
                AuthError::internal("listing roles failed")
            })
    }
}

//! API-token resolver stage.
//!
//! Resolves the opaque `warden-api-token` header into the token's permission
//! set. The raw header is the cache key; the store is only consulted with the
//! derived hash, never the raw secret.
use super::cache::{CredentialCache, CredentialKind};
use super::{AuthError, AuthResult, bounded_store_call};
use crate::observability::record_cache_lookup;
use crate::store::{StoreError, TokenStore};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use warden_authz::{Permissions, hash_token_id};

#[derive(Clone)]
pub struct ApiTokenResolver {
    store: Arc<dyn TokenStore>,
    cache: Arc<CredentialCache>,
    store_timeout: Duration,
}

impl ApiTokenResolver {
    pub fn new(
        store: Arc<dyn TokenStore>,
        cache: Arc<CredentialCache>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            store_timeout,
        }
    }

    /// Resolve a raw API token into its permissions.
    ///
    /// # Errors
    /// - [`AuthError::AccessInvalid`] if the token is not a UUID.
    /// - [`AuthError::AccessDenied`] if no token matches or it has expired.
    /// - [`AuthError::Internal`] if the store fails or times out.
    pub async fn resolve(&self, raw: &str) -> AuthResult<Permissions> {
        let secret = Uuid::parse_str(raw)
            .map_err(|_| AuthError::AccessInvalid("api token invalid format".into()))?;

        if let Some(encoded) = self.cache.get(CredentialKind::ApiToken, raw) {
            record_cache_lookup("api_token", true);
            return Permissions::decode(&encoded).map_err(|err| {
                tracing::error!(error = %err, "cached api token permissions are corrupt");
                AuthError::internal("corrupt cached permissions")
            });
        }
        record_cache_lookup("api_token", false);

        let hash = hash_token_id(secret);
        let lookup = bounded_store_call(
            "get_token_by_hash",
            self.store_timeout,
            self.store.get_token_by_hash(hash),
        )
        .await?;
        let token = match lookup {
            Ok(token) => token,
            Err(StoreError::NotFound(_)) => return Err(AuthError::denied("api token is denied")),
            Err(err) => {
                tracing::error!(error = %err, "api token lookup failed");
                return Err(AuthError::internal("api token lookup failed"));
            }
        };
        if token.is_expired() {
            return Err(AuthError::denied("api token is expired"));
        }

        self.cache.put(CredentialKind::ApiToken, raw, token.permissions.encode());
        Ok(token.permissions)
    }
}

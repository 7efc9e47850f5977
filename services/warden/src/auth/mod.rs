//! Request authorization pipeline.
//!
//! # Purpose
//! Resolves the credentials carried by a request into identity facts and
//! decides whether the request may proceed.
//!
//! # How it fits
//! [`middleware::authorize`] runs three stages in fixed order for every routed
//! request: the OIDC resolver (bearer token), the API-token resolver (opaque
//! token header), then the authorization engine. Each resolver stage is
//! skipped when its credential is absent. Both resolvers share one
//! [`cache::CredentialCache`].
//!
//! # Key invariants
//! - Identity facts travel as a typed [`context::ResolvedIdentity`], never as
//!   request headers, so clients cannot inject them.
//! - Every failure leaving this module is an [`AuthError`]; infrastructure
//!   errors are converted at the stage boundary.
//! - No stage retries a failed store or network call.
pub mod api_token;
pub mod cache;
pub mod context;
pub mod engine;
pub mod middleware;
pub mod oidc;
pub mod roles;

use std::future::Future;
use std::time::Duration;

/// Shared-secret header checked by the authorization engine.
pub const API_KEY_HEADER: &str = "warden-api-key";
/// Opaque API-token header consumed by the API-token resolver.
pub const API_TOKEN_HEADER: &str = "warden-api-token";

/// Failure kinds surfaced by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A required credential was not presented.
    #[error("{0}")]
    AccessMissing(String),
    /// The credential is invalid, expired or lacks privileges.
    #[error("{0}")]
    AccessDenied(String),
    /// The credential is malformed.
    #[error("{0}")]
    AccessInvalid(String),
    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn denied(reason: impl Into<String>) -> Self {
        AuthError::AccessDenied(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        AuthError::Internal(reason.into())
    }

    /// Stable label for the decision metric.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            AuthError::AccessMissing(_) => "missing",
            AuthError::AccessDenied(_) => "denied",
            AuthError::AccessInvalid(_) => "invalid",
            AuthError::Internal(_) => "internal",
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Run a store call bounded by `limit`; a timeout or store failure is internal.
pub(crate) async fn bounded_store_call<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> AuthResult<Result<T, crate::store::StoreError>>
where
    F: Future<Output = Result<T, crate::store::StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result),
        Err(_) => {
            tracing::error!(operation, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(AuthError::internal("store call timed out"))
        }
    }
}

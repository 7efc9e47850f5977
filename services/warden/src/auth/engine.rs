//! Authorization engine.
//!
//! # Purpose
//! Renders the final allow/deny decision for a request from the shared
//! secret presented by the caller, the identity facts resolved by the earlier
//! stages, and the request's method and path.
//!
//! # Decision order
//! The first matching rule wins:
//! 1. No shared secret configured: allow.
//! 2. No secret presented and no resolver vouched for the caller: missing.
//! 3. Presented secret does not match: denied.
//! 4. Secret presented directly with no resolved identity: allow.
//! 5. Caller is in the admin group: allow.
//! 6. Non-admin namespace creation: denied.
//! 7. Gather candidate permissions from every role matching a group, plus
//!    the API-token permissions.
//! 8. Any candidate granting the target: allow, with the allowed namespaces.
//! 9. Otherwise: denied.
//!
//! A successful OIDC or API-token resolution stands in for presenting the
//! secret in steps 2 and 3.
use super::context::ResolvedIdentity;
use super::roles::RoleDirectory;
use super::{AuthError, AuthResult};
use crate::observability::record_decision;
use std::sync::Arc;
use std::time::Duration;
use warden_authz::{AllowedNamespaces, MatchOutcome, OidcGroups, PermissionMatcher, RequestTarget};

/// An allow decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Allowed without permission matching; the reason is a metric label.
    Unrestricted(&'static str),
    /// Allowed by a matching permission.
    Granted {
        allowed_namespaces: AllowedNamespaces,
    },
}

impl Decision {
    fn reason(&self) -> &'static str {
        match self {
            Decision::Unrestricted(reason) => *reason,
            Decision::Granted { .. } => "permission",
        }
    }
}

pub struct AuthorizationEngine {
    api_key: Option<String>,
    admin_group: Option<String>,
    roles: Arc<RoleDirectory>,
    store_timeout: Duration,
}

impl AuthorizationEngine {
    pub fn new(
        api_key: Option<String>,
        admin_group: Option<String>,
        roles: Arc<RoleDirectory>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.is_empty()),
            admin_group: admin_group.filter(|group| !group.is_empty()),
            roles,
            store_timeout,
        }
    }

    /// Decide whether the request may proceed.
    ///
    /// # Errors
    /// - [`AuthError::AccessMissing`] if the shared secret is required but absent.
    /// - [`AuthError::AccessDenied`] for a wrong secret or missing privileges.
    /// - [`AuthError::Internal`] if the role list cannot be read.
    pub async fn decide(
        &self,
        presented_key: Option<&str>,
        identity: &ResolvedIdentity,
        http_method: &str,
        path: &str,
    ) -> AuthResult<Decision> {
        let outcome = self
            .evaluate(presented_key, identity, http_method, path)
            .await;
        match &outcome {
            Ok(decision) => {
                record_decision(true, decision.reason());
            }
            Err(err) => {
                tracing::debug!(method = http_method, path, error = %err, "request denied");
                record_decision(false, err.outcome_label());
            }
        }
        outcome
    }

    async fn evaluate(
        &self,
        presented_key: Option<&str>,
        identity: &ResolvedIdentity,
        http_method: &str,
        path: &str,
    ) -> AuthResult<Decision> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Decision::Unrestricted("api_key_disabled"));
        };

        if !identity.is_vouched() {
            let presented = presented_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| AuthError::AccessMissing("missing api key".into()))?;
            if !constant_time_eq(presented.as_bytes(), api_key.as_bytes()) {
                return Err(AuthError::denied("invalid api key"));
            }
            return Ok(Decision::Unrestricted("api_key"));
        }

        let is_admin = self
            .admin_group
            .as_deref()
            .is_some_and(|admin| identity.has_group(admin));
        if is_admin {
            return Ok(Decision::Unrestricted("admin_group"));
        }

        let target = RequestTarget::from_path(path).map_err(|err| {
            tracing::debug!(path, error = %err, "unparseable request path");
            AuthError::denied("invalid request path")
        })?;
        if target.is_namespace_creation(http_method) {
            return Err(AuthError::denied("only admins can create namespaces"));
        }

        let no_groups = OidcGroups::default();
        let groups = identity.groups.as_ref().unwrap_or(&no_groups);
        let roles = if groups.is_empty() {
            Arc::new(Vec::new())
        } else {
            self.roles.list_all(self.store_timeout).await?
        };
        let candidates =
            PermissionMatcher::candidates(groups, &roles, identity.permissions.as_ref());

        match PermissionMatcher::new(&target, http_method).evaluate(&candidates) {
            MatchOutcome::Allowed {
                allowed_namespaces, ..
            } => Ok(Decision::Granted { allowed_namespaces }),
            MatchOutcome::Denied => Err(AuthError::denied("not enough permissions")),
        }
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

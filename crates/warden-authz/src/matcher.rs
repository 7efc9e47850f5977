//! Role and permission matching for a single request.
//!
//! # Purpose
//! Collects the candidate permissions granted to a caller (through OIDC group
//! membership in roles, and through a resolved API-token permission set) and
//! decides whether any of them grants the request.
//!
//! # Key invariants
//! - A candidate applies only when its topic equals the request topic.
//! - A candidate is in namespace scope when its namespace is empty, when the
//!   request carries no namespace, or when both are equal.
//! - `read` grants only `GET`; `manage` grants every method.
//! - The allowed-namespaces list is accumulated over every candidate, not just
//!   the granting one. It is informational and never used for the decision.
use crate::{OidcGroups, Permission, Permissions, RequestTarget, Role};

/// Namespaces visible to a caller, in first-seen order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedNamespaces(Vec<String>);

impl AllowedNamespaces {
    pub fn contains(&self, namespace: &str) -> bool {
        self.0.iter().any(|candidate| candidate == namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, namespace: &str) {
        if !namespace.is_empty() && !self.contains(namespace) {
            self.0.push(namespace.to_string());
        }
    }
}

impl<'a> FromIterator<&'a Permission> for AllowedNamespaces {
    fn from_iter<T: IntoIterator<Item = &'a Permission>>(iter: T) -> Self {
        let mut out = Self::default();
        for perm in iter {
            out.insert(&perm.namespace);
        }
        out
    }
}

/// Result of matching candidate permissions against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Allowed {
        granted_by: Permission,
        allowed_namespaces: AllowedNamespaces,
    },
    Denied,
}

impl MatchOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, MatchOutcome::Allowed { .. })
    }
}

/// Matches candidate permissions against one request target and HTTP method.
#[derive(Debug, Clone, Copy)]
pub struct PermissionMatcher<'a> {
    target: &'a RequestTarget,
    http_method: &'a str,
}

impl<'a> PermissionMatcher<'a> {
    pub fn new(target: &'a RequestTarget, http_method: &'a str) -> Self {
        Self {
            target,
            http_method,
        }
    }

    /// Union the permissions of every role containing one of `groups`, then
    /// append the pre-resolved API-token permissions if any.
    pub fn candidates(
        groups: &OidcGroups,
        roles: &[Role],
        token_permissions: Option<&Permissions>,
    ) -> Permissions {
        let mut candidates = Permissions::new();
        for group in groups.iter() {
            for role in roles.iter().filter(|role| role.oidc_groups.contains(group)) {
                candidates.extend(role.permissions.iter().cloned());
            }
        }
        if let Some(perms) = token_permissions {
            candidates.extend(perms.iter().cloned());
        }
        candidates
    }

    /// Whether a single permission grants this request.
    pub fn grants(&self, perm: &Permission) -> bool {
        if perm.topic != self.target.topic {
            return false;
        }
        let in_scope = perm.namespace.is_empty()
            || self.target.namespace.is_empty()
            || perm.namespace == self.target.namespace;
        if !in_scope {
            return false;
        }
        // Out-of-set methods never grant, even when they spell the HTTP verb.
        perm.parsed_method()
            .map(|method| method.grants(self.http_method))
            .unwrap_or(false)
    }

    pub fn evaluate(&self, candidates: &Permissions) -> MatchOutcome {
        let allowed_namespaces: AllowedNamespaces = candidates.iter().collect();
        match candidates.iter().find(|perm| self.grants(perm)) {
            Some(perm) => MatchOutcome::Allowed {
                granted_by: perm.clone(),
                allowed_namespaces,
            },
            None => MatchOutcome::Denied,
        }
    }
}

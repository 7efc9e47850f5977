//! Typed per-request identity.
//!
//! The resolver stages fill a [`ResolvedIdentity`] and hand it to the
//! authorization engine; after an allow decision it is stored in the request
//! extensions together with the caller's
//! [`warden_authz::AllowedNamespaces`].
use warden_authz::{OidcGroups, Permissions};

/// Identity facts resolved from the credentials on one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Groups from a verified OIDC bearer token.
    pub groups: Option<OidcGroups>,
    /// Permissions from a valid API token.
    pub permissions: Option<Permissions>,
}

impl ResolvedIdentity {
    /// A resolver stage authenticated the caller, which stands in for
    /// presenting the shared secret.
    pub fn is_vouched(&self) -> bool {
        self.groups.is_some() || self.permissions.is_some()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups
            .as_ref()
            .is_some_and(|groups| groups.contains(group))
    }
}

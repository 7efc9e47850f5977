//! Role and API-token records.
//!
//! # Purpose
//! Storage-agnostic shapes of the two entities that carry permissions. The
//! service's store backends read and write these records.
//!
//! # Key invariants
//! - `(namespace, name)` is unique per entity type.
//! - API tokens never carry their raw secret, only the derived hash.
//! - Token expiry is evaluated against the current time at read time.
use crate::{OidcGroups, Permissions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named mapping from OIDC groups to a permission set, scoped to a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub namespace: String,
    pub description: String,
    pub oidc_groups: OidcGroups,
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Build a role with both timestamps set to now; stores overwrite them.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        oidc_groups: OidcGroups,
        permissions: Permissions,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            namespace: namespace.into(),
            description: String::new(),
            oidc_groups,
            permissions,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Opaque API token record, looked up by its derived hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    pub name: String,
    pub namespace: String,
    pub description: String,
    pub hash: Uuid,
    pub permissions: Permissions,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiToken {
    /// A token is expired once `expires_at` is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Short, non-secret prefix of the stored hash for display.
    pub fn prefix(&self) -> String {
        self.hash.simple().to_string()[..8].to_string()
    }
}

//! Role and API-token storage.
//!
//! # Purpose
//! Defines the repository traits consumed by the authorization pipeline and
//! the management API, the shared validation applied before any write, and
//! the error taxonomy both backends translate into.
//!
//! # Key invariants
//! - `(namespace, name)` is unique per entity type; a violation is
//!   [`StoreError::Duplicate`], never a generic failure.
//! - Permissions are stamped with the owner's namespace by the store before
//!   persisting; callers cannot choose it.
//! - Token lifetimes are explicit seconds; zero means expired on arrival.
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;
use warden_authz::{ApiToken, Role};

pub mod memory;
pub mod postgres;

/// Longest accepted token lifetime (100 years).
pub const MAX_TOKEN_LIFETIME_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// Field name to validation message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("validation errors: {}", format_fields(.0))]
    InvalidArgument(FieldErrors),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn format_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("field:'{field}', err:{message}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create_role(&self, role: Role) -> StoreResult<Role>;
    /// Replace the role `(namespace, name)`; `role.name` may rename it.
    async fn update_role(&self, namespace: &str, name: &str, role: Role) -> StoreResult<Role>;
    async fn delete_role(&self, namespace: &str, name: &str) -> StoreResult<()>;
    async fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Role>;
    async fn list_roles(&self, namespace: &str) -> StoreResult<Vec<Role>>;
    /// Every role in every namespace, oldest first.
    async fn list_all_roles(&self) -> StoreResult<Vec<Role>>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create_token(&self, token: ApiToken, lifetime_seconds: i64) -> StoreResult<ApiToken>;
    async fn delete_token(&self, namespace: &str, name: &str) -> StoreResult<()>;
    async fn get_token(&self, namespace: &str, name: &str) -> StoreResult<ApiToken>;
    async fn get_token_by_hash(&self, hash: Uuid) -> StoreResult<ApiToken>;
    async fn list_tokens(&self, namespace: &str) -> StoreResult<Vec<ApiToken>>;
}

#[async_trait]
pub trait WardenStore: RoleStore + TokenStore {
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Validate a role for create/update and stamp its permissions.
pub(crate) fn prepare_role(role: &mut Role) -> StoreResult<()> {
    let mut errors = FieldErrors::new();
    if role.namespace.is_empty() {
        errors.insert("namespace".into(), "is required".into());
    }
    if role.name.is_empty() {
        errors.insert("name".into(), "is required".into());
    }
    if let Err(err) = role.permissions.validate() {
        errors.insert("permissions".into(), err.to_string());
    }
    if let Err(err) = role.oidc_groups.validate() {
        errors.insert("oidcGroups".into(), err.to_string());
    }
    if !errors.is_empty() {
        return Err(StoreError::InvalidArgument(errors));
    }
    let namespace = role.namespace.clone();
    role.permissions.stamp_namespace(&namespace);
    Ok(())
}

/// Validate a token for create and stamp its permissions.
pub(crate) fn prepare_token(token: &mut ApiToken, lifetime_seconds: i64) -> StoreResult<()> {
    let mut errors = FieldErrors::new();
    if token.name.is_empty() {
        errors.insert("name".into(), "is required".into());
    }
    if token.namespace.is_empty() {
        errors.insert("namespace".into(), "is required".into());
    }
    if token.hash.is_nil() {
        errors.insert("hash".into(), "is required".into());
    }
    if lifetime_seconds < 0 {
        errors.insert("lifetime".into(), "must not be negative".into());
    } else if lifetime_seconds > MAX_TOKEN_LIFETIME_SECONDS {
        errors.insert("lifetime".into(), "must not exceed 100 years".into());
    }
    if let Err(err) = token.permissions.validate() {
        errors.insert("permissions".into(), err.to_string());
    }
    if !errors.is_empty() {
        return Err(StoreError::InvalidArgument(errors));
    }
    let namespace = token.namespace.clone();
    token.permissions.stamp_namespace(&namespace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use warden_authz::{Method, OidcGroups, Permission, Permissions, Topic};

    #[test]
    fn prepare_role_collects_every_field_error() {
        let mut role = Role::new(
            "",
            "",
            OidcGroups::from(["g1", ""]),
            Permissions::from(vec![Permission {
                namespace: String::new(),
                topic: "nope".into(),
                method: "GET".into(),
            }]),
        );
        let Err(StoreError::InvalidArgument(fields)) = prepare_role(&mut role) else {
            panic!("expected validation error");
        };
        assert_eq!(
            fields.keys().cloned().collect::<Vec<_>>(),
            vec!["name", "namespace", "oidcGroups", "permissions"]
        );
    }

    #[test]
    fn prepare_role_stamps_namespace() {
        let mut role = Role::new(
            "ns1",
            "r1",
            OidcGroups::from(["g1"]),
            Permissions::from(vec![Permission::new("other", Topic::Secrets, Method::Get)]),
        );
        prepare_role(&mut role).expect("valid");
        assert_eq!(role.permissions[0].namespace, "ns1");
    }

    #[test]
    fn prepare_token_rejects_nil_hash_and_negative_lifetime() {
        let now = Utc::now();
        let mut token = ApiToken {
            name: "t1".into(),
            namespace: "ns1".into(),
            description: String::new(),
            hash: Uuid::nil(),
            permissions: Permissions::new(),
            expires_at: now,
            created_at: now,
            updated_at: now,
        };
        let Err(StoreError::InvalidArgument(fields)) = prepare_token(&mut token, -1) else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("hash"));
        assert!(fields.contains_key("lifetime"));

        token.hash = Uuid::new_v4();
        let Err(StoreError::InvalidArgument(fields)) =
            prepare_token(&mut token, MAX_TOKEN_LIFETIME_SECONDS + 1)
        else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("lifetime").map(String::as_str), Some("must not exceed 100 years"));
    }

    #[test]
    fn invalid_argument_display_lists_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("name".into(), "is required".into());
        let err = StoreError::InvalidArgument(fields);
        assert_eq!(err.to_string(), "validation errors: field:'name', err:is required");
    }
}

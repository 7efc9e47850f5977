//! In-memory implementation of the role and token stores.
//!
//! # Purpose
//! Keeps roles and API tokens in `HashMap`s guarded by `tokio::sync::RwLock`.
//! It exists for local development, tests, and deployments where durability
//! is not required.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Writes take the write lock for the whole map, so uniqueness checks and
//!   inserts are atomic within one process.
//! - Multiple warden instances each hold independent state.
//!
//! # Ordering
//! Lists are returned oldest first. Records carry an insertion sequence so
//! that records created within the same clock tick still sort stably.
use super::{
    RoleStore, StoreError, StoreResult, TokenStore, WardenStore, prepare_role, prepare_token,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;
use warden_authz::{ApiToken, Role};

type RecordKey = (String, String);

#[derive(Debug, Clone)]
struct Sequenced<T> {
    seq: u64,
    record: T,
}

#[derive(Default)]
pub struct InMemoryStore {
    roles: Arc<RwLock<HashMap<RecordKey, Sequenced<Role>>>>,
    tokens: Arc<RwLock<HashMap<RecordKey, Sequenced<ApiToken>>>>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }
}

fn key(namespace: &str, name: &str) -> RecordKey {
    (namespace.to_string(), name.to_string())
}

fn sorted<'a, T: Clone + 'a>(items: impl Iterator<Item = &'a Sequenced<T>>) -> Vec<T> {
    let mut items: Vec<_> = items.collect();
    items.sort_by_key(|item| item.seq);
    items.into_iter().map(|item| item.record.clone()).collect()
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn create_role(&self, mut role: Role) -> StoreResult<Role> {
        prepare_role(&mut role)?;
        let now = Utc::now();
        role.created_at = now;
        role.updated_at = now;

        let mut roles = self.roles.write().await;
        let role_key = key(&role.namespace, &role.name);
        if roles.contains_key(&role_key) {
            return Err(StoreError::Duplicate("role exists".into()));
        }
        let seq = self.next_seq();
        roles.insert(
            role_key,
            Sequenced {
                seq,
                record: role.clone(),
            },
        );
        Ok(role)
    }

    async fn update_role(&self, namespace: &str, name: &str, mut role: Role) -> StoreResult<Role> {
        role.namespace = namespace.to_string();
        prepare_role(&mut role)?;

        let mut roles = self.roles.write().await;
        let old_key = key(namespace, name);
        let existing = roles
            .get(&old_key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("role".into()))?;
        let new_key = key(namespace, &role.name);
        if new_key != old_key && roles.contains_key(&new_key) {
            return Err(StoreError::Duplicate("role exists".into()));
        }
        role.created_at = existing.record.created_at;
        role.updated_at = Utc::now();
        roles.remove(&old_key);
        roles.insert(
            new_key,
            Sequenced {
                seq: existing.seq,
                record: role.clone(),
            },
        );
        Ok(role)
    }

    async fn delete_role(&self, namespace: &str, name: &str) -> StoreResult<()> {
        self.roles
            .write()
            .await
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("role".into()))
    }

    async fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Role> {
        self.roles
            .read()
            .await
            .get(&key(namespace, name))
            .map(|entry| entry.record.clone())
            .ok_or_else(|| StoreError::NotFound("role".into()))
    }

    async fn list_roles(&self, namespace: &str) -> StoreResult<Vec<Role>> {
        let roles = self.roles.read().await;
        Ok(sorted(
            roles.values().filter(|entry| entry.record.namespace == namespace),
        ))
    }

    async fn list_all_roles(&self) -> StoreResult<Vec<Role>> {
        let roles = self.roles.read().await;
        Ok(sorted(roles.values()))
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn create_token(&self, mut token: ApiToken, lifetime_seconds: i64) -> StoreResult<ApiToken> {
        prepare_token(&mut token, lifetime_seconds)?;
        let now = Utc::now();
        token.created_at = now;
        token.updated_at = now;
        token.expires_at = now + chrono::Duration::seconds(lifetime_seconds);

        let mut tokens = self.tokens.write().await;
        let token_key = key(&token.namespace, &token.name);
        if tokens.contains_key(&token_key) {
            return Err(StoreError::Duplicate("api token exists".into()));
        }
        if tokens.values().any(|entry| entry.record.hash == token.hash) {
            return Err(StoreError::Duplicate("api token hash exists".into()));
        }
        let seq = self.next_seq();
        tokens.insert(
            token_key,
            Sequenced {
                seq,
                record: token.clone(),
            },
        );
        Ok(token)
    }

    async fn delete_token(&self, namespace: &str, name: &str) -> StoreResult<()> {
        self.tokens
            .write()
            .await
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("api token".into()))
    }

    async fn get_token(&self, namespace: &str, name: &str) -> StoreResult<ApiToken> {
        self.tokens
            .read()
            .await
            .get(&key(namespace, name))
            .map(|entry| entry.record.clone())
            .ok_or_else(|| StoreError::NotFound("api token".into()))
    }

    async fn get_token_by_hash(&self, hash: Uuid) -> StoreResult<ApiToken> {
        self.tokens
            .read()
            .await
            .values()
            .find(|entry| entry.record.hash == hash)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| StoreError::NotFound("api token".into()))
    }

    async fn list_tokens(&self, namespace: &str) -> StoreResult<Vec<ApiToken>> {
        let tokens = self.tokens.read().await;
        Ok(sorted(
            tokens.values().filter(|entry| entry.record.namespace == namespace),
        ))
    }
}

#[async_trait]
impl WardenStore for InMemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_authz::{Method, OidcGroups, Permission, Permissions, Topic, hash_token_id};

    fn role(namespace: &str, name: &str, group: &str) -> Role {
        Role::new(
            namespace,
            name,
            OidcGroups::from([group]),
            Permissions::from(vec![Permission::new("ignored", Topic::Secrets, Method::Get)]),
        )
    }

    fn token(namespace: &str, name: &str) -> ApiToken {
        let now = Utc::now();
        ApiToken {
            name: name.into(),
            namespace: namespace.into(),
            description: "ci".into(),
            hash: hash_token_id(Uuid::new_v4()),
            permissions: Permissions::from(vec![Permission::new("", Topic::Logs, Method::Read)]),
            expires_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn role_crud_roundtrip() {
        let store = InMemoryStore::new();
        let created = store.create_role(role("ns1", "r1", "g1")).await.expect("create");
        assert_eq!(created.permissions[0].namespace, "ns1");

        let fetched = store.get_role("ns1", "r1").await.expect("get");
        assert_eq!(fetched, created);

        let mut renamed = role("ignored", "r2", "g2");
        renamed.description = "renamed".into();
        let updated = store.update_role("ns1", "r1", renamed).await.expect("update");
        assert_eq!(updated.namespace, "ns1");
        assert_eq!(updated.permissions[0].namespace, "ns1");
        assert_eq!(updated.created_at, created.created_at);
        assert!(matches!(
            store.get_role("ns1", "r1").await,
            Err(StoreError::NotFound(_))
        ));

        store.delete_role("ns1", "r2").await.expect("delete");
        assert!(matches!(
            store.delete_role("ns1", "r2").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn role_uniqueness_is_per_namespace() {
        let store = InMemoryStore::new();
        store.create_role(role("ns1", "r1", "g1")).await.expect("create");
        store.create_role(role("ns2", "r1", "g1")).await.expect("other namespace");
        assert!(matches!(
            store.create_role(role("ns1", "r1", "g2")).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn update_rename_onto_existing_is_duplicate() {
        let store = InMemoryStore::new();
        store.create_role(role("ns1", "r1", "g1")).await.expect("r1");
        store.create_role(role("ns1", "r2", "g1")).await.expect("r2");
        assert!(matches!(
            store.update_role("ns1", "r1", role("ns1", "r2", "g1")).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn lists_are_oldest_first() {
        let store = InMemoryStore::new();
        for name in ["c", "a", "b"] {
            store.create_role(role("ns1", name, "g1")).await.expect("create");
        }
        store.create_role(role("ns2", "z", "g1")).await.expect("create");

        let names: Vec<_> = store
            .list_roles("ns1")
            .await
            .expect("list")
            .into_iter()
            .map(|role| role.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(store.list_all_roles().await.expect("all").len(), 4);
    }

    #[tokio::test]
    async fn token_lookup_by_hash_and_expiry() {
        let store = InMemoryStore::new();
        let created = store.create_token(token("ns1", "t1"), 3600).await.expect("create");
        assert!(!created.is_expired());
        assert_eq!(created.permissions[0].namespace, "ns1");

        let found = store.get_token_by_hash(created.hash).await.expect("by hash");
        assert_eq!(found.name, "t1");

        let dead = store.create_token(token("ns1", "t2"), 0).await.expect("create");
        assert!(dead.is_expired());

        assert!(matches!(
            store.get_token_by_hash(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn token_duplicate_and_delete() {
        let store = InMemoryStore::new();
        store.create_token(token("ns1", "t1"), 60).await.expect("create");
        assert!(matches!(
            store.create_token(token("ns1", "t1"), 60).await,
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.list_tokens("ns1").await.expect("list").len(), 1);
        store.delete_token("ns1", "t1").await.expect("delete");
        assert!(store.list_tokens("ns1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_before_insert() {
        let store = InMemoryStore::new();
        let mut bad = token("ns1", "");
        bad.hash = Uuid::nil();
        assert!(matches!(
            store.create_token(bad, 60).await,
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(store.list_tokens("ns1").await.expect("list").is_empty());
    }
}

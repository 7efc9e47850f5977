//! Postgres-backed implementation of the role and token stores.
//!
//! # Purpose
//! Durable, shared storage for roles and API tokens so several warden
//! instances see the same authorization data.
//!
//! # Key invariants
//! - `(namespace, name)` is the primary key of both tables; a unique violation
//!   (SQLSTATE `23505`) surfaces as [`StoreError::Duplicate`].
//! - Token hashes are unique; raw secrets are never written.
//! - Groups and permissions are stored as JSONB arrays and re-validated on
//!   every write, never on read.
//!
//! # Security model / threat assumptions
//! - Database URLs may contain credentials; never log them.
//! - All statements are static SQL with bound parameters.
//!
//! # Operational notes
//! Migrations run at startup via `sqlx::migrate!("./migrations")` so handlers
//! can assume the schema exists. Pool sizing and acquire/connect timeouts are
//! explicit so a stalled database fails requests instead of hanging them.
use super::{
    RoleStore, StoreError, StoreResult, TokenStore, WardenStore, prepare_role, prepare_token,
};
use crate::config::PostgresConfig;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;
use warden_authz::{ApiToken, OidcGroups, Permissions, Role};

pub struct PostgresStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct DbRole {
    namespace: String,
    name: String,
    description: String,
    oidc_groups: Json<OidcGroups>,
    permissions: Json<Permissions>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbRole> for Role {
    fn from(row: DbRole) -> Self {
        Role {
            name: row.name,
            namespace: row.namespace,
            description: row.description,
            oidc_groups: row.oidc_groups.0,
            permissions: row.permissions.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DbApiToken {
    namespace: String,
    name: String,
    description: String,
    hash: Uuid,
    permissions: Json<Permissions>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbApiToken> for ApiToken {
    fn from(row: DbApiToken) -> Self {
        ApiToken {
            name: row.name,
            namespace: row.namespace,
            description: row.description,
            hash: row.hash,
            permissions: row.permissions.0,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

const ROLE_COLUMNS: &str =
    "namespace, name, description, oidc_groups, permissions, created_at, updated_at";
const TOKEN_COLUMNS: &str =
    "namespace, name, description, hash, permissions, expires_at, created_at, updated_at";

impl PostgresStore {
    /// Connect, run migrations, and return a ready store.
    ///
    /// # Errors
    /// - [`StoreError::Unexpected`] if the URL is invalid, the database is
    ///   unreachable within the connect timeout, or migrations fail.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without applying migrations; tests manage the schema themselves.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
            .await
            .map_err(|_| anyhow!("postgres connect timed out"))??;

        if run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|err| anyhow!("postgres migrations failed: {err}"))?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn write_error(err: sqlx::Error, entity: &str) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Duplicate(format!("{entity} exists"));
    }
    StoreError::Unexpected(err.into())
}

#[async_trait]
impl RoleStore for PostgresStore {
    async fn create_role(&self, mut role: Role) -> StoreResult<Role> {
        prepare_role(&mut role)?;
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbRole>(&format!(
            "INSERT INTO warden_roles \
             (namespace, name, description, oidc_groups, permissions, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING {ROLE_COLUMNS}"
        ))
        .bind(&role.namespace)
        .bind(&role.name)
        .bind(&role.description)
        .bind(Json(&role.oidc_groups))
        .bind(Json(&role.permissions))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| write_error(err, "role"))?;
        Ok(row.into())
    }

    async fn update_role(&self, namespace: &str, name: &str, mut role: Role) -> StoreResult<Role> {
        role.namespace = namespace.to_string();
        prepare_role(&mut role)?;
        let row = sqlx::query_as::<_, DbRole>(&format!(
            "UPDATE warden_roles \
             SET name = $3, description = $4, oidc_groups = $5, permissions = $6, updated_at = $7 \
             WHERE namespace = $1 AND name = $2 RETURNING {ROLE_COLUMNS}"
        ))
        .bind(namespace)
        .bind(name)
        .bind(&role.name)
        .bind(&role.description)
        .bind(Json(&role.oidc_groups))
        .bind(Json(&role.permissions))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| write_error(err, "role"))?;
        row.map(Role::from)
            .ok_or_else(|| StoreError::NotFound("role".into()))
    }

    async fn delete_role(&self, namespace: &str, name: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM warden_roles WHERE namespace = $1 AND name = $2")
            .bind(namespace)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role".into()));
        }
        Ok(())
    }

    async fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Role> {
        sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM warden_roles WHERE namespace = $1 AND name = $2"
        ))
        .bind(namespace)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .map(Role::from)
        .ok_or_else(|| StoreError::NotFound("role".into()))
    }

    async fn list_roles(&self, namespace: &str) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM warden_roles WHERE namespace = $1 \
             ORDER BY created_at ASC, name ASC"
        ))
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn list_all_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM warden_roles ORDER BY created_at ASC, namespace ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }
}

#[async_trait]
impl TokenStore for PostgresStore {
    async fn create_token(&self, mut token: ApiToken, lifetime_seconds: i64) -> StoreResult<ApiToken> {
        prepare_token(&mut token, lifetime_seconds)?;
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(lifetime_seconds);
        let row = sqlx::query_as::<_, DbApiToken>(&format!(
            "INSERT INTO warden_api_tokens \
             (namespace, name, description, hash, permissions, expires_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(&token.namespace)
        .bind(&token.name)
        .bind(&token.description)
        .bind(token.hash)
        .bind(Json(&token.permissions))
        .bind(expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| write_error(err, "api token"))?;
        Ok(row.into())
    }

    async fn delete_token(&self, namespace: &str, name: &str) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM warden_api_tokens WHERE namespace = $1 AND name = $2")
                .bind(namespace)
                .bind(name)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("api token".into()));
        }
        Ok(())
    }

    async fn get_token(&self, namespace: &str, name: &str) -> StoreResult<ApiToken> {
        sqlx::query_as::<_, DbApiToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM warden_api_tokens WHERE namespace = $1 AND name = $2"
        ))
        .bind(namespace)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .map(ApiToken::from)
        .ok_or_else(|| StoreError::NotFound("api token".into()))
    }

    async fn get_token_by_hash(&self, hash: Uuid) -> StoreResult<ApiToken> {
        sqlx::query_as::<_, DbApiToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM warden_api_tokens WHERE hash = $1"
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?
        .map(ApiToken::from)
        .ok_or_else(|| StoreError::NotFound("api token".into()))
    }

    async fn list_tokens(&self, namespace: &str) -> StoreResult<Vec<ApiToken>> {
        let rows = sqlx::query_as::<_, DbApiToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM warden_api_tokens WHERE namespace = $1 \
             ORDER BY created_at ASC, name ASC"
        ))
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ApiToken::from).collect())
    }
}

#[async_trait]
impl WardenStore for PostgresStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

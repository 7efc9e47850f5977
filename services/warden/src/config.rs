//! Service configuration.
//!
//! # Purpose
//! Builds the immutable [`WardenConfig`] from environment variables, with an
//! optional YAML override file named by `WARDEN_CONFIG`.
//!
//! # Key invariants
//! - The config is built once at startup and shared behind an `Arc`; nothing
//!   re-reads the environment per request.
//! - An OIDC issuer requires both an admin group and a client id.
//! - Boolean switches only turn on for the literal value `true`.
use anyhow::{Context, Result, bail};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer_url: Option<String>,
    pub client_id: Option<String>,
    pub admin_group: Option<String>,
    /// Canned groups instead of token verification. Local development only.
    pub dev: bool,
    pub skip_tls_verify: bool,
    pub allowed_algorithms: Vec<Algorithm>,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer_url: None,
            client_id: None,
            admin_group: None,
            dev: false,
            skip_tls_verify: false,
            allowed_algorithms: vec![Algorithm::ES256],
        }
    }
}

#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub api_key: Option<String>,
    pub oidc: OidcConfig,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub role_cache: bool,
    pub store_timeout: Duration,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub license: Option<String>,
    pub license_public_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WardenConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    api_key: Option<String>,
    oidc_issuer_url: Option<String>,
    oidc_client_id: Option<String>,
    oidc_admin_group: Option<String>,
    oidc_allowed_algorithms: Option<Vec<String>>,
    cache_capacity: Option<usize>,
    cache_ttl_secs: Option<u64>,
    role_cache: Option<bool>,
    store_timeout_ms: Option<u64>,
    storage: Option<String>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8443)),
            metrics_bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_key: None,
            oidc: OidcConfig::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            role_cache: false,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            storage: StorageBackend::Memory,
            postgres: None,
            license: None,
            license_public_key: None,
        }
    }
}

impl WardenConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("WARDEN_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8443".to_string())
            .parse()
            .with_context(|| "parse WARDEN_BIND")?;
        let metrics_bind = std::env::var("WARDEN_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse WARDEN_METRICS_BIND")?;
        let allowed_algorithms = match non_empty_env("WARDEN_OIDC_ALLOWED_ALGORITHMS") {
            Some(raw) => parse_algorithms(raw.split(','))?,
            None => vec![Algorithm::ES256],
        };
        let oidc = OidcConfig {
            issuer_url: non_empty_env("WARDEN_OIDC_ISSUER_URL"),
            client_id: non_empty_env("WARDEN_OIDC_CLIENT_ID"),
            admin_group: non_empty_env("WARDEN_OIDC_ADMIN_GROUP"),
            dev: env_flag("WARDEN_OIDC_DEV"),
            skip_tls_verify: env_flag("WARDEN_OIDC_SKIP_TLS_VERIFY"),
            allowed_algorithms,
        };
        let cache_capacity = std::env::var("WARDEN_CREDENTIAL_CACHE_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_CACHE_CAPACITY.to_string())
            .parse()
            .with_context(|| "parse WARDEN_CREDENTIAL_CACHE_CAPACITY")?;
        let cache_ttl_secs: u64 = std::env::var("WARDEN_CREDENTIAL_CACHE_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_CACHE_TTL_SECS.to_string())
            .parse()
            .with_context(|| "parse WARDEN_CREDENTIAL_CACHE_TTL_SECS")?;
        let store_timeout_ms: u64 = std::env::var("WARDEN_STORE_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_STORE_TIMEOUT_MS.to_string())
            .parse()
            .with_context(|| "parse WARDEN_STORE_TIMEOUT_MS")?;
        let storage: StorageBackend = std::env::var("WARDEN_STORAGE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()
            .with_context(|| "parse WARDEN_STORAGE")?;
        let postgres = match non_empty_env("WARDEN_PG_URL") {
            Some(url) => Some(PostgresConfig {
                url,
                max_connections: std::env::var("WARDEN_PG_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .with_context(|| "parse WARDEN_PG_MAX_CONNECTIONS")?,
                connect_timeout_ms: std::env::var("WARDEN_PG_CONNECT_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .with_context(|| "parse WARDEN_PG_CONNECT_TIMEOUT_MS")?,
                acquire_timeout_ms: std::env::var("WARDEN_PG_ACQUIRE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .with_context(|| "parse WARDEN_PG_ACQUIRE_TIMEOUT_MS")?,
            }),
            None => None,
        };

        Ok(Self {
            bind_addr,
            metrics_bind,
            api_key: non_empty_env("WARDEN_API_KEY"),
            oidc,
            cache_capacity,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            role_cache: env_flag("WARDEN_ROLE_CACHE"),
            store_timeout: Duration::from_millis(store_timeout_ms),
            storage,
            postgres,
            license: non_empty_env("WARDEN_LICENSE"),
            license_public_key: non_empty_env("WARDEN_LICENSE_PUBLIC_KEY"),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("WARDEN_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read WARDEN_CONFIG: {path}"))?;
            let override_cfg: WardenConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse warden config yaml")?;
            config.apply_override(override_cfg)?;
        }
        Ok(config)
    }

    fn apply_override(&mut self, override_cfg: WardenConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.api_key {
            self.api_key = Some(value).filter(|key| !key.is_empty());
        }
        if let Some(value) = override_cfg.oidc_issuer_url {
            self.oidc.issuer_url = Some(value);
        }
        if let Some(value) = override_cfg.oidc_client_id {
            self.oidc.client_id = Some(value);
        }
        if let Some(value) = override_cfg.oidc_admin_group {
            self.oidc.admin_group = Some(value);
        }
        if let Some(values) = override_cfg.oidc_allowed_algorithms {
            self.oidc.allowed_algorithms = parse_algorithms(values.iter().map(String::as_str))?;
        }
        if let Some(value) = override_cfg.cache_capacity {
            self.cache_capacity = value;
        }
        if let Some(value) = override_cfg.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(value);
        }
        if let Some(value) = override_cfg.role_cache {
            self.role_cache = value;
        }
        if let Some(value) = override_cfg.store_timeout_ms {
            self.store_timeout = Duration::from_millis(value);
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value.parse().with_context(|| "parse storage")?;
        }
        if let Some(url) = override_cfg.postgres_url {
            let pg = self.postgres.get_or_insert(PostgresConfig {
                url: String::new(),
                max_connections: 10,
                connect_timeout_ms: 5000,
                acquire_timeout_ms: 5000,
            });
            pg.url = url;
        }
        if let (Some(value), Some(pg)) = (override_cfg.postgres_max_connections, &mut self.postgres)
        {
            pg.max_connections = value;
        }
        Ok(())
    }

    /// Cross-field checks run once before the service starts.
    pub fn validate(&self) -> Result<()> {
        if self.oidc.issuer_url.is_some() {
            if self.oidc.admin_group.is_none() {
                bail!("missing WARDEN_OIDC_ADMIN_GROUP environment variable");
            }
            if self.oidc.client_id.is_none() {
                bail!("missing WARDEN_OIDC_CLIENT_ID environment variable");
            }
        }
        if self.cache_capacity == 0 {
            bail!("WARDEN_CREDENTIAL_CACHE_CAPACITY must be positive");
        }
        if self.storage == StorageBackend::Postgres && self.postgres.is_none() {
            bail!("postgres configuration missing");
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).map(|value| value == "true").unwrap_or(false)
}

fn parse_algorithms<'a>(values: impl Iterator<Item = &'a str>) -> Result<Vec<Algorithm>> {
    let mut algorithms = Vec::new();
    for value in values.map(str::trim).filter(|value| !value.is_empty()) {
        let alg = Algorithm::from_str(value)
            .with_context(|| format!("parse oidc algorithm: {value}"))?;
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }
    if algorithms.is_empty() {
        bail!("at least one oidc algorithm is required");
    }
    Ok(algorithms)
}

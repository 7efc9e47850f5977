//! Credential cache shared by the resolver stages.
//!
//! # Purpose
//! Maps a raw credential string to the claim string resolved from it (joined
//! OIDC groups or an encoded permission set) so repeated requests skip token
//! verification and store lookups.
//!
//! # Key invariants
//! - Keys are scoped by [`CredentialKind`]; a bearer token never reads an
//!   API-token entry and vice versa.
//! - Capacity-bounded with least-recently-used eviction. Expired entries are
//!   dropped before any live entry is evicted.
//! - Every entry expires a fixed TTL after it was written, whether or not it
//!   has been evicted for space. Reads never extend the TTL.
//! - A hit returns exactly the claim string a fresh resolution stored, so a
//!   lost entry only costs latency.
//! - There is no invalidation hook: edits to roles or tokens take effect once
//!   the cached entry ages out.
//!
//! # Concurrency model
//! Keys hash onto independent shards, each a small LRU behind its own mutex.
//! A get or put locks exactly one shard and does `O(log n)` work on that
//! shard's indexes. No operation scans or locks the whole cache.
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, RandomState};
use std::time::Duration;
use tokio::time::Instant;

/// Shards are only split off once each would still hold this many entries.
const MIN_SHARD_CAPACITY: usize = 32;
const MAX_SHARDS: usize = 16;

/// Which resolver stage owns a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialKind {
    /// Bearer token resolved into joined OIDC groups.
    Oidc,
    /// API token resolved into an encoded permission set.
    ApiToken,
}

type CacheKey = (CredentialKind, String);

#[derive(Debug)]
struct CacheEntry {
    value: String,
    written_at: Instant,
    write_tick: u64,
    used_tick: u64,
}

/// One LRU partition. `by_use` and `by_write` index the same keys as
/// `entries`, ordered by last use and by write time respectively.
#[derive(Debug, Default)]
struct Shard {
    entries: HashMap<CacheKey, CacheEntry>,
    by_use: BTreeMap<u64, CacheKey>,
    by_write: BTreeMap<u64, CacheKey>,
    clock: u64,
    capacity: usize,
}

impl Shard {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn get(&mut self, key: &CacheKey, ttl: Duration) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.written_at.elapsed() >= ttl {
            self.remove(key);
            return None;
        }
        let old_tick = entry.used_tick;
        let tick = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.used_tick = tick;
        let value = entry.value.clone();
        if let Some(key) = self.by_use.remove(&old_tick) {
            self.by_use.insert(tick, key);
        }
        Some(value)
    }

    fn put(&mut self, key: CacheKey, value: String, ttl: Duration) {
        self.purge_expired(ttl);
        self.remove(&key);

        // Ticks and write instants are taken under the shard lock, so write
        // order and `written_at` order agree within a shard.
        let tick = self.tick();
        self.by_use.insert(tick, key.clone());
        self.by_write.insert(tick, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                written_at: Instant::now(),
                write_tick: tick,
                used_tick: tick,
            },
        );

        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.by_use.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                self.by_write.remove(&entry.write_tick);
            }
        }
    }

    /// Drop entries from the front of the write order while they are expired.
    fn purge_expired(&mut self, ttl: Duration) {
        while let Some((_, key)) = self.by_write.first_key_value() {
            let expired = self
                .entries
                .get(key)
                .is_none_or(|entry| entry.written_at.elapsed() >= ttl);
            if !expired {
                break;
            }
            let key = key.clone();
            self.remove(&key);
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.by_use.remove(&entry.used_tick);
            self.by_write.remove(&entry.write_tick);
        }
    }
}

#[derive(Debug)]
pub struct CredentialCache {
    shards: Box<[Mutex<Shard>]>,
    hasher: RandomState,
    capacity: usize,
    ttl: Duration,
}

impl CredentialCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        let shard_count = (capacity / MIN_SHARD_CAPACITY).clamp(1, MAX_SHARDS);
        let base = capacity / shard_count;
        let remainder = capacity % shard_count;
        let shards = (0..shard_count)
            .map(|idx| Mutex::new(Shard::with_capacity(base + usize::from(idx < remainder))))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, kind: CredentialKind, credential: &str) -> Option<String> {
        let key = (kind, credential.to_string());
        self.shard(&key).lock().get(&key, self.ttl)
    }

    /// Insert or replace the entry for `credential`, restarting its TTL.
    pub fn put(&self, kind: CredentialKind, credential: &str, value: impl Into<String>) {
        let key = (kind, credential.to_string());
        self.shard(&key).lock().put(key, value.into(), self.ttl);
    }

    /// Entries currently held, including ones not yet purged after expiry.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn shard(&self, key: &CacheKey) -> &Mutex<Shard> {
        let idx = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }
}

//! In-memory profile caches keyed by query shape.
//!
//! Two shapes carry materialized content: the per-channel profile map (what
//! `get_all_profiles_in_channel` serves when the caller allows a cached read)
//! and the per-user profile entry backing batch id lookups. The remaining
//! listing shapes (all profiles, per team, not in team) are validated by
//! storage-derived etags instead and keep no content here.
//!
//! Content is best-effort: a hit returns the last computed map, and callers
//! that need exact freshness compare etags first. Entries are swapped as whole
//! `Arc` payloads, so concurrent readers never observe a torn map.

use dashmap::DashMap;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::CacheConfig;
use crate::models::User;

lazy_static! {
    static ref CACHE_HIT: IntCounter = register_int_counter!(
        "profile_cache_hit_total",
        "Total number of profile cache hits"
    )
    .expect("Failed to register profile_cache_hit_total");

    static ref CACHE_MISS: IntCounter = register_int_counter!(
        "profile_cache_miss_total",
        "Total number of profile cache misses"
    )
    .expect("Failed to register profile_cache_miss_total");

    static ref CACHE_EVICTION: IntCounter = register_int_counter!(
        "profile_cache_eviction_total",
        "Total number of profile cache evictions (TTL or entry limit)"
    )
    .expect("Failed to register profile_cache_eviction_total");

    static ref CACHE_INVALIDATION: IntCounter = register_int_counter!(
        "profile_cache_invalidation_total",
        "Total number of explicit profile cache invalidations"
    )
    .expect("Failed to register profile_cache_invalidation_total");
}

/// Cached value with TTL metadata.
#[derive(Debug, Clone)]
struct CachedEntry<T> {
    data: T,
    expires_at: Instant,
}

impl<T> CachedEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Profile map for one channel, shared out to callers without copying.
pub type ChannelProfiles = Arc<HashMap<String, User>>;

/// Process-local cache service. One instance per store; no hidden globals.
///
/// Thread-safety comes from DashMap (lock-free concurrent access). Entry
/// limits are enforced with partial FIFO-style eviction before inserts.
pub struct ProfileCache {
    /// channel id -> id-keyed profile map for that channel's members
    channel_profiles: DashMap<String, CachedEntry<ChannelProfiles>>,

    /// user id -> last seen profile row
    profiles: DashMap<String, CachedEntry<User>>,

    channel_max_entries: usize,
    profile_max_entries: usize,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new(config: &CacheConfig) -> Self {
        debug!(
            channel_max_entries = config.channel_profiles_max_entries,
            profile_max_entries = config.profiles_max_entries,
            ttl_secs = config.ttl_secs,
            "Initializing profile cache"
        );

        Self {
            channel_profiles: DashMap::new(),
            profiles: DashMap::new(),
            channel_max_entries: config.channel_profiles_max_entries,
            profile_max_entries: config.profiles_max_entries,
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    // =========================================================================
    // Channel shape
    // =========================================================================

    pub fn get_profiles_in_channel(&self, channel_id: &str) -> Option<ChannelProfiles> {
        if let Some(entry) = self.channel_profiles.get(channel_id) {
            if !entry.is_expired() {
                CACHE_HIT.inc();
                return Some(entry.data.clone());
            }
            drop(entry);
            if self.channel_profiles.remove(channel_id).is_some() {
                CACHE_EVICTION.inc();
            }
        }
        CACHE_MISS.inc();
        None
    }

    pub fn set_profiles_in_channel(&self, channel_id: &str, profiles: ChannelProfiles) {
        enforce_entry_limit(&self.channel_profiles, self.channel_max_entries);
        self.channel_profiles
            .insert(channel_id.to_string(), CachedEntry::new(profiles, self.ttl));
    }

    /// Drops the cached map for a single channel.
    pub fn invalidate_profiles_in_channel(&self, channel_id: &str) {
        if self.channel_profiles.remove(channel_id).is_some() {
            CACHE_INVALIDATION.inc();
            debug!(channel_id = %channel_id, "profile cache INVALIDATE channel");
        }
    }

    /// Drops the cached map of every channel whose membership includes the
    /// given user. Used when a profile changes and the affected channels are
    /// not known to the caller.
    pub fn invalidate_profiles_in_channel_by_user(&self, user_id: &str) {
        let stale: Vec<String> = self
            .channel_profiles
            .iter()
            .filter(|entry| entry.data.contains_key(user_id))
            .map(|entry| entry.key().clone())
            .collect();

        let invalidated = stale.len();
        for channel_id in stale {
            self.channel_profiles.remove(&channel_id);
            CACHE_INVALIDATION.inc();
        }
        if invalidated > 0 {
            debug!(user_id = %user_id, invalidated, "profile cache INVALIDATE channels by user");
        }
    }

    // =========================================================================
    // Per-user shape
    // =========================================================================

    pub fn get_profile(&self, user_id: &str) -> Option<User> {
        if let Some(entry) = self.profiles.get(user_id) {
            if !entry.is_expired() {
                CACHE_HIT.inc();
                return Some(entry.data.clone());
            }
            drop(entry);
            if self.profiles.remove(user_id).is_some() {
                CACHE_EVICTION.inc();
            }
        }
        CACHE_MISS.inc();
        None
    }

    pub fn set_profile(&self, user: &User) {
        enforce_entry_limit(&self.profiles, self.profile_max_entries);
        self.profiles
            .insert(user.id.clone(), CachedEntry::new(user.clone(), self.ttl));
    }

    pub fn invalidate_profile(&self, user_id: &str) {
        if self.profiles.remove(user_id).is_some() {
            CACHE_INVALIDATION.inc();
            debug!(user_id = %user_id, "profile cache INVALIDATE user");
        }
    }

    /// Conservative hook fired on any user write: the user may appear in any
    /// channel map, and the stale row must not be served by id either.
    pub fn invalidate_user(&self, user_id: &str) {
        self.invalidate_profile(user_id);
        self.invalidate_profiles_in_channel_by_user(user_id);
    }

    pub fn clear(&self) {
        let cleared = self.channel_profiles.len() + self.profiles.len();
        self.channel_profiles.clear();
        self.profiles.clear();
        debug!(cleared, "profile cache CLEAR");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            channel_entries: self.channel_profiles.len(),
            profile_entries: self.profiles.len(),
            hit_count: CACHE_HIT.get(),
            miss_count: CACHE_MISS.get(),
            eviction_count: CACHE_EVICTION.get(),
            invalidation_count: CACHE_INVALIDATION.get(),
        }
    }
}

/// Evict a batch of entries (10% or at least one) when the map is at capacity.
/// DashMap iteration order stands in for age; entries also age out via TTL.
fn enforce_entry_limit<T>(map: &DashMap<String, CachedEntry<T>>, max_entries: usize) {
    if map.len() < max_entries {
        return;
    }

    let evict_count = (map.len() / 10).max(1);
    let stale: Vec<String> = map
        .iter()
        .take(evict_count)
        .map(|entry| entry.key().clone())
        .collect();

    for key in stale {
        if map.remove(&key).is_some() {
            CACHE_EVICTION.inc();
        }
    }
}

/// Point-in-time cache counters. Hit/miss/eviction totals are process-wide.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub channel_entries: usize,
    pub profile_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub invalidation_count: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            (self.hit_count as f64 / total as f64) * 100.0
        }
    }
}

//! Per-target hit deduplication.
//!
//! Every damageable entity owns one [`HitDedupCache`]. A hit is identified by
//! its [`HitKey`]; the cache accepts a key at most once while the key is
//! younger than the TTL. Expired entries are pruned lazily on every accept,
//! oldest first, so the cost is proportional to the number of expired keys.
//!
//! Known limitation: once a key has aged out, a replay of the same hit is
//! accepted again. The TTL is sized well above realistic redelivery windows.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use skirmish_net::EntityId;

/// Default lifetime of a recorded hit, in simulated seconds.
pub const DEFAULT_HIT_TTL_SECS: f64 = 3.0;

/// One discrete damage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitKey {
    /// Entity credited with the hit.
    pub attacker: EntityId,
    /// Per-attacker counter minted by the attacker's controlling node.
    pub hit_id: u64,
}

impl HitKey {
    pub fn new(attacker: EntityId, hit_id: u64) -> Self {
        Self { attacker, hit_id }
    }
}

/// A recorded key and when it was first accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitDedupEntry {
    pub key: HitKey,
    pub observed_at: f64,
}

/// At-most-once gate for hits landing on one entity.
#[derive(Debug, Clone)]
pub struct HitDedupCache {
    ttl: f64,
    /// Entries in acceptance order. Simulation time never goes backwards on
    /// one node, so the front is always the oldest.
    order: VecDeque<HitDedupEntry>,
    seen: FxHashSet<HitKey>,
}

impl HitDedupCache {
    /// Create an empty cache with the given TTL in seconds.
    pub fn new(ttl: f64) -> Self {
        Self {
            ttl,
            order: VecDeque::new(),
            seen: FxHashSet::default(),
        }
    }

    /// TTL in seconds.
    pub fn ttl(&self) -> f64 {
        self.ttl
    }

    /// Record `key` if it has not been seen within the TTL.
    ///
    /// Returns `true` exactly once per live key; later calls with the same
    /// key return `false` until the entry expires.
    pub fn try_accept(&mut self, key: HitKey, now: f64) -> bool {
        self.prune(now);
        if !self.seen.insert(key) {
            return false;
        }
        self.order.push_back(HitDedupEntry {
            key,
            observed_at: now,
        });
        true
    }

    /// Whether `key` is currently recorded.
    pub fn contains(&self, key: &HitKey) -> bool {
        self.seen.contains(key)
    }

    /// Drop every entry at least `ttl` old. Returns how many were removed.
    pub fn prune(&mut self, now: f64) -> usize {
        let mut removed = 0;
        while let Some(front) = self.order.front() {
            if now - front.observed_at < self.ttl {
                break;
            }
            self.seen.remove(&front.key);
            self.order.pop_front();
            removed += 1;
        }
        removed
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for HitDedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_HIT_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_net::NodeId;

    fn key(hit_id: u64) -> HitKey {
        HitKey::new(EntityId::compose(NodeId(1), 4), hit_id)
    }

    #[test]
    fn test_accepts_once_within_ttl() {
        let mut cache = HitDedupCache::default();
        assert!(cache.try_accept(key(1), 0.0));
        assert!(!cache.try_accept(key(1), 0.5));
        assert!(!cache.try_accept(key(1), 1.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_boundary() {
        let mut cache = HitDedupCache::default();
        assert!(cache.try_accept(key(7), 0.0));
        assert!(!cache.try_accept(key(7), 2.9), "replay inside TTL rejected");
        assert!(cache.try_accept(key(7), 3.1), "replay after TTL accepted");
    }

    #[test]
    fn test_distinct_keys_independent() {
        let mut cache = HitDedupCache::default();
        let other = HitKey::new(EntityId::compose(NodeId(2), 4), 1);
        assert!(cache.try_accept(key(1), 0.0));
        assert!(cache.try_accept(key(2), 0.0));
        assert!(cache.try_accept(other, 0.0));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let mut cache = HitDedupCache::new(1.0);
        cache.try_accept(key(1), 0.0);
        cache.try_accept(key(2), 0.5);
        cache.try_accept(key(3), 1.2);
        assert_eq!(cache.prune(1.6), 2);
        assert!(!cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn test_accept_prunes_lazily() {
        let mut cache = HitDedupCache::new(1.0);
        for id in 0..50 {
            cache.try_accept(key(id), 0.0);
        }
        assert_eq!(cache.len(), 50);
        cache.try_accept(key(100), 5.0);
        assert_eq!(cache.len(), 1);
    }
}

//! Short-lived caches for derived per-user attributes.
//!
//! Entries are advisory: a miss or an expired entry only means the caller
//! recomputes the value from storage (or from the canonical icon bytes) and
//! stores it again.
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Key/value map with one TTL for every entry.
///
/// Readers share the lock; `set` and lazy eviction take it exclusively. The
/// value and its expiry live in one entry so a reader never sees one without
/// the other.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn set(&self, key: K, value: V) {
        self.set_at(key, value, Instant::now());
    }

    /// Stores `value` only when `key` has no live entry. Readers that derived
    /// the value from a possibly older snapshot use this, so they never
    /// replace what a writer stored after its commit.
    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        self.set_if_absent_at(key, value, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        {
            let entries = self.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict, unless a writer refreshed the entry in between
        let mut entries = self.write();
        if entries
            .get(key)
            .is_some_and(|entry| now >= entry.expires_at)
        {
            entries.remove(key);
        }
        None
    }

    pub(crate) fn set_at(&self, key: K, value: V, now: Instant) {
        let entry = Entry {
            value,
            expires_at: now + self.ttl,
        };
        self.write().insert(key, entry);
    }

    pub(crate) fn set_if_absent_at(&self, key: K, value: V, now: Instant) -> bool {
        let mut entries = self.write();
        if entries.get(&key).is_some_and(|entry| now < entry.expires_at) {
            return false;
        }
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
        true
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned map is still safe to use.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<K, Entry<V>>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<K, Entry<V>>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Username -> hex SHA-256 of the icon bytes.
pub type IconHashCache = TtlCache<String, String>;

/// User id -> dark mode flag.
pub type ThemeCache = TtlCache<i64, bool>;

/// The process-wide cache service, shared through `AppState`.
#[derive(Clone)]
pub struct Caches {
    pub icon_hashes: Arc<IconHashCache>,
    pub themes: Arc<ThemeCache>,
}

impl Caches {
    pub fn new(icon_ttl: Duration, theme_ttl: Duration) -> Self {
        Self {
            icon_hashes: Arc::new(IconHashCache::new(icon_ttl)),
            themes: Arc::new(ThemeCache::new(theme_ttl)),
        }
    }
}

/// Hex-encoded SHA-256 digest of an icon image.
pub fn icon_hash(image: &[u8]) -> String {
    hex::encode(Sha256::digest(image))
}

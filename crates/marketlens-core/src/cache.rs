//! Time-bounded in-memory cache shared by quote and news acquisition.

use std::fmt::{Display, Formatter};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::Capability;

/// Defines how a single acquisition call interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read from the cache if a fresh entry is present;
    /// otherwise resolve through the fallback chain and write the result. (Default)
    #[default]
    Use,
    /// Always resolve, skipping any cached entry, and write the new result.
    Refresh,
    /// Always resolve and neither read from nor write to the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Use => "use",
            Self::Refresh => "refresh",
            Self::Bypass => "bypass",
        }
    }
}

/// Source of "now" for freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to test expiry without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// Cache key: capability plus the symbol or topic it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub capability: Capability,
    pub subject: String,
}

impl CacheKey {
    pub fn quote(symbol: &str) -> Self {
        Self {
            capability: Capability::Quote,
            subject: symbol.to_owned(),
        }
    }

    pub fn news(topic: &str) -> Self {
        Self {
            capability: Capability::News,
            subject: topic.to_owned(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.capability, self.subject)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
    pub fetched_at: Instant,
}

/// Keyed store of `(value, fetched_at)`.
///
/// A read is a hit only while `now - fetched_at < ttl`; stale entries stay in
/// the map until overwritten. The map is sharded, so operations on distinct
/// keys do not contend, and same-key writers resolve last-write-wins.
#[derive(Clone)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: Arc<DashMap<K, CacheEntry<K, V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            clock,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, or `None` when absent or stale.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_with_age(key).map(|(value, _)| value)
    }

    /// Fresh value together with its age.
    pub fn get_with_age(&self, key: &K) -> Option<(V, Duration)> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        let age = now.saturating_duration_since(entry.fetched_at);
        if age < self.ttl {
            Some((entry.value.clone(), age))
        } else {
            None
        }
    }

    /// Store `value` as fetched now, replacing any previous entry.
    pub fn put(&self, key: K, value: V) {
        let fetched_at = self.clock.now();
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                fetched_at,
            },
        );
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl: Duration) -> (TtlCache<CacheKey, String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (TtlCache::with_clock(ttl, clock.clone()), clock)
    }

    #[test]
    fn miss_put_hit_and_overwrite() {
        let (cache, _) = cache(Duration::from_secs(60));
        let key = CacheKey::quote("TCS");

        assert!(cache.get(&key).is_none());

        cache.put(key.clone(), String::from("first"));
        assert_eq!(cache.get(&key).as_deref(), Some("first"));

        cache.put(key.clone(), String::from("second"));
        assert_eq!(cache.get(&key).as_deref(), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entry_expires_exactly_at_ttl() {
        let (cache, clock) = cache(Duration::from_secs(60));
        let key = CacheKey::quote("INFY");
        cache.put(key.clone(), String::from("value"));

        clock.advance(Duration::from_millis(59_999));
        assert!(cache.get(&key).is_some());

        clock.advance(Duration::from_millis(1));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 1, "stale entries are not evicted");
    }

    #[test]
    fn zero_ttl_never_hits() {
        let (cache, _) = cache(Duration::ZERO);
        let key = CacheKey::news("market");
        cache.put(key.clone(), String::from("value"));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn reports_entry_age() {
        let (cache, clock) = cache(Duration::from_secs(60));
        let key = CacheKey::quote("ITC");
        cache.put(key.clone(), String::from("value"));
        clock.advance(Duration::from_secs(12));

        let (_, age) = cache.get_with_age(&key).expect("fresh");
        assert_eq!(age, Duration::from_secs(12));
    }

    #[test]
    fn keys_are_scoped_by_capability() {
        assert_ne!(CacheKey::quote("TCS"), CacheKey::news("TCS"));
        assert_eq!(CacheKey::quote("TCS").to_string(), "quote:TCS");
    }

    #[test]
    fn cache_modes_control_reads_and_writes() {
        assert!(CacheMode::Use.reads() && CacheMode::Use.writes());
        assert!(!CacheMode::Refresh.reads() && CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.reads() && !CacheMode::Bypass.writes());
    }
}

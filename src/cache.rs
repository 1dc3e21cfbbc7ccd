//! In-process result cache with time-to-live expiry.
//!
//! Expired entries are never removed by `get`; they stay in the map until the
//! next `sweep_expired`. The request pipeline sweeps once before every lookup,
//! so serving one request can evict stale entries belonging to other keys.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AppError;

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Identifies one `/sun` request. `None` marks an absent date bound and can
/// never collide with a real date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    city: String,
    start: Option<String>,
    end: Option<String>,
}

impl CacheKey {
    pub fn city(&self) -> &str {
        &self.city
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}|{}|{}",
            self.city,
            self.start.as_deref().unwrap_or("*"),
            self.end.as_deref().unwrap_or("*")
        )
    }
}

pub fn derive_key(city: &str, start: Option<&str>, end: Option<&str>) -> Result<CacheKey, AppError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::InvalidInput(
            "The `city` parameter is required.".to_string(),
        ));
    }

    Ok(CacheKey {
        city: city.to_string(),
        start: start.map(str::to_string),
        end: end.map(str::to_string),
    })
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// Mutex-guarded map from key to (value, insertion time). Each operation holds
/// the lock for its whole duration and never across an await.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: ttl_duration(ttl_seconds),
            clock,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Returns the value if present and no older than the configured TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| now - entry.inserted_at <= self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Inserts or replaces the entry, resetting its timestamp.
    pub fn put(&self, key: K, value: V) {
        let inserted_at = self.clock.now();
        self.lock().insert(key, CacheEntry { value, inserted_at });
    }

    /// Drops every entry older than `ttl_seconds`. Returns how many were removed.
    pub fn sweep_expired(&self, ttl_seconds: i64) -> usize {
        let ttl = ttl_duration(ttl_seconds);
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        if ttl_seconds <= 0 {
            entries.clear();
        } else {
            entries.retain(|_, entry| now - entry.inserted_at <= ttl);
        }
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Every mutation is a single HashMap call, so a poisoned map is still whole.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// Beyond chrono's range a TTL means "never expires".
fn ttl_duration(seconds: i64) -> Duration {
    Duration::try_seconds(seconds).unwrap_or(Duration::MAX)
}

#[cfg(test)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

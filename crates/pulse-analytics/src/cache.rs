//! Time-bounded memoization for report queries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use pulse_core::{current_unix_timestamp_ms, is_expired_unix_ms};

type ClockFn = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Clone)]
struct CacheEntry {
    value: Value,
    inserted_unix_ms: u64,
    ttl_ms: u64,
}

/// Process-lifetime TTL cache. Values are immutable once inserted; expiry
/// is lazy on access and `clear` empties everything at once. A per-key
/// flight lock guarantees at most one producer runs for a given key even
/// under concurrent callers.
pub struct ReportCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    flights: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    clock: ClockFn,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(current_unix_timestamp_ms))
    }

    /// Builds a cache with an injected clock for deterministic TTL tests.
    pub fn with_clock(clock: ClockFn) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the fresh cached value for `key`, or runs `producer`, stores
    /// its result with a fresh timestamp, and returns it.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl_ms: u64, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.lookup::<T>(key)? {
            return Ok(value);
        }

        let flight = self.flight_lock(key)?;
        let guard = flight.lock().await;
        // A concurrent caller may have produced the value while this task
        // waited on the flight lock.
        if let Some(value) = self.lookup::<T>(key)? {
            drop(guard);
            self.remove_flight(key);
            return Ok(value);
        }

        let produced = async {
            let value = producer().await?;
            let serialized = serde_json::to_value(&value)?;
            let now_unix_ms = (self.clock)();
            self.entries
                .lock()
                .map_err(|_| anyhow!("report cache lock is poisoned"))?
                .insert(
                    key.to_string(),
                    CacheEntry {
                        value: serialized,
                        inserted_unix_ms: now_unix_ms,
                        ttl_ms,
                    },
                );
            Ok(value)
        }
        .await;
        drop(guard);
        // Waiters hold their own handle to the flight lock and re-check the
        // cache after acquiring it, so the map entry can go as soon as the
        // producer settles.
        self.remove_flight(key);
        produced
    }

    /// Drops every entry unconditionally. Used by the manual refresh action.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
        if let Ok(mut flights) = self.flights.lock() {
            flights.clear();
        }
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let now_unix_ms = (self.clock)();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("report cache lock is poisoned"))?;
        match entries.get(key) {
            Some(entry) if !is_expired_unix_ms(entry.inserted_unix_ms, entry.ttl_ms, now_unix_ms) => {
                let value = serde_json::from_value(entry.value.clone())?;
                Ok(Some(value))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn flight_lock(&self, key: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut flights = self
            .flights
            .lock()
            .map_err(|_| anyhow!("report cache flight lock is poisoned"))?;
        Ok(flights
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    fn remove_flight(&self, key: &str) {
        if let Ok(mut flights) = self.flights.lock() {
            flights.remove(key);
        }
    }
}

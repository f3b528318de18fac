use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{Store, StoreError};

/// Writes between two sweeps of expired entries.
const SWEEP_EVERY: u64 = 64;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
/// In-process TTL map.
///
/// Expired entries read as absent and are evicted on access; every
/// `SWEEP_EVERY` writes also drop whatever else has expired. The backend can
/// be switched offline to exercise the unavailable-cache paths.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    online: AtomicBool,
    writes: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            writes: AtomicU64::new(0),
        }
    }

    /// Store a value that never expires (used to preload lookup data).
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.lock().insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    #[cfg(test)]
    fn raw_len(&self) -> usize {
        self.entries.lock().len()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store is offline"))
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.ensure_online()?;
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.ensure_online()?;
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StoreError::backend(format!("ttl out of range: {ttl:?}")))?;
        self.entries.lock().insert(
            key.to_owned(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(expires_at),
            },
        );

        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let purged = self.purge_expired();
            tracing::trace!(purged, "swept expired cache entries");
        }
        Ok(())
    }

    fn available(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

//! Resolution cache: one process-wide table keyed by identifier, persisted
//! as a single JSON blob and reloaded on startup.
//!
//! Entries older than 24h are treated as absent. Disk writes are debounced
//! (~250ms) because a conversation-list render can touch dozens of entries
//! in one burst; losing the trailing write on abrupt termination is fine —
//! the cache is a performance layer, not a source of truth.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const FLUSH_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub name: Option<String>,
    pub address: Option<String>,
    /// Unix millis of the last definitive resolution (success or negative).
    pub timestamp: i64,
}

pub struct ResolutionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    path: Option<PathBuf>,
    flush_scheduled: AtomicBool,
}

impl ResolutionCache {
    /// Cache backed by a JSON blob at `path`; loads whatever is already
    /// there, tolerating a missing or unparsable file.
    pub fn persistent(path: PathBuf) -> Arc<Self> {
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&text) {
                Ok(entries) => {
                    log::info!(
                        "[Resolver] Loaded {} cached resolutions from {}",
                        entries.len(),
                        path.display()
                    );
                    entries
                }
                Err(e) => {
                    log::warn!("[Resolver] Ignoring unparsable cache at {}: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Arc::new(Self {
            entries: Mutex::new(entries),
            path: Some(path),
            flush_scheduled: AtomicBool::new(false),
        })
    }

    /// Cache in the default app data location.
    pub fn persistent_default() -> Arc<Self> {
        Self::persistent(crate::shared::config::app_data_dir().join("name-cache.json"))
    }

    /// Cache that never touches disk.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            path: None,
            flush_scheduled: AtomicBool::new(false),
        })
    }

    /// Entry for `identifier` if present and within TTL.
    pub fn fresh(&self, identifier: &str) -> Option<CacheEntry> {
        let entries = lock(&self.entries);
        let entry = entries.get(identifier)?;
        if now_millis().saturating_sub(entry.timestamp) < CACHE_TTL.as_millis() as i64 {
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Record a definitive resolution (including negatives) with a fresh
    /// stamp, and schedule a debounced write-back.
    pub fn store(self: &Arc<Self>, identifier: &str, name: Option<String>, address: Option<String>) {
        self.store_with_timestamp(identifier, name, address, now_millis());
        self.schedule_flush();
    }

    pub(crate) fn store_with_timestamp(
        &self,
        identifier: &str,
        name: Option<String>,
        address: Option<String>,
        timestamp: i64,
    ) {
        lock(&self.entries).insert(
            identifier.to_string(),
            CacheEntry {
                name,
                address,
                timestamp,
            },
        );
    }

    /// Drop one entry, or everything, and persist the cleared state
    /// immediately so re-renders after a name change see it.
    pub fn clear(&self, identifier: Option<&str>) {
        {
            let mut entries = lock(&self.entries);
            match identifier {
                Some(id) => {
                    entries.remove(id);
                }
                None => entries.clear(),
            }
        }
        if let Err(e) = self.flush() {
            log::warn!("[Resolver] Failed to persist cleared cache: {e}");
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn schedule_flush(self: &Arc<Self>) {
        if self.path.is_none() {
            return;
        }
        if self.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let cache = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(FLUSH_DEBOUNCE).await;
            cache.flush_scheduled.store(false, Ordering::SeqCst);
            if let Err(e) = cache.flush() {
                log::warn!("[Resolver] Cache write-back failed: {e}");
            }
        });
    }

    pub(crate) fn flush(&self) -> Result<(), String> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = {
            let entries = lock(&self.entries);
            serde_json::to_string_pretty(&*entries)
                .map_err(|e| format!("failed encoding cache: {e}"))?
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed creating cache dir ({}): {e}", parent.display()))?;
        }
        std::fs::write(path, json)
            .map_err(|e| format!("failed writing cache ({}): {e}", path.display()))
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn lock<'a>(
    entries: &'a Mutex<HashMap<String, CacheEntry>>,
) -> MutexGuard<'a, HashMap<String, CacheEntry>> {
    match entries.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

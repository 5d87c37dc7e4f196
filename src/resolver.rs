//! Identity resolution: inbox id → wallet address → registered name.
//!
//! The resolver is the one shared path every UI surface goes through to put
//! a human name on a conversation peer. It is built to be called from many
//! places at once for the same peer without amplifying network traffic:
//! a fresh cache hit returns synchronously, a miss runs the two-stage
//! pipeline (directory service, then registry) coalesced per identifier,
//! with a second coalescing layer per address for identifiers that share a
//! wallet. Every failure degrades to "no name" — a name is never required
//! for correctness, only for display.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::shared::address::{abbreviate, normalize_address};

mod cache;
mod inflight;

pub use cache::{CacheEntry, ResolutionCache, CACHE_TTL};
use inflight::InflightTable;

type NameAndAddress = (Option<String>, Option<String>);

// ---------------------------------------------------------------------------
// External capabilities
// ---------------------------------------------------------------------------

/// Directory lookup on the messaging network: inbox id → wallet address.
///
/// Set once per session via [`IdentityResolver::set_directory`]; until then
/// non-address identifiers resolve to "unresolved" without erroring.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn resolve_identifier_to_address(
        &self,
        identifier: &str,
    ) -> Result<Option<String>, String>;
}

/// Address → registered name. Implemented by [`crate::RegistryClient`];
/// a seam so resolution can be exercised without a chain.
#[async_trait]
pub trait NameService: Send + Sync {
    async fn name_by_address(&self, address: &str) -> Option<String>;
}

#[async_trait]
impl NameService for crate::registry::RegistryClient {
    async fn name_by_address(&self, address: &str) -> Option<String> {
        self.get_name_by_address(address).await
    }
}

// ---------------------------------------------------------------------------
// Resolution result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identifier: String,
    pub name: Option<String>,
    pub address: Option<String>,
    /// True when the result came straight from the cache (no network).
    pub from_cache: bool,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            identifier: String::new(),
            name: None,
            address: None,
            from_cache: false,
        }
    }

    /// Best display string, in priority order: registered name, abbreviated
    /// address, abbreviated identifier, "Unknown".
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(address) = &self.address {
            return abbreviate(address);
        }
        if !self.identifier.is_empty() {
            return abbreviate(&self.identifier);
        }
        "Unknown".to_string()
    }
}

// ---------------------------------------------------------------------------
// IdentityResolver
// ---------------------------------------------------------------------------

pub struct IdentityResolver {
    cache: Arc<ResolutionCache>,
    names: Arc<dyn NameService>,
    directory: Mutex<Option<Arc<dyn DirectoryService>>>,
    /// Whole-pipeline coalescing: one directory-and-registry run per
    /// identifier, shared by every concurrent call site.
    inflight_resolutions: Arc<InflightTable<NameAndAddress>>,
    /// Registry-stage coalescing keyed by address, for distinct identifiers
    /// that map to the same wallet.
    inflight_names: Arc<InflightTable<Option<String>>>,
}

impl IdentityResolver {
    pub fn new(cache: Arc<ResolutionCache>, names: Arc<dyn NameService>) -> Self {
        Self {
            cache,
            names,
            directory: Mutex::new(None),
            inflight_resolutions: Arc::new(InflightTable::new()),
            inflight_names: Arc::new(InflightTable::new()),
        }
    }

    /// Install the session's directory service. Called once after the
    /// messaging client connects.
    pub fn set_directory(&self, directory: Arc<dyn DirectoryService>) {
        *lock_directory(&self.directory) = Some(directory);
    }

    /// Resolve one identifier to its best-known name/address pair.
    pub async fn resolve(&self, identifier: &str) -> Resolution {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Resolution::empty();
        }

        if let Some(entry) = self.cache.fresh(identifier) {
            return Resolution {
                identifier: identifier.to_string(),
                name: entry.name,
                address: entry.address,
                from_cache: true,
            };
        }

        let (name, address) = self.resolve_coalesced(identifier).await;
        Resolution {
            identifier: identifier.to_string(),
            name,
            address,
            from_cache: false,
        }
    }

    /// Resolve a batch (the conversation list), reusing fresh cache entries
    /// and the shared in-flight tables. The returned map covers every
    /// requested identifier.
    pub async fn resolve_all(
        &self,
        identifiers: &[String],
    ) -> std::collections::HashMap<String, Option<String>> {
        let mut results = std::collections::HashMap::new();
        let mut to_resolve = Vec::new();
        for id in identifiers {
            if let Some(entry) = self.cache.fresh(id) {
                results.insert(id.clone(), entry.name);
            } else {
                to_resolve.push(id.clone());
            }
        }

        let resolved =
            futures::future::join_all(to_resolve.iter().map(|id| self.resolve(id))).await;
        for resolution in resolved {
            results.insert(resolution.identifier.clone(), resolution.name);
        }
        results
    }

    /// Batch display names with the per-item fallback chain applied.
    pub async fn display_names(
        &self,
        identifiers: &[String],
    ) -> std::collections::HashMap<String, String> {
        let names = self.resolve_all(identifiers).await;
        identifiers
            .iter()
            .map(|id| {
                let display = match names.get(id).cloned().flatten() {
                    Some(name) => name,
                    None => match self.cache.fresh(id).and_then(|e| e.address) {
                        Some(address) => abbreviate(&address),
                        None => abbreviate(id),
                    },
                };
                (id.clone(), display)
            })
            .collect()
    }

    /// Invalidate one identifier or the whole cache. Used after the user
    /// registers or updates their own name, which the TTL would otherwise
    /// mask for up to a day.
    pub fn clear_cache(&self, identifier: Option<&str>) {
        self.cache.clear(identifier);
    }

    /// One shared pipeline run per identifier: concurrent call sites for
    /// the same identifier observe a single directory lookup.
    async fn resolve_coalesced(&self, identifier: &str) -> NameAndAddress {
        let shared = self.inflight_resolutions.join_or_insert(identifier, || {
            let cache = self.cache.clone();
            let names = self.names.clone();
            let directory = lock_directory(&self.directory).clone();
            let resolutions = self.inflight_resolutions.clone();
            let name_lookups = self.inflight_names.clone();
            let identifier = identifier.to_string();
            Box::pin(async move {
                let result =
                    run_pipeline(&cache, names, directory, &name_lookups, &identifier).await;
                // The slot clears itself so completion removes it even when
                // every original caller has been dropped mid-await.
                resolutions.clear(&identifier);
                result
            })
        });
        shared.await
    }
}

/// The uncached pipeline: identifier → address → name, caching the outcome
/// (negatives included) with a fresh stamp.
async fn run_pipeline(
    cache: &Arc<ResolutionCache>,
    names: Arc<dyn NameService>,
    directory: Option<Arc<dyn DirectoryService>>,
    name_lookups: &Arc<InflightTable<Option<String>>>,
    identifier: &str,
) -> NameAndAddress {
    let Some(address) = resolve_identifier_to_address(directory, identifier).await else {
        // Definitive negative: cache it so the list view doesn't retry
        // this identifier on every render within the TTL.
        cache.store(identifier, None, None);
        return (None, None);
    };

    let name = lookup_name_coalesced(name_lookups, names, &address).await;
    cache.store(identifier, name.clone(), Some(address.clone()));
    (name, Some(address))
}

async fn resolve_identifier_to_address(
    directory: Option<Arc<dyn DirectoryService>>,
    identifier: &str,
) -> Option<String> {
    // Address-shaped identifiers skip the directory entirely.
    if let Some(address) = normalize_address(identifier) {
        return Some(address);
    }

    let Some(directory) = directory else {
        log::warn!("[Resolver] Directory service not set; cannot resolve {identifier}");
        return None;
    };

    match directory.resolve_identifier_to_address(identifier).await {
        Ok(Some(address)) => normalize_address(&address),
        Ok(None) => None,
        Err(e) => {
            log::warn!("[Resolver] Directory lookup failed for {identifier}: {e}");
            None
        }
    }
}

async fn lookup_name_coalesced(
    table: &Arc<InflightTable<Option<String>>>,
    names: Arc<dyn NameService>,
    address: &str,
) -> Option<String> {
    let shared = table.join_or_insert(address, || {
        let table = table.clone();
        let address = address.to_string();
        Box::pin(async move {
            let name = names.name_by_address(&address).await;
            table.clear(&address);
            name
        })
    });
    shared.await
}

fn lock_directory(
    directory: &Mutex<Option<Arc<dyn DirectoryService>>>,
) -> std::sync::MutexGuard<'_, Option<Arc<dyn DirectoryService>>> {
    match directory.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

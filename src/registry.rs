//! Read/validate client for the PrimeChat name-registry contract.
//!
//! Read failures never surface to callers as errors: lookups degrade to
//! `None`/`false`, and `is_name_taken` fails closed (treats errors as
//! "taken") so an RPC outage cannot cause a duplicate registration attempt.
//! Write calls go through the user's wallet; this module only builds their
//! calldata.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::shared::address::{normalize_address, ZERO_ADDRESS};
use crate::shared::config::{registry_rpc_urls, NAME_REGISTRY_ADDRESS};
use crate::shared::rpc::RpcClient;

mod abi;

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 32;

/// Names that can never be registered, matched case-insensitively.
const RESERVED_NAMES: &[&str] = &[
    "admin", "prime", "primechat", "support", "moderator", "bot", "system", "owner", "nft",
    "token", "vault", "bridge", "official", "verified", "community",
];

// ---------------------------------------------------------------------------
// Pure validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValidation {
    pub valid: bool,
    pub error: Option<&'static str>,
}

impl NameValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn fail(error: &'static str) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

/// Format check only: 3-32 chars, `[a-zA-Z0-9_]`. Reservation and on-chain
/// availability are separate checks.
pub fn validate_name_format(name: &str) -> NameValidation {
    if name.chars().count() < MIN_NAME_LEN {
        return NameValidation::fail("Name must be at least 3 characters");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return NameValidation::fail("Name must be 32 characters or less");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return NameValidation::fail("Only letters, numbers, and underscores allowed");
    }
    NameValidation::ok()
}

pub fn is_reserved_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    RESERVED_NAMES.iter().any(|r| *r == lowered)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAvailability {
    pub available: bool,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// RegistryClient
// ---------------------------------------------------------------------------

pub struct RegistryClient {
    rpc: RpcClient,
    contract: String,
    // Point-lookup memo for direct callers (profile views); the resolver has
    // its own TTL cache and does not go through this.
    memo: Mutex<HashMap<String, Option<String>>>,
}

impl RegistryClient {
    /// Client against the Base mainnet registry with the default RPC list.
    pub fn new() -> Self {
        Self::with_endpoints(NAME_REGISTRY_ADDRESS, registry_rpc_urls())
    }

    pub fn with_endpoints(contract: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            rpc: RpcClient::new(urls),
            contract: contract.into(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Registered name for an address, or `None` when unregistered or the
    /// read fails. The contract returns an empty string for unknown
    /// addresses; that is `None` here, never `""`.
    pub async fn get_name_by_address(&self, address: &str) -> Option<String> {
        let Some(address) = normalize_address(address) else {
            log::warn!("[Registry] getNameByAddress skipped; not an address: {address}");
            return None;
        };
        let data = match abi::encode_address_call("getNameByAddress(address)", &address) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("[Registry] getNameByAddress encode failed: {e}");
                return None;
            }
        };
        match self.call(&data).await.and_then(|r| abi::decode_string(&r)) {
            Ok(name) => name_or_none(name),
            Err(e) => {
                log::warn!("[Registry] getNameByAddress failed for {address}: {e}");
                None
            }
        }
    }

    /// Whether an address has a registered name; `false` on any failure.
    pub async fn has_name(&self, address: &str) -> bool {
        let Some(address) = normalize_address(address) else {
            return false;
        };
        let data = match abi::encode_address_call("hasName(address)", &address) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("[Registry] hasName encode failed: {e}");
                return false;
            }
        };
        match self.call(&data).await.and_then(|r| abi::decode_bool(&r)) {
            Ok(has) => has,
            Err(e) => {
                log::warn!("[Registry] hasName failed for {address}: {e}");
                false
            }
        }
    }

    /// Whether a name is already registered. Fails closed: any error reads
    /// as "taken" so registration is blocked under uncertain RPC conditions.
    pub async fn is_name_taken(&self, name: &str) -> bool {
        let data = abi::encode_string_call("isNameTaken(string)", name);
        match self.call(&data).await.and_then(|r| abi::decode_bool(&r)) {
            Ok(taken) => taken,
            Err(e) => {
                log::warn!("[Registry] isNameTaken failed for {name}; treating as taken: {e}");
                true
            }
        }
    }

    /// Address owning a name, or `None` on the zero-address sentinel or any
    /// failure.
    pub async fn get_address_by_name(&self, name: &str) -> Option<String> {
        let data = abi::encode_string_call("getAddressByName(string)", name);
        match self.call(&data).await.and_then(|r| abi::decode_address(&r)) {
            Ok(address) => address_or_none(address),
            Err(e) => {
                log::warn!("[Registry] getAddressByName failed for {name}: {e}");
                None
            }
        }
    }

    /// `get_name_by_address` with a process-lifetime memo. Negative results
    /// are memoized too.
    pub async fn lookup_name(&self, address: &str) -> Option<String> {
        let key = normalize_address(address)?;
        if let Some(cached) = lock_memo(&self.memo).get(&key).cloned() {
            return cached;
        }
        let name = self.get_name_by_address(&key).await;
        lock_memo(&self.memo).insert(key, name.clone());
        name
    }

    /// Full availability check in registration order: format, reservation,
    /// then the on-chain taken check. First failure wins.
    pub async fn check_name_availability(&self, name: &str) -> NameAvailability {
        let format = validate_name_format(name);
        if !format.valid {
            return NameAvailability {
                available: false,
                error: format.error.map(str::to_string),
            };
        }
        if is_reserved_name(name) {
            return NameAvailability {
                available: false,
                error: Some("This name is reserved".to_string()),
            };
        }
        if self.is_name_taken(name).await {
            return NameAvailability {
                available: false,
                error: Some("Name already taken".to_string()),
            };
        }
        NameAvailability {
            available: true,
            error: None,
        }
    }

    async fn call(&self, data: &str) -> Result<String, String> {
        self.rpc.eth_call(&self.contract, data).await
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Write calldata builders (submission happens in the wallet layer)
// ---------------------------------------------------------------------------

/// Names register lower-cased; display casing is not stored on-chain.
pub fn register_name_calldata(name: &str) -> String {
    abi::encode_string_call("registerName(string)", &name.to_lowercase())
}

pub fn update_name_calldata(new_name: &str) -> String {
    abi::encode_string_call("updateName(string)", &new_name.to_lowercase())
}

pub fn unregister_name_calldata() -> String {
    abi::encode_no_arg_call("unregisterName()")
}

// ---------------------------------------------------------------------------

fn name_or_none(name: String) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn address_or_none(address: String) -> Option<String> {
    if address == ZERO_ADDRESS {
        None
    } else {
        Some(address)
    }
}

fn lock_memo(
    memo: &Mutex<HashMap<String, Option<String>>>,
) -> std::sync::MutexGuard<'_, HashMap<String, Option<String>>> {
    match memo.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests;

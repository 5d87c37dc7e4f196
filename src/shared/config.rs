use std::env;

/// PrimeChat name registry contract on Base mainnet.
pub const NAME_REGISTRY_ADDRESS: &str = "0x962743EAe1Bbd8C9715102DB10F129f1AF47670A";

/// Public RPCs (fallback order). Unauthenticated endpoints; any single one
/// may rate limit.
pub const BASE_RPCS: &[&str] = &[
    "https://mainnet.base.org",
    "https://base-rpc.publicnode.com",
    "https://base.llamarpc.com",
];

pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Registry RPC endpoints: `PRIMECHAT_RPC_URLS` (comma-separated) wins over
/// the compiled-in Base mainnet list.
pub fn registry_rpc_urls() -> Vec<String> {
    match non_empty_env("PRIMECHAT_RPC_URLS") {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => BASE_RPCS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Local data directory for persisted caches and session state.
pub fn app_data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("primechat")
}

//! Plumbing shared across the crate: address helpers, env config, JSON-RPC.

pub mod address;
pub mod config;
pub mod rpc;

//! PrimeChat client core — identity resolution over an encrypted messaging
//! network plus the on-chain name registry that gives peers human names.
//!
//! Three subsystems:
//! - `registry` — read/validate against the PrimeChat name-registry contract
//!   (Base mainnet) over plain JSON-RPC with endpoint failover.
//! - `resolver` — inbox id → wallet address → registered name, with a
//!   persisted 24h cache and per-address request coalescing.
//! - `session` — conversation list, consent classification, unread counts,
//!   and optimistic send reconciliation on top of an opaque messaging service.
//!
//! The messaging network itself (conversation transport, encryption) and the
//! wallet are external: consumers hand in implementations of
//! [`resolver::DirectoryService`] and [`session::MessagingService`].

pub mod registry;
pub mod resolver;
pub mod session;
pub mod shared;

pub use registry::RegistryClient;
pub use resolver::{DirectoryService, IdentityResolver, Resolution, ResolutionCache};
pub use session::{ConsentState, MessagingService, SessionState};

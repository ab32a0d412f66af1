// === PUBLIC CONTRACT ===
// Consumers should depend on the contract module only.
pub mod contract;

pub use contract::{client, error, model};

// === MODULE WIRING ===
pub mod config;
pub mod module;
pub use config::SessionSyncConfig;
pub use module::SessionSync;

// === INTERNAL MODULES ===
// Exposed for tests and for wiring alternative adapters; not a stable API.
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;

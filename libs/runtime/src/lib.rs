//! Shared runtime plumbing: layered configuration, logging, traced HTTP and
//! process shutdown signals.

pub mod config;
pub mod http;
pub mod logging;
pub mod paths;
pub mod shutdown;

pub use config::{AppConfig, CliArgs, ConsoleConfig, LoggingConfig, Section};
pub use http::TracedClient;

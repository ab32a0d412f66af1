//! Fire-and-wait trigger for automation workflows exposed as HTTP webhooks.
//!
//! A trigger POSTs a JSON payload to `<base_url>/<workflow>` and hands the
//! response body back to the caller.

pub mod config;
pub mod error;
mod trigger;

pub use config::WorkflowWebhookConfig;
pub use error::WebhookError;
pub use trigger::WorkflowWebhook;

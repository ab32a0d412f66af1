use serde::{Deserialize, Serialize};

/// Configuration for the workflow_webhook module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowWebhookConfig {
    /// Webhook root, e.g. `https://automation.example.com/webhook`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout; unset leaves it to the transport.
    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

impl WorkflowWebhookConfig {
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

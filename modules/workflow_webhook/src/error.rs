use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Workflow webhook URL not configured")]
    NotConfigured,

    #[error("Invalid workflow name '{name}'")]
    InvalidWorkflow { name: String },

    #[error("Invalid webhook base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Payload could not be encoded: {message}")]
    Payload { message: String },

    #[error("Webhook request failed: {message}")]
    Transport { message: String },

    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl WebhookError {
    pub fn invalid_workflow(name: impl Into<String>) -> Self {
        Self::InvalidWorkflow { name: name.into() }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

use std::time::Duration;

use runtime::TracedClient;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::WorkflowWebhookConfig;
use crate::error::WebhookError;

/// Longest response excerpt carried in a [`WebhookError::Status`].
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Clone)]
pub struct WorkflowWebhook {
    http: TracedClient,
    base_url: Option<Url>,
}

impl WorkflowWebhook {
    /// `base_url = None` yields a trigger whose every call fails with
    /// [`WebhookError::NotConfigured`].
    pub fn new(http: TracedClient, base_url: Option<Url>) -> Self {
        if base_url.is_none() {
            warn!("workflow webhook base URL is not configured; triggers will fail");
        }
        Self { http, base_url }
    }

    pub fn from_config(cfg: &WorkflowWebhookConfig) -> Result<Self, WebhookError> {
        let base_url = cfg.base_url().map(parse_base_url).transpose()?;
        let http = match cfg.timeout_sec {
            Some(secs) => TracedClient::with_timeout(Duration::from_secs(secs))
                .map_err(|e| WebhookError::transport(&e))?,
            None => TracedClient::default(),
        };
        Ok(Self::new(http, base_url))
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// POST `payload` as JSON to `<base_url>/<workflow>` and return the
    /// response body: parsed JSON, plain text as a JSON string, empty as null.
    #[instrument(name = "workflow_webhook.trigger", skip_all, fields(workflow = %workflow))]
    pub async fn trigger<P>(&self, workflow: &str, payload: &P) -> Result<Value, WebhookError>
    where
        P: Serialize + ?Sized,
    {
        let base = self.base_url.as_ref().ok_or(WebhookError::NotConfigured)?;
        let url = workflow_url(base, workflow)?;
        let body = serde_json::to_value(payload).map_err(|e| WebhookError::Payload {
            message: e.to_string(),
        })?;

        let request = self
            .http
            .request(reqwest::Method::POST, url.as_str())
            .json(&body);
        let response = self.http.send(request).await.map_err(|e| {
            error!(error = %e, "Error triggering workflow");
            WebhookError::transport(&e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(error = %e, "Error reading workflow response");
            WebhookError::transport(&e)
        })?;

        if !status.is_success() {
            error!(status = %status, "Error triggering workflow");
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        debug!(status = %status, bytes = text.len(), "workflow triggered");
        Ok(decode_body(&text))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, WebhookError> {
    let url = Url::parse(raw).map_err(|e| WebhookError::InvalidBaseUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(WebhookError::InvalidBaseUrl {
            url: raw.to_string(),
            message: "expected an http(s) URL".to_string(),
        });
    }
    Ok(url)
}

fn workflow_url(base: &Url, workflow: &str) -> Result<Url, WebhookError> {
    let name = workflow.trim();
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(WebhookError::invalid_workflow(workflow));
    }
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| WebhookError::InvalidBaseUrl {
            url: base.to_string(),
            message: "cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

use anyhow::{anyhow, bail, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use url::Url;

/// Length plus digest; response bodies may echo tokens or emails.
pub(super) fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// `base` with `segments` appended as path segments.
pub(super) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("invalid Supabase base URL: {base}"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into an error carrying the status and a body digest.
pub(super) async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body_summary = summarize_response_body(&body);
    tracing::error!(status = %status, body_summary = %body_summary, "{what} failed");
    bail!("{what} failed: HTTP {status} ({body_summary})")
}

//! Traced HTTP client.
//!
//! Wraps `reqwest::Client` so every outgoing request runs inside an
//! `outgoing_http` span and carries a W3C `traceparent` header.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{field, Instrument, Level};

/// W3C Trace Context header name
pub const TRACEPARENT: &str = "traceparent";

/// Insert a freshly generated, sampled `traceparent` header.
fn inject_trace_context(headers: &mut HeaderMap) {
    let trace_id = format!("{:032x}", rand::random::<u128>());
    let span_id = format!("{:016x}", rand::random::<u64>());
    let traceparent = format!("00-{trace_id}-{span_id}-01");

    if let Ok(value) = HeaderValue::from_str(&traceparent) {
        headers.insert(HeaderName::from_static(TRACEPARENT), value);
    }
}

#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Build a client whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map(Self::new)
    }

    /// Execute a built request inside an `outgoing_http` span.
    pub async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO,
            "outgoing_http",
            http.method = %req.method(),
            http.url = %req.url(),
            http.status_code = field::Empty,
            error = field::Empty,
            otel.kind = "client",
        );

        inject_trace_context(req.headers_mut());

        let inner = self.inner.clone();
        let record_span = span.clone();
        async move {
            let response = inner.execute(req).await?;
            let status = response.status();
            record_span.record("http.status_code", status.as_u16());
            if status.is_client_error() || status.is_server_error() {
                record_span.record("error", true);
            }
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Build and execute a request prepared with [`TracedClient::request`].
    pub async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> reqwest::Result<reqwest::Response> {
        self.execute(builder.build()?).await
    }

    /// Start a request builder; finish it with [`TracedClient::send`].
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn traceparent_has_w3c_shape() {
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);
        let value = headers.get(TRACEPARENT).unwrap().to_str().unwrap();
        let parts: Vec<&str> = value.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "00");
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), 16);
        assert_eq!(parts[3], "01");
    }

    #[tokio::test]
    async fn injects_trace_headers() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/ping").header_exists("traceparent");
            then.status(200).body("ok");
        });

        let client = TracedClient::from(reqwest::Client::new());
        let url = format!("{}/ping", server.base_url());
        let resp = client
            .send(client.request(reqwest::Method::GET, &url))
            .await
            .unwrap();

        assert!(resp.status().is_success());
        m.assert();
    }

    #[tokio::test]
    async fn send_keeps_builder_headers_and_body() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/echo")
                .header("apikey", "k")
                .header_exists("traceparent")
                .json_body(serde_json::json!({ "a": 1 }));
            then.status(201);
        });

        let client = TracedClient::default();
        let builder = client
            .request(reqwest::Method::POST, &format!("{}/echo", server.base_url()))
            .header("apikey", "k")
            .json(&serde_json::json!({ "a": 1 }));
        let resp = client.send(builder).await.unwrap();

        assert_eq!(resp.status().as_u16(), 201);
        m.assert();
    }
}

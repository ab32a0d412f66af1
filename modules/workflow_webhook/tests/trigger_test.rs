use httpmock::prelude::*;
use runtime::TracedClient;
use serde_json::json;
use tracing_test::traced_test;
use url::Url;

use workflow_webhook::{WebhookError, WorkflowWebhook, WorkflowWebhookConfig};

fn webhook(server: &MockServer) -> WorkflowWebhook {
    let base = Url::parse(&server.url("/webhook")).unwrap();
    WorkflowWebhook::new(TracedClient::default(), Some(base))
}

#[tokio::test]
async fn posts_payload_and_returns_json_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook/lead-enrichment")
            .header("content-type", "application/json")
            .header_exists("traceparent")
            .json_body(json!({ "company": "Acme", "limit": 25 }));
        then.status(200).json_body(json!({ "executionId": "42", "queued": true }));
    });

    let result = webhook(&server)
        .trigger("lead-enrichment", &json!({ "company": "Acme", "limit": 25 }))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(result, json!({ "executionId": "42", "queued": true }));
}

#[tokio::test]
async fn accepts_any_serializable_payload() {
    #[derive(serde::Serialize)]
    struct ScrapeRequest<'a> {
        url: &'a str,
        depth: u8,
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/webhook/scrape")
            .json_body(json!({ "url": "https://acme.test", "depth": 2 }));
        then.status(200).body("Workflow was started");
    });

    let result = webhook(&server)
        .trigger(
            "scrape",
            &ScrapeRequest {
                url: "https://acme.test",
                depth: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(result, json!("Workflow was started"));
}

#[tokio::test]
async fn empty_response_is_null() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/webhook/ping");
        then.status(204);
    });

    let result = webhook(&server).trigger("ping", &json!({})).await.unwrap();
    assert!(result.is_null());
}

#[traced_test]
#[tokio::test]
async fn error_status_is_logged_and_returned() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/webhook/broken");
        then.status(500)
            .json_body(json!({ "message": "Workflow could not be started" }));
    });

    let err = webhook(&server)
        .trigger("broken", &json!({}))
        .await
        .unwrap_err();

    match err {
        WebhookError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("could not be started"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(logs_contain("Error triggering workflow"));
    assert!(logs_contain("workflow_webhook.trigger"));
}

#[traced_test]
#[tokio::test]
async fn transport_failure_is_logged_and_returned() {
    // Nothing listens on the discard port.
    let base = Url::parse("http://127.0.0.1:9/webhook").unwrap();
    let webhook = WorkflowWebhook::new(TracedClient::default(), Some(base));

    let err = webhook.trigger("sync", &json!({})).await.unwrap_err();
    assert!(matches!(err, WebhookError::Transport { .. }));
    assert!(logs_contain("Error triggering workflow"));
}

#[traced_test]
#[tokio::test]
async fn missing_base_url_warns_once_and_fails_fast() {
    let webhook = WorkflowWebhook::from_config(&WorkflowWebhookConfig::default()).unwrap();
    assert!(!webhook.is_configured());
    assert!(logs_contain("base URL is not configured"));

    for _ in 0..2 {
        let err = webhook.trigger("sync", &json!({})).await.unwrap_err();
        assert!(matches!(err, WebhookError::NotConfigured));
        assert_eq!(err.to_string(), "Workflow webhook URL not configured");
    }
}

#[tokio::test]
async fn invalid_workflow_makes_no_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });

    let err = webhook(&server)
        .trigger("../admin", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::InvalidWorkflow { .. }));
    mock.assert_hits(0);
}

#[test]
fn invalid_base_url_is_rejected_at_construction() {
    let cfg = WorkflowWebhookConfig {
        base_url: Some("hooks.local/webhook".into()),
        timeout_sec: Some(5),
    };
    assert!(matches!(
        WorkflowWebhook::from_config(&cfg),
        Err(WebhookError::InvalidBaseUrl { .. })
    ));
}

//! End-to-end audits against a mock OpenAI-compatible endpoint.
//!
//! The client is blocking, so every audit runs inside `spawn_blocking`
//! while the mock server lives on the async runtime.

mod common;

use std::collections::HashSet;

use common::{ad_item, completion_response, decision_reply, phone_item, test_config};
use content_audit::{
    AuditManager, AuditText, BatchErrorPolicy, ErrorKind, LlmAdapter, OpenAiClient, TextLoader,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Run `f` on the blocking pool and wait for it.
async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

async fn mount_reply(server: &MockServer, rubric_name: &str, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(format!("# Audit item: {rubric_name}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_response(reply)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_audit_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "temperature": 0.0,
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_response(
            &decision_reply("有", "文本包含 13800138000"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (result, text_id, item_id) = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"));

        let text = AuditText::new("Call me at 13800138000");
        let item = phone_item();
        let result = manager.audit_one(&text, &item).expect("audit");
        (result, text.id(), item.id())
    })
    .await;

    assert_eq!(result.decision.choice, "有");
    assert!(result.decision.reason.contains("13800138000"));
    assert_eq!(result.text_id, text_id);
    assert_eq!(result.item_id, item_id);
    assert_eq!(result.item_name, "Phone number");
    assert_eq!(result.text_excerpt, "Call me at 13800138000");
    assert!(result.batch_id.is_none());
    assert_eq!(result.token_usage.input_tokens, 120);
    assert_eq!(result.token_usage.output_tokens, 18);
}

#[tokio::test]
async fn test_batch_is_cartesian_product_in_order() {
    let server = MockServer::start().await;
    mount_reply(&server, "Phone number", &decision_reply("无", "no digits")).await;
    mount_reply(&server, "Advertising", &decision_reply("not_ad", "plain text")).await;

    let uri = server.uri();
    let (results, text_ids, item_ids) = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"));

        let texts = vec![AuditText::new("first"), AuditText::new("second")];
        let items = vec![phone_item(), ad_item()];
        let results = manager.audit_batch(&texts, &items).expect("batch");
        (
            results,
            texts.iter().map(AuditText::id).collect::<Vec<_>>(),
            items.iter().map(|i| i.id()).collect::<Vec<_>>(),
        )
    })
    .await;

    assert_eq!(results.len(), 4);

    let pairs: Vec<_> = results.iter().map(|r| (r.text_id, r.item_id)).collect();
    assert_eq!(
        pairs,
        vec![
            (text_ids[0], item_ids[0]),
            (text_ids[0], item_ids[1]),
            (text_ids[1], item_ids[0]),
            (text_ids[1], item_ids[1]),
        ]
    );

    let choices: Vec<_> = results.iter().map(|r| r.decision.choice.as_str()).collect();
    assert_eq!(choices, vec!["无", "not_ad", "无", "not_ad"]);

    let batch_ids: HashSet<_> = results.iter().map(|r| r.batch_id).collect();
    assert_eq!(batch_ids.len(), 1);
    assert!(results[0].batch_id.is_some());

    let result_ids: HashSet<_> = results.iter().map(|r| r.id).collect();
    assert_eq!(result_ids.len(), 4);
}

#[tokio::test]
async fn test_choice_outside_options_is_schema_error() {
    let server = MockServer::start().await;
    mount_reply(&server, "Phone number", &decision_reply("maybe", "unsure")).await;

    let uri = server.uri();
    let err = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"));
        manager
            .audit_one(&AuditText::new("hello"), &phone_item())
            .expect_err("choice outside options")
    })
    .await;

    assert_eq!(err.kind(), ErrorKind::Schema);
    let message = err.to_string();
    assert!(message.contains("maybe"), "unexpected message: {message}");
    assert!(message.contains("Phone number"), "unexpected message: {message}");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let err = blocking(|| {
        // Nothing listens on port 1
        let config = test_config("http://127.0.0.1:1");
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"));
        manager
            .audit_one(&AuditText::new("hello"), &phone_item())
            .expect_err("connection refused")
    })
    .await;

    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_api_error_carries_status_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"message": "upstream overloaded", "type": "server_error"}
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"));
        manager
            .audit_one(&AuditText::new("hello"), &phone_item())
            .expect_err("server error")
    })
    .await;

    assert_eq!(err.kind(), ErrorKind::Transport);
    let message = err.to_string();
    assert!(message.contains("500"), "unexpected message: {message}");
    assert!(message.contains("upstream overloaded"), "unexpected message: {message}");
}

#[tokio::test]
async fn test_batch_aborts_on_first_failure() {
    let server = MockServer::start().await;
    mount_reply(&server, "Phone number", &decision_reply("无", "none")).await;
    mount_reply(&server, "Advertising", "not json at all").await;

    let uri = server.uri();
    let err = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"));
        manager
            .audit_batch(&[AuditText::new("hello")], &[phone_item(), ad_item()])
            .expect_err("second pair fails")
    })
    .await;

    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_batch_continue_on_error_records_failed_pairs() {
    let server = MockServer::start().await;
    mount_reply(&server, "Phone number", &decision_reply("无", "none")).await;
    mount_reply(&server, "Advertising", "not json at all").await;

    let uri = server.uri();
    let results = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"))
                .on_error(BatchErrorPolicy::ContinueOnError);
        manager
            .audit_batch(&[AuditText::new("hello")], &[phone_item(), ad_item()])
            .expect("batch")
    })
    .await;

    assert_eq!(results.len(), 2);
    assert!(!results[0].is_error());
    assert!(results[1].is_error());
    assert_eq!(results[1].decision.choice, content_audit::model::ERROR_CHOICE);
    assert_eq!(results[1].annotations["error_kind"], "parse");
    assert_eq!(results[0].batch_id, results[1].batch_id);
}

#[tokio::test]
async fn test_fenced_reply_without_json_mode() {
    let server = MockServer::start().await;
    mount_reply(
        &server,
        "Advertising",
        "Here is my answer:\n```json\n{\"choice\": \"ad\", \"reason\": \"coupon\"}\n```",
    )
    .await;

    let uri = server.uri();
    let result = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let adapter = LlmAdapter::new(&client, config.model.as_str())
            .expect("adapter")
            .json_mode(false);
        AuditManager::new(adapter)
            .audit_one(&AuditText::new("Buy one get one free!"), &ad_item())
            .expect("audit")
    })
    .await;

    assert_eq!(result.decision.choice, "ad");
    assert_eq!(result.decision.reason, "coupon");

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = requests[0].body_json().expect("json body");
    assert!(body.get("response_format").is_none());
}

#[tokio::test]
async fn test_empty_content_is_audited() {
    let server = MockServer::start().await;
    mount_reply(&server, "Advertising", &decision_reply("uncertain", "nothing to judge")).await;

    let uri = server.uri();
    let result = blocking(move || {
        let config = test_config(&uri);
        let client = OpenAiClient::new(&config).expect("client");
        let manager =
            AuditManager::new(LlmAdapter::new(&client, config.model.as_str()).expect("adapter"));
        let text = TextLoader::create("", None, None);
        manager.audit_one(&text, &ad_item()).expect("audit")
    })
    .await;

    assert_eq!(result.decision.choice, "uncertain");
    assert_eq!(result.text_excerpt, "");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
}

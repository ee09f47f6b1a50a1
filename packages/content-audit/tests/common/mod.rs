//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use content_audit::{ClientConfig, ItemLoader, AuditOptionsItem};

/// Path of a file under `tests/fixtures`.
pub fn fixture(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

/// The "Phone number" rubric (`有` / `无`).
pub fn phone_item() -> AuditOptionsItem {
    ItemLoader::from_json_file(fixture("items/phone.json")).expect("phone rubric")
}

/// The "Advertising" rubric (`ad` / `not_ad` / `uncertain`).
pub fn ad_item() -> AuditOptionsItem {
    ItemLoader::from_json_file(fixture("items/ad.json")).expect("ad rubric")
}

/// Client config pointing at a mock server.
pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig::builder("test-key")
        .base_url(base_url)
        .model("test-model")
        .timeout_secs(5)
        .build()
}

/// Body of an OpenAI-compatible chat completion whose reply is `content`.
pub fn completion_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_760_000_000,
        "model": "test-model",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 120,
            "completion_tokens": 18,
            "total_tokens": 138
        }
    })
}

/// Body of a reply picking `choice` for `reason`.
pub fn decision_reply(choice: &str, reason: &str) -> String {
    serde_json::json!({ "choice": choice, "reason": reason }).to_string()
}

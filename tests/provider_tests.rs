//! Wire-level tests for the chat backends against a mock HTTP server.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ultron::error::BackendError;
use ultron::provider::{create_backend, BackendConfig, BackendKind, ChatBackend};
use ultron::types::{Message, Role};

fn backend(kind: BackendKind, server: &MockServer, timeout: Duration) -> Box<dyn ChatBackend> {
    create_backend(&BackendConfig {
        kind,
        api_key: "test-key".to_string(),
        model: "test-model".to_string(),
        base_url: Some(server.uri()),
        timeout,
    })
    .expect("backend")
}

fn conversation() -> Vec<Message> {
    vec![
        Message::system("Be helpful"),
        Message::user("Turtle State: pos=(0,0,0)\nUser Command: "),
    ]
}

fn expected_body() -> serde_json::Value {
    json!({
        "model": "test-model",
        "messages": [
            {"role": "system", "content": "Be helpful"},
            {"role": "user", "content": "Turtle State: pos=(0,0,0)\nUser Command: "},
        ]
    })
}

fn reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"},
            {"index": 1, "message": {"role": "assistant", "content": "second choice"}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

#[tokio::test]
async fn openai_sends_schema_and_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(expected_body()))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("```lua\nturtle.up()\n```")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(BackendKind::OpenAi, &server, Duration::from_secs(5));
    let conversation = conversation();
    let message = backend.complete(&conversation).await.expect("completion");

    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.content, "```lua\nturtle.up()\n```");
    assert_eq!(conversation.len(), 2);
}

#[tokio::test]
async fn deepseek_discards_reasoning_content() {
    let server = MockServer::start().await;
    let mut body = expected_body();
    body["stream"] = json!(false);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_json(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "turtle.down()",
                    "reasoning_content": "The turtle should descend because..."
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(BackendKind::DeepSeek, &server, Duration::from_secs(5));
    let message = backend.complete(&conversation()).await.expect("completion");

    assert_eq!(message, Message::assistant("turtle.down()"));
}

#[tokio::test]
async fn custom_backend_posts_generic_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_json(expected_body()))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("task complete")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(BackendKind::Custom, &server, Duration::from_secs(5));
    let message = backend.complete(&conversation()).await.expect("completion");

    assert_eq!(message.content, "task complete");
    assert_eq!(backend.backend_name(), "custom");
}

#[tokio::test]
async fn non_success_status_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    for kind in [BackendKind::OpenAi, BackendKind::DeepSeek, BackendKind::Custom] {
        let err = backend(kind, &server, Duration::from_secs(5))
            .complete(&conversation())
            .await
            .expect_err("status should fail");
        assert!(
            matches!(&err, BackendError::Status { status: 429, body } if body == "slow down"),
            "{kind}: {err}"
        );
        assert!(err.is_retryable());
    }
}

#[tokio::test]
async fn missing_choices_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    for kind in [BackendKind::OpenAi, BackendKind::DeepSeek, BackendKind::Custom] {
        let err = backend(kind, &server, Duration::from_secs(5))
            .complete(&conversation())
            .await
            .expect_err("empty choices should fail");
        assert!(matches!(err, BackendError::Malformed(_)), "{kind}: {err}");
    }
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_bytes(b"{not-json".to_vec()),
        )
        .mount(&server)
        .await;

    let err = backend(BackendKind::OpenAi, &server, Duration::from_secs(5))
        .complete(&conversation())
        .await
        .expect_err("bad json should fail");
    assert!(matches!(err, BackendError::Malformed(_)));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply("late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = backend(BackendKind::OpenAi, &server, Duration::from_millis(200))
        .complete(&conversation())
        .await
        .expect_err("slow reply should time out");
    assert!(matches!(err, BackendError::Timeout(200)), "{err}");
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let backend = create_backend(&BackendConfig {
        kind: BackendKind::Custom,
        api_key: String::new(),
        model: "m".to_string(),
        base_url: Some(common::closed_port_url()),
        timeout: Duration::from_secs(2),
    })
    .expect("backend");

    let err = backend
        .complete(&conversation())
        .await
        .expect_err("closed port should fail");
    assert!(matches!(err, BackendError::Transport(_)), "{err}");
    assert!(err.is_retryable());
}

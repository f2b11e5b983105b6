mod common;

use std::sync::Arc;
use std::time::Duration;

use common::test_image;
use inquisitor::{BatchOrchestrator, Config, DispatchOptions, SampleRequest, VisionInference, VisionService};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, model: &str) -> Config {
    Config {
        api_key: "sk-test".to_string(),
        api_base_url: server.uri(),
        model_name: model.to_string(),
        max_tokens: 64,
        ..Config::default()
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
            "logprobs": null
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

#[tokio::test]
async fn test_success_returns_first_choice_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o", "max_tokens": 64 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  x = 4  ")))
        .expect(1)
        .mount(&server)
        .await;

    let service = VisionService::new(&config_for(&server, "gpt-4o"));
    let outcome = service.invoke(SampleRequest::new(1, test_image())).await;

    assert_eq!(outcome.id, 1);
    assert_eq!(outcome.result.response_text(), "x = 4");
}

#[tokio::test]
async fn test_gpt5_request_uses_completion_token_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-5.1", "max_completion_tokens": 64 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let service = VisionService::new(&config_for(&server, "gpt-5.1"));
    let outcome = service.invoke(SampleRequest::new(2, test_image())).await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_error_status_becomes_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Invalid image data",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .mount(&server)
        .await;

    let service = VisionService::new(&config_for(&server, "gpt-4o"));
    let outcome = service.invoke(SampleRequest::new(3, test_image())).await;

    assert_eq!(outcome.id, 3);
    assert!(!outcome.is_success());
    assert!(outcome.result.response_text().starts_with("Error: "));
}

#[tokio::test]
async fn test_malformed_body_becomes_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let service = VisionService::new(&config_for(&server, "gpt-4o"));
    let outcome = service.invoke(SampleRequest::new(5, test_image())).await;

    assert_eq!(outcome.id, 5);
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_empty_choices_becomes_failure() {
    let server = MockServer::start().await;
    let mut body = completion_body("unused");
    body["choices"] = json!([]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let service = VisionService::new(&config_for(&server, "gpt-4o"));
    let outcome = service.invoke(SampleRequest::new(1, test_image())).await;

    assert!(!outcome.is_success());
    assert!(outcome.result.response_text().contains("LLM返回结果为空"));
}

#[tokio::test]
async fn test_batch_against_mock_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("same answer")))
        .expect(4)
        .mount(&server)
        .await;

    let service = Arc::new(VisionService::new(&config_for(&server, "gpt-4o")));
    let batch = BatchOrchestrator::new(service, DispatchOptions::default())
        .run(4, test_image())
        .await
        .unwrap();

    assert_eq!(batch.len(), 4);
    for (index, outcome) in batch.iter().enumerate() {
        assert_eq!(outcome.id, index + 1);
        assert_eq!(outcome.result.response_text(), "same answer");
    }
}

#[tokio::test]
async fn test_rate_limit_is_one_request_and_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "Rate limit reached",
                "type": "requests",
                "param": null,
                "code": "rate_limit_exceeded"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = VisionService::new(&config_for(&server, "gpt-4o"));
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        service.invoke(SampleRequest::new(6, test_image())),
    )
    .await
    .expect("rate-limited sample should fail without waiting for retries");

    assert_eq!(outcome.id, 6);
    assert!(!outcome.is_success());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_becomes_failure() {
    // 绑定后立即释放，得到一个没有监听者的端口
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = Config {
        api_key: "sk-test".to_string(),
        api_base_url: format!("http://127.0.0.1:{}", closed_port),
        model_name: "gpt-4o".to_string(),
        max_tokens: 64,
        ..Config::default()
    };
    let service = VisionService::new(&config);
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        service.invoke(SampleRequest::new(7, test_image())),
    )
    .await
    .expect("connection failure should not hang");

    assert_eq!(outcome.id, 7);
    assert!(!outcome.is_success());
    assert!(outcome.result.response_text().starts_with("Error: "));
}

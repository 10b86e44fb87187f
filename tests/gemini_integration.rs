use datastory::llm::{GeminiClient, LanguageModel, ModelError, ModelRequest};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/models/gemini-2.0-flash:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key", "gemini/gemini-2.0-flash", server.uri(), 0.2)
}

fn reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_text_request_returns_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "describe the data"}]}],
            "generationConfig": {"temperature": 0.2}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("It has three columns.")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .invoke(ModelRequest::text("describe the data"))
        .await
        .unwrap();

    assert_eq!(text, "It has three columns.");
}

#[tokio::test]
async fn test_image_is_sent_inline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "contents": [{"parts": [
                {"text": "narrate"},
                {"inline_data": {"mime_type": "image/png", "data": "iVBORw0KGgo="}}
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("A rising trend.")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .invoke(ModelRequest::with_image("narrate", "iVBORw0KGgo="))
        .await
        .unwrap();

    assert_eq!(text, "A rising trend.");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let err = client(&server)
        .invoke(ModelRequest::text("hello"))
        .await
        .unwrap_err();

    match err {
        ModelError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "quota exceeded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_candidates_are_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = client(&server)
        .invoke(ModelRequest::text("hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::InvalidResponse(_)));
}

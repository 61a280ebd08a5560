/*!
 * Tests for provider request builders and response formats
 */

use serde_json::json;
use subweave::providers::anthropic::{Anthropic, AnthropicRequest, AnthropicResponse};
use subweave::providers::openai::OpenAIRequest;
use subweave::providers::ProviderUsage;

#[test]
fn test_openai_request_should_serialize_optional_fields_only_when_set() {
    let bare = serde_json::to_value(OpenAIRequest::new("gpt-4o-mini").add_message("user", "Hi")).unwrap();
    assert_eq!(
        bare,
        json!({"model": "gpt-4o-mini", "messages": [{"role": "user", "content": "Hi"}]})
    );

    let full = serde_json::to_value(
        OpenAIRequest::new("gpt-4o-mini")
            .add_message("system", "Translate")
            .add_message("user", "Hello")
            .temperature(0.5)
            .max_tokens(500),
    )
    .unwrap();
    assert_eq!(full["messages"].as_array().map(|m| m.len()), Some(2));
    assert_eq!(full["temperature"], json!(0.5));
    assert_eq!(full["max_tokens"], json!(500));
}

#[test]
fn test_anthropic_request_should_carry_system_prompt_outside_messages() {
    let request = AnthropicRequest::new("claude-3-5-haiku-latest", 4096)
        .system("Translate to French")
        .add_message("user", "1\n00:00:01,000 --> 00:00:02,000\nHello\n");

    let value = serde_json::to_value(request).unwrap();

    assert_eq!(value["system"], json!("Translate to French"));
    assert_eq!(value["max_tokens"], json!(4096));
    assert_eq!(value["messages"][0]["role"], json!("user"));
    assert!(value.get("temperature").is_none());
}

#[test]
fn test_anthropic_response_should_join_text_blocks_and_map_usage() {
    let body = json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [
            {"type": "text", "text": "1\n00:00:01,000 --> 00:00:02,000\n"},
            {"type": "text", "text": "Bonjour\n"}
        ],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 40, "output_tokens": 12}
    });

    let response: AnthropicResponse = serde_json::from_value(body).unwrap();

    assert_eq!(Anthropic::extract_text(&response), "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n");
    assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.usage(), ProviderUsage::new(40, 12));
}

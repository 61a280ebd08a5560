/*!
 * Tests for application configuration functionality
 */

use subweave::app_config::{
    context_window_for_model, output_token_limit, Config, LogLevel, ProviderConfig, TranslationProvider,
};

fn configured() -> Config {
    let mut config = Config::default();
    config.transcription.api_key = "sk-test".to_string();
    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
    config
}

/// Test default configuration values
#[test]
fn test_default_config_should_have_expected_defaults() {
    let config = Config::default();

    assert_eq!(config.source_language, None);
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.available_providers.len(), 3);
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
    assert_eq!(config.translation.get_context_window(), 128_000);
    assert_eq!(config.transcription.model, "whisper-1");
    assert_eq!(config.chunking.safety_margin_tokens, 1000);
    assert_eq!(config.chunking.prompt_overhead_tokens, 0);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_validate_should_require_target_languages_and_keys() {
    assert!(configured().validate().is_ok());

    let mut config = configured();
    config.target_languages.clear();
    assert!(config.validate().is_err());

    let mut config = configured();
    config.target_languages = vec!["ja".to_string(), "xyz".to_string()];
    assert!(config.validate().is_err());

    let mut config = configured();
    config.transcription.api_key.clear();
    assert!(config.validate().is_err());

    let mut config = configured();
    config.translation.active_provider_config_mut().api_key.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_with_lmstudio_should_not_need_translation_key() {
    let mut config = configured();
    config.translation.provider = TranslationProvider::LMStudio;
    config.translation.active_provider_config_mut().api_key.clear();

    assert!(config.validate().is_ok());
    assert_eq!(config.translation.get_endpoint(), "http://localhost:1234/v1");
}

#[test]
fn test_validate_should_reject_bad_chunking_limits() {
    let mut config = configured();
    config.chunking.segment_seconds = 0.0;
    assert!(config.validate().is_err());

    let mut config = configured();
    config.chunking.max_api_calls = 0;
    assert!(config.validate().is_err());

    let mut config = configured();
    config.chunking.safety_margin_tokens = 500_000;
    assert!(config.validate().is_err());
}

#[test]
fn test_context_window_override_should_win_over_model_table() {
    let mut config = configured();
    assert_eq!(config.translation.get_context_window(), 128_000);

    config.translation.active_provider_config_mut().context_window = 4096;
    assert_eq!(config.translation.get_context_window(), 4096);
    assert_eq!(config.chunking.token_budget_per_chunk(4096), 3096);
}

#[test]
fn test_model_tables_should_know_common_models() {
    assert_eq!(context_window_for_model("gpt-4"), 8192);
    assert_eq!(context_window_for_model("claude-3-5-haiku-latest"), 200_000);
    assert_eq!(context_window_for_model("something-local"), 8192);

    assert_eq!(output_token_limit("gpt-4o-mini"), 16_384);
    assert_eq!(output_token_limit("claude-3-5-sonnet-latest"), 8192);
    assert_eq!(output_token_limit("claude-3-opus-latest"), 4096);
}

#[test]
fn test_provider_from_str_should_be_case_insensitive() {
    assert_eq!("OpenAI".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("lmstudio".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert!("ollama".parse::<TranslationProvider>().is_err());
    assert_eq!(TranslationProvider::Anthropic.display_name(), "Anthropic");
}

#[test]
fn test_config_json_should_fill_missing_sections_with_defaults() {
    let json = r#"{
        "target_languages": ["ja", "es"],
        "translation": {
            "provider": "anthropic",
            "available_providers": [
                { "type": "anthropic", "model": "claude-3-5-haiku-latest", "api_key": "sk-ant" }
            ]
        },
        "chunking": { "max_entries_per_chunk": 20 }
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.target_languages, vec!["ja", "es"]);
    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.translation.get_model(), "claude-3-5-haiku-latest");
    assert_eq!(config.translation.get_api_key(), "sk-ant");
    assert_eq!(config.chunking.max_entries_per_chunk, 20);
    assert_eq!(config.chunking.max_api_calls, 25);
    assert_eq!(config.chunking.segment_seconds, 300.0);
    assert_eq!(config.transcription.concurrent_requests, 3);
}

#[test]
fn test_provider_config_new_should_fill_provider_defaults() {
    let anthropic = ProviderConfig::new(TranslationProvider::Anthropic);
    assert_eq!(anthropic.provider_type, "anthropic");
    assert!(anthropic.endpoint.starts_with("https://api.anthropic.com"));
    assert!(anthropic.api_key.is_empty());
}

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Optional spoken language hint passed to speech-to-text (ISO 639-1)
    #[serde(default)]
    pub source_language: Option<String>,

    /// Target language codes (ISO)
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    /// Language assumed when no chunk reports one
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,

    /// Speech-to-text config
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Audio and subtitle chunking limits
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_translation_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Model context window in tokens, 0 = look up by model name
    #[serde(default)]
    pub context_window: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint) = match provider_type {
            TranslationProvider::OpenAI => (default_openai_model(), default_openai_endpoint()),
            TranslationProvider::Anthropic => (default_anthropic_model(), default_anthropic_endpoint()),
            TranslationProvider::LMStudio => (default_lmstudio_model(), default_lmstudio_endpoint()),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            concurrent_requests: default_translation_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            context_window: 0,
        }
    }
}

/// Speech-to-text service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Model name (e.g., "whisper-1")
    #[serde(default = "default_transcription_model")]
    pub model: String,

    /// API key for the service
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL (OpenAI-compatible)
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// Worker pool size for chunk transcription
    #[serde(default = "default_transcription_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Request timeout in seconds
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: default_transcription_model(),
            api_key: String::new(),
            endpoint: default_openai_endpoint(),
            concurrent_requests: default_transcription_concurrent_requests(),
            timeout_secs: default_transcription_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
        }
    }
}

/// Limits for audio splitting and translation batching
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Audio segment length in seconds
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: f64,

    /// Maximum subtitle entries per translation request
    #[serde(default = "default_max_entries_per_chunk")]
    pub max_entries_per_chunk: usize,

    /// Hard ceiling on translation requests per language
    #[serde(default = "default_max_api_calls")]
    pub max_api_calls: usize,

    /// Tokens kept free of the context window on every request
    #[serde(default = "default_safety_margin_tokens")]
    pub safety_margin_tokens: u64,

    /// Fixed per-request prompt cost; 0 derives it from the system prompt
    #[serde(default)]
    pub prompt_overhead_tokens: u64,

    /// Translated text size relative to the source text, in tokens
    #[serde(default = "default_expansion_factor")]
    pub expansion_factor: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            segment_seconds: default_segment_seconds(),
            max_entries_per_chunk: default_max_entries_per_chunk(),
            max_api_calls: default_max_api_calls(),
            safety_margin_tokens: default_safety_margin_tokens(),
            prompt_overhead_tokens: 0,
            expansion_factor: default_expansion_factor(),
        }
    }
}

impl ChunkingConfig {
    /// Tokens a single request may use: context window minus the safety margin
    pub fn token_budget_per_chunk(&self, context_window: u64) -> u64 {
        context_window.saturating_sub(self.safety_margin_tokens)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_target_languages() -> Vec<String> {
    vec!["fr".to_string()]
}

fn default_fallback_language() -> String {
    "en".to_string()
}

fn default_translation_concurrent_requests() -> usize {
    4
}

fn default_transcription_concurrent_requests() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_transcription_timeout_secs() -> u64 {
    300
}

fn default_temperature() -> f32 {
    0.3
}

fn default_segment_seconds() -> f64 {
    300.0
}

fn default_max_entries_per_chunk() -> usize {
    15
}

fn default_max_api_calls() -> usize {
    25
}

fn default_safety_margin_tokens() -> u64 {
    1000
}

fn default_expansion_factor() -> f64 {
    2.0
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional subtitle translator. Translate the following SRT subtitles from {source_language} to {target_language}. \
     Keep every entry number and every timing line exactly as given and keep the same number of entries. \
     Only translate the text lines and respond with the translated SRT only, without explanations or notes."
        .to_string()
}

/// Context window size for well-known models, used when the provider config leaves it at 0
pub fn context_window_for_model(model: &str) -> u64 {
    match model {
        // OpenAI models
        "gpt-4" | "gpt-4-0613" => 8192,
        "gpt-4-32k" | "gpt-4-32k-0613" => 32768,
        "gpt-3.5-turbo" | "gpt-3.5-turbo-0125" | "gpt-3.5-turbo-16k" => 16385,
        m if m.starts_with("gpt-4o") || m.starts_with("gpt-4-turbo") => 128_000,
        m if m.starts_with("gpt-4.1") => 1_000_000,

        // Anthropic models
        m if m.starts_with("claude-3") => 200_000,
        "claude-2.1" => 200_000,
        "claude-2.0" | "claude-instant-1.2" => 100_000,

        // Default for unknown models
        _ => 8192,
    }
}

/// Largest response a well-known model will generate in one call
pub fn output_token_limit(model: &str) -> u64 {
    match model {
        m if m.starts_with("gpt-4o") || m.starts_with("gpt-4.1") => 16_384,
        m if m.starts_with("gpt-4-turbo") || m.starts_with("gpt-3.5") => 4096,
        "gpt-4" | "gpt-4-0613" => 8192,
        m if m.starts_with("claude-3-5") || m.starts_with("claude-3-7") => 8192,
        m if m.starts_with("claude") => 4096,
        _ => 4096,
    }
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.target_languages.is_empty() {
            return Err(anyhow!("At least one target language is required"));
        }
        for (position, language) in self.target_languages.iter().enumerate() {
            crate::language_utils::get_language_name(language)?;
            if self.target_languages[..position].iter().any(|seen| seen.eq_ignore_ascii_case(language)) {
                return Err(anyhow!("Target language '{}' is listed more than once", language));
            }
        }
        crate::language_utils::get_language_name(&self.fallback_language)?;
        if let Some(source) = &self.source_language {
            crate::language_utils::get_language_name(source)?;
        }

        // Speech-to-text always goes through an OpenAI-compatible endpoint
        Url::parse(&self.transcription.endpoint)
            .map_err(|e| anyhow!("Invalid transcription endpoint '{}': {}", self.transcription.endpoint, e))?;
        if self.transcription.api_key.is_empty() && self.transcription.endpoint == default_openai_endpoint() {
            return Err(anyhow!("Transcription API key is required for the OpenAI endpoint"));
        }
        if self.transcription.concurrent_requests == 0 {
            return Err(anyhow!("transcription.concurrent_requests must be at least 1"));
        }

        let endpoint = self.translation.get_endpoint();
        Url::parse(&endpoint).map_err(|e| anyhow!("Invalid translation endpoint '{}': {}", endpoint, e))?;

        // Validate API key for all providers except LM Studio
        match self.translation.provider {
            TranslationProvider::OpenAI => {
                if self.translation.get_api_key().is_empty() {
                    return Err(anyhow!("Translation API key is required for OpenAI provider"));
                }
            }
            TranslationProvider::Anthropic => {
                if self.translation.get_api_key().is_empty() {
                    return Err(anyhow!("Translation API key is required for Anthropic provider"));
                }
            }
            TranslationProvider::LMStudio => {}
        }

        let chunking = &self.chunking;
        if !(chunking.segment_seconds > 0.0) {
            return Err(anyhow!("chunking.segment_seconds must be positive"));
        }
        if chunking.max_entries_per_chunk == 0 || chunking.max_api_calls == 0 {
            return Err(anyhow!("chunking.max_entries_per_chunk and chunking.max_api_calls must be at least 1"));
        }
        if !(chunking.expansion_factor > 0.0) {
            return Err(anyhow!("chunking.expansion_factor must be positive"));
        }
        if chunking.token_budget_per_chunk(self.translation.get_context_window()) == 0 {
            return Err(anyhow!(
                "chunking.safety_margin_tokens ({}) leaves no room in a {} token context window",
                chunking.safety_margin_tokens,
                self.translation.get_context_window()
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: None,
            target_languages: default_target_languages(),
            fallback_language: default_fallback_language(),
            transcription: TranscriptionConfig::default(),
            translation: TranslationConfig::default(),
            chunking: ChunkingConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    pub fn optimal_concurrent_requests(&self) -> usize {
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.concurrent_requests.max(1);
        }

        default_translation_concurrent_requests()
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, creating it if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => &mut self.available_providers[index],
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                let last = self.available_providers.len() - 1;
                &mut self.available_providers[last]
            }
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the context window of the active model
    pub fn get_context_window(&self) -> u64 {
        if let Some(provider_config) = self.get_active_provider_config() {
            if provider_config.context_window > 0 {
                return provider_config.context_window;
            }
        }

        context_window_for_model(&self.get_model())
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}

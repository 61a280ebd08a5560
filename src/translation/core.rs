/*!
 * Core translation service implementation.
 *
 * `TranslationService` is the production `Translator`: it picks the client
 * for the configured provider and sends one SRT batch per request.
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::fmt;

use crate::app_config::{output_token_limit, TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::{TranslationReply, TranslationRequest, Translator};

/// Translation provider implementation variants
enum TranslationProviderImpl {
    /// OpenAI API service
    OpenAI {
        /// Client instance
        client: OpenAI,
    },

    /// LM Studio local server (OpenAI-compatible)
    LMStudio {
        /// Client instance (OpenAI-compatible)
        client: OpenAI,
    },

    /// Anthropic API service
    Anthropic {
        /// Client instance
        client: Anthropic,
    },
}

/// Main translation service for subtitle translation
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,
}

impl fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationService")
            .field("provider", &self.config.provider.display_name())
            .field("model", &self.config.get_model())
            .finish()
    }
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let endpoint = config.get_endpoint();
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::OpenAI => {
                if config.get_api_key().is_empty() {
                    return Err(anyhow!("OpenAI provider requires an API key"));
                }
                TranslationProviderImpl::OpenAI {
                    client: OpenAI::new(config.get_api_key(), endpoint, timeout_secs),
                }
            }
            ConfigTranslationProvider::LMStudio => {
                // LM Studio often doesn't require an API key; use a default if empty
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };

                TranslationProviderImpl::LMStudio {
                    client: OpenAI::new(api_key, endpoint, timeout_secs),
                }
            }
            ConfigTranslationProvider::Anthropic => {
                if config.get_api_key().is_empty() {
                    return Err(anyhow!("Anthropic provider requires an API key"));
                }
                TranslationProviderImpl::Anthropic {
                    client: Anthropic::new(config.get_api_key(), endpoint, timeout_secs),
                }
            }
        };

        Ok(Self { provider, config })
    }

    /// Model used for requests
    pub fn model(&self) -> String {
        self.config.get_model()
    }

    /// Context window of the configured model
    pub fn context_window(&self) -> u64 {
        self.config.get_context_window()
    }

    // The response budget is capped by what the model can generate in one call
    fn response_cap(request: &TranslationRequest) -> u32 {
        request
            .max_response_tokens
            .min(output_token_limit(&request.model))
            .min(u32::MAX as u64) as u32
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationReply, ProviderError> {
        let max_tokens = Self::response_cap(request);
        debug!(
            "Translating {} -> {} with {} (max {} response tokens)",
            request.source_language, request.target_language, request.model, max_tokens
        );

        match &self.provider {
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                let chat = OpenAIRequest::new(&request.model)
                    .add_message("system", &request.system_prompt)
                    .add_message("user", &request.payload)
                    .temperature(self.config.common.temperature)
                    .max_tokens(max_tokens);

                let response = client.complete(chat).await?;
                if response.choices.first().and_then(|c| c.finish_reason.as_deref()) == Some("length") {
                    warn!("{} reply was cut at the response token cap", self.config.provider.display_name());
                }

                let text = OpenAI::extract_text(&response)
                    .ok_or_else(|| ProviderError::ParseError("OpenAI-compatible provider returned no choices".to_string()))?;

                Ok(TranslationReply {
                    text,
                    usage: response.usage(),
                })
            }
            TranslationProviderImpl::Anthropic { client } => {
                let message = AnthropicRequest::new(&request.model, max_tokens)
                    .system(&request.system_prompt)
                    .add_message("user", &request.payload)
                    .temperature(self.config.common.temperature);

                let response = client.complete(message).await?;
                if response.stop_reason.as_deref() == Some("max_tokens") {
                    warn!("Anthropic reply was cut at the response token cap");
                }

                Ok(TranslationReply {
                    text: Anthropic::extract_text(&response),
                    usage: Some(response.usage()),
                })
            }
        }
    }
}

/*!
 * Error types for the subweave application.
 *
 * Collaborator failures are reported as `ProviderError`, pipeline stage
 * failures as `PipelineError`.
 */

use thiserror::Error;

/// Errors that can occur when talking to an external collaborator
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The input handed to the collaborator was unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to the matching error kind
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by the transcription and translation pipeline
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// The input media path does not exist
    #[error("Media file not found: {0}")]
    MediaNotFound(String),

    /// The transcoder could not produce audio chunks
    #[error("Audio chunking failed: {0}")]
    ChunkingFailure(String),

    /// The speech-to-text collaborator failed on a chunk
    #[error("Transcription of chunk {chunk_index} failed: {message}")]
    TranscriptionFailure {
        chunk_index: usize,
        message: String,
    },

    /// A chunk produced no segments at all
    #[error("Chunk {chunk_index} produced an empty transcription")]
    EmptyTranscription { chunk_index: usize },

    /// A segment with unusable timing
    #[error("Invalid segment in chunk {chunk_index}: {message}")]
    InvalidSegment {
        chunk_index: usize,
        message: String,
    },

    /// A translation batch leaves no room for a response
    #[error("Translation chunk {chunk_index} ({language}) is too large: prompt costs {prompt_tokens} tokens, no room left for a response")]
    ChunkTooLarge {
        chunk_index: usize,
        language: String,
        prompt_tokens: u64,
    },

    /// The translated reply does not line up with the request
    #[error("Translation chunk {chunk_index} ({language}) returned {actual} entries, expected {expected}")]
    TranslationFormatError {
        chunk_index: usize,
        language: String,
        expected: usize,
        actual: usize,
    },

    /// The translation collaborator failed for a chunk
    #[error("Translation of chunk {chunk_index} ({language}) failed: {message}")]
    TranslationFailure {
        chunk_index: usize,
        language: String,
        message: String,
    },

    /// A target language has failed chunks
    #[error("Translation to {language} is incomplete: {failed_chunks} of {total_chunks} chunks failed")]
    PartialLanguageFailure {
        language: String,
        failed_chunks: usize,
        total_chunks: usize,
    },

    /// No target language could be completed
    #[error("No target language was fully translated: {0}")]
    AllLanguagesFailed(String),

    /// Invalid pipeline settings
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Writing the results failed
    #[error("Output error: {0}")]
    Output(String),
}

impl PipelineError {
    /// Whether this error only affects one (chunk, language) pair
    pub fn is_pair_scoped(&self) -> bool {
        matches!(
            self,
            Self::ChunkTooLarge { .. }
                | Self::TranslationFormatError { .. }
                | Self::TranslationFailure { .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Ollama request failed: {0}")]
    Ollama(String),

    #[error("{operation} request timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

use ragrun_llm::LlmError;
use ragrun_memory::VectorStoreError;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to embed chunk {chunk_index}: {source}")]
    Embedding {
        chunk_index: usize,
        #[source]
        source: LlmError,
    },
    #[error("failed to store chunk {chunk_index}: {source}")]
    Store {
        chunk_index: usize,
        #[source]
        source: VectorStoreError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(#[source] LlmError),
    #[error("vector search failed: {0}")]
    Store(#[source] VectorStoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Llm(#[from] LlmError),
    #[error("model returned an empty answer")]
    EmptyResponse,
}

/// Failure confined to a single question; the run continues.
#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Failure that ends the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("provider {provider} does not support embeddings")]
    EmbeddingUnsupported { provider: String },
    #[error("ingestion failed: {0}")]
    Index(#[from] IndexError),
}

impl PipelineError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

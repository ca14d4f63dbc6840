//! Chunking, indexing, retrieval, answering and the batch pipeline.

pub mod answerer;
pub mod chunker;
pub mod config;
pub mod error;
pub mod indexer;
pub mod loader;
pub mod pipeline;
pub mod retriever;

pub use error::{GenerationError, IndexError, PipelineError, QuestionError, RetrievalError};

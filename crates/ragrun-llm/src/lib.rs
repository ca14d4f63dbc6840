//! LLM provider abstraction: chat generation and embeddings behind one trait.

pub mod any;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod provider;

pub use error::LlmError;
pub use provider::LlmProvider;

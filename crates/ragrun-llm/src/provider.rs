use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::LlmError;

/// Boxed future returned by an embedding closure.
pub type EmbedFuture = Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send>>;

/// Type-erased embedding function handed to the indexer and retriever.
pub type EmbedFn = dyn Fn(&str) -> EmbedFuture + Send + Sync;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the LLM and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Single-turn completion: the prompt is sent as one user message.
    ///
    /// # Errors
    ///
    /// Returns whatever [`LlmProvider::chat`] returns.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send {
        let messages = vec![Message::user(prompt)];
        async move { self.chat(&messages).await }
    }

    /// Embed `text` into a fixed-dimension vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or rejects the input.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    fn supports_embeddings(&self) -> bool;

    fn name(&self) -> &str;
}

/// Wrap a shared provider into an [`EmbedFn`].
pub fn embed_fn<P: LlmProvider + 'static>(provider: Arc<P>) -> Box<EmbedFn> {
    Box::new(move |text: &str| -> EmbedFuture {
        let p = Arc::clone(&provider);
        let owned = text.to_owned();
        Box::pin(async move { p.embed(&owned).await })
    })
}

//! Test-only mock LLM provider.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::provider::{LlmProvider, Message};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    /// Per-input embeddings; inputs not listed get `embedding`.
    pub embeddings: HashMap<String, Vec<f32>>,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    /// Inputs whose embedding call fails.
    pub fail_embed_for: HashSet<String>,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            embedding: vec![1.0, 0.0, 0.0],
            embeddings: HashMap::new(),
            supports_embeddings: true,
            fail_chat: false,
            fail_embed_for: HashSet::new(),
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn failing_embed_for(mut self, text: impl Into<String>) -> Self {
        self.fail_embed_for.insert(text.into());
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Contents of every chat request received so far, last message only.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if let Some(last) = messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        if self.fail_chat {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        if !self.supports_embeddings {
            return Err(crate::LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        if self.fail_embed_for.contains(text) {
            return Err(crate::LlmError::Other(format!("mock embed error for {text:?}")));
        }
        Ok(self
            .embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.embedding.clone()))
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_are_consumed_in_order() {
        let mock = MockProvider::with_responses(vec!["a".into(), "b".into()]);
        assert_eq!(mock.generate("1").await.unwrap(), "a");
        assert_eq!(mock.generate("2").await.unwrap(), "b");
        assert_eq!(mock.generate("3").await.unwrap(), "mock response");
        assert_eq!(mock.prompts(), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn failing_chat_errors() {
        assert!(MockProvider::failing().generate("x").await.is_err());
    }

    #[tokio::test]
    async fn embeddings_per_input_and_failures() {
        let mock = MockProvider::default()
            .with_embedding("a", vec![0.0, 1.0])
            .failing_embed_for("bad");
        assert_eq!(mock.embed("a").await.unwrap(), vec![0.0, 1.0]);
        assert_eq!(mock.embed("other").await.unwrap(), vec![1.0, 0.0, 0.0]);
        assert!(mock.embed("bad").await.is_err());
    }
}

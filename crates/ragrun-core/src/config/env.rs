use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_services();
        self.apply_env_overrides_pipeline();
    }

    fn apply_env_overrides_services(&mut self) {
        if let Ok(v) = std::env::var("RAGRUN_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid RAGRUN_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGRUN_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("RAGRUN_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("RAGRUN_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("RAGRUN_VECTOR_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.vector_store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid RAGRUN_VECTOR_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGRUN_QDRANT_URL") {
            self.vector_store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("RAGRUN_COLLECTION") {
            self.vector_store.collection = v;
        }
        if let Ok(v) = std::env::var("RAGRUN_TIMEOUT_LLM") {
            match v.parse::<u64>() {
                Ok(secs) => self.timeouts.llm_seconds = secs,
                Err(_) => tracing::warn!("ignoring invalid RAGRUN_TIMEOUT_LLM value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGRUN_TIMEOUT_EMBEDDING") {
            match v.parse::<u64>() {
                Ok(secs) => self.timeouts.embedding_seconds = secs,
                Err(_) => tracing::warn!("ignoring invalid RAGRUN_TIMEOUT_EMBEDDING value: {v}"),
            }
        }
    }

    fn apply_env_overrides_pipeline(&mut self) {
        if let Ok(v) = std::env::var("RAGRUN_CHUNK_SIZE_WORDS") {
            match v.parse::<usize>() {
                Ok(n) => self.pipeline.chunk_size_words = n,
                Err(_) => tracing::warn!("ignoring invalid RAGRUN_CHUNK_SIZE_WORDS value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGRUN_TOP_K") {
            match v.parse::<usize>() {
                Ok(n) => self.pipeline.top_k = n,
                Err(_) => tracing::warn!("ignoring invalid RAGRUN_TOP_K value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGRUN_KNOWLEDGE_PATH") {
            self.pipeline.knowledge_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RAGRUN_QUESTIONS_PATH") {
            self.pipeline.questions_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RAGRUN_ANSWERS_PATH") {
            self.pipeline.answers_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RAGRUN_REPORT_PATH") {
            self.pipeline.report_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RAGRUN_TRUNCATE_OUTPUTS") {
            match v.parse::<bool>() {
                Ok(flag) => self.pipeline.truncate_outputs_on_start = flag,
                Err(_) => tracing::warn!("ignoring invalid RAGRUN_TRUNCATE_OUTPUTS value: {v}"),
            }
        }
    }
}

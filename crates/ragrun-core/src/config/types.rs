use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// LLM provider backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    Mock,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_provider() -> ProviderKind {
    ProviderKind::Ollama
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "llama3:8b".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Qdrant,
    Memory,
}

impl VectorBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qdrant => "qdrant",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for VectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_backend() -> VectorBackend {
    VectorBackend::Qdrant
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_collection() -> String {
    "knowledge_base".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: VectorBackend,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            qdrant_url: default_qdrant_url(),
            collection: default_collection(),
        }
    }
}

fn default_chunk_size_words() -> usize {
    150
}

fn default_top_k() -> usize {
    3
}

fn default_knowledge_path() -> PathBuf {
    PathBuf::from("knowledge.txt")
}

fn default_questions_path() -> PathBuf {
    PathBuf::from("questions.txt")
}

fn default_answers_path() -> PathBuf {
    PathBuf::from("answers.txt")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("report.csv")
}

fn default_truncate_outputs() -> bool {
    true
}

fn default_max_knowledge_bytes() -> u64 {
    50 * 1024 * 1024
}

/// The `[pipeline]` table: chunking, retrieval and file locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    #[serde(default = "default_chunk_size_words")]
    pub chunk_size_words: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_knowledge_path")]
    pub knowledge_path: PathBuf,
    #[serde(default = "default_questions_path")]
    pub questions_path: PathBuf,
    #[serde(default = "default_answers_path")]
    pub answers_path: PathBuf,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default = "default_truncate_outputs")]
    pub truncate_outputs_on_start: bool,
    #[serde(default = "default_max_knowledge_bytes")]
    pub max_knowledge_bytes: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size_words: default_chunk_size_words(),
            top_k: default_top_k(),
            knowledge_path: default_knowledge_path(),
            questions_path: default_questions_path(),
            answers_path: default_answers_path(),
            report_path: default_report_path(),
            truncate_outputs_on_start: default_truncate_outputs(),
            max_knowledge_bytes: default_max_knowledge_bytes(),
        }
    }
}

fn default_llm_timeout() -> u64 {
    1800
}

fn default_embedding_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_llm_timeout")]
    pub llm_seconds: u64,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_seconds: default_llm_timeout(),
            embedding_seconds: default_embedding_timeout(),
        }
    }
}

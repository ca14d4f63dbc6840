mod env;
mod types;


pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

/// Used when neither `--config` nor `RAGRUN_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Pick the config file: explicit path, then `RAGRUN_CONFIG`, then [`DEFAULT_CONFIG_PATH`].
    #[must_use]
    pub fn resolve_path(cli: Option<&Path>) -> PathBuf {
        if let Some(path) = cli {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var("RAGRUN_CONFIG") {
            return PathBuf::from(path);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pipeline.chunk_size_words == 0 {
            bail!("pipeline.chunk_size_words must be at least 1");
        }
        if self.pipeline.top_k == 0 {
            bail!("pipeline.top_k must be at least 1");
        }
        if self.vector_store.collection.trim().is_empty() {
            bail!("vector_store.collection must not be empty");
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if self.llm.embedding_model.trim().is_empty() {
            bail!("llm.embedding_model must not be empty");
        }
        if self.timeouts.llm_seconds == 0 {
            bail!("timeouts.llm_seconds must be greater than 0");
        }
        if self.timeouts.embedding_seconds == 0 {
            bail!("timeouts.embedding_seconds must be greater than 0");
        }
        Ok(())
    }
}

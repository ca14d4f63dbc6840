use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ragrun_core::config::{Config, ProviderKind, VectorBackend};
use ragrun_core::pipeline::{Pipeline, PipelineConfig, PipelinePaths};
use ragrun_llm::any::AnyProvider;
use ragrun_llm::ollama::OllamaProvider;
use ragrun_memory::{InMemoryVectorStore, QdrantOps, VectorStore};

/// Answer a batch of questions against a single knowledge document.
#[derive(Debug, Parser)]
#[command(name = "ragrun", version, about)]
struct Cli {
    /// Config file (defaults to `RAGRUN_CONFIG`, then config/default.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    knowledge: Option<PathBuf>,
    #[arg(long)]
    questions: Option<PathBuf>,
    #[arg(long)]
    answers: Option<PathBuf>,
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    top_k: Option<usize>,
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Keep vectors in process memory instead of Qdrant.
    #[arg(long)]
    memory_store: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(p) = &self.knowledge {
            config.pipeline.knowledge_path.clone_from(p);
        }
        if let Some(p) = &self.questions {
            config.pipeline.questions_path.clone_from(p);
        }
        if let Some(p) = &self.answers {
            config.pipeline.answers_path.clone_from(p);
        }
        if let Some(p) = &self.report {
            config.pipeline.report_path.clone_from(p);
        }
        if let Some(k) = self.top_k {
            config.pipeline.top_k = k;
        }
        if let Some(n) = self.chunk_size {
            config.pipeline.chunk_size_words = n;
        }
        if self.memory_store {
            config.vector_store.backend = VectorBackend::Memory;
        }
    }
}

#[tokio::main]
async fn main() {
    init_subscriber();

    match run(Cli::parse()).await {
        Ok(paths) => println!(
            "Answers saved to {} and report to {}",
            paths.answers.display(),
            paths.report.display()
        ),
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<PipelinePaths> {
    let config_path = Config::resolve_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    cli.apply(&mut config);
    config.validate()?;

    let provider = create_provider(&config)?;
    health_check(&provider).await;
    let store = create_store(&config)?;

    let paths = PipelinePaths::from(&config);
    let pipeline = Pipeline::new(PipelineConfig::from(&config), Arc::new(provider), store);
    pipeline
        .run_files(&paths)
        .await
        .context("pipeline failed")?;
    Ok(paths)
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    match config.llm.provider {
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(
            OllamaProvider::new(
                &config.llm.base_url,
                config.llm.model.clone(),
                config.llm.embedding_model.clone(),
            )
            .with_timeouts(
                Duration::from_secs(config.timeouts.llm_seconds),
                Duration::from_secs(config.timeouts.embedding_seconds),
            ),
        )),
        #[cfg(feature = "mock")]
        ProviderKind::Mock => Ok(AnyProvider::Mock(ragrun_llm::mock::MockProvider::default())),
        #[cfg(not(feature = "mock"))]
        ProviderKind::Mock => anyhow::bail!("mock provider requires the `mock` feature"),
    }
}

fn create_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.vector_store.backend {
        VectorBackend::Qdrant => {
            let ops = QdrantOps::new(&config.vector_store.qdrant_url).map_err(|e| {
                anyhow::anyhow!("invalid qdrant url {}: {e}", config.vector_store.qdrant_url)
            })?;
            tracing::info!(url = %config.vector_store.qdrant_url, "using Qdrant vector store");
            Ok(Arc::new(ops))
        }
        VectorBackend::Memory => {
            tracing::info!("using in-memory vector store");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

#[allow(irrefutable_let_patterns)]
async fn health_check(provider: &AnyProvider) {
    if let AnyProvider::Ollama(ollama) = provider {
        match ollama.health_check().await {
            Ok(()) => tracing::info!("ollama health check passed"),
            Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
        }
    }
}

//! Batch orchestration: ingest once, then answer each question in turn.

pub mod report;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ragrun_llm::LlmProvider;
use ragrun_llm::provider::{EmbedFn, embed_fn};
use ragrun_memory::VectorStore;

use crate::answerer::{answer, build_context};
use crate::chunker::chunk;
use crate::config::Config;
use crate::error::{PipelineError, QuestionError};
use crate::indexer::index;
use crate::loader::{read_knowledge, read_questions};
use crate::retriever::retrieve;

pub use report::{
    AnswerLog, AnswerRecord, ErrorRecord, FileOutputs, MetricsReport, MetricsRow, Outputs,
    REPORT_HEADER, open_outputs,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Run-scoped settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_size_words: usize,
    pub top_k: usize,
    pub collection: String,
    pub truncate_outputs_on_start: bool,
    pub max_knowledge_bytes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size_words: config.pipeline.chunk_size_words,
            top_k: config.pipeline.top_k,
            collection: config.vector_store.collection.clone(),
            truncate_outputs_on_start: config.pipeline.truncate_outputs_on_start,
            max_knowledge_bytes: config.pipeline.max_knowledge_bytes,
        }
    }
}

/// Input and output locations for [`Pipeline::run_files`].
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub knowledge: PathBuf,
    pub questions: PathBuf,
    pub answers: PathBuf,
    pub report: PathBuf,
}

impl From<&Config> for PipelinePaths {
    fn from(config: &Config) -> Self {
        Self {
            knowledge: config.pipeline.knowledge_path.clone(),
            questions: config.pipeline.questions_path.clone(),
            answers: config.pipeline.answers_path.clone(),
            report: config.pipeline.report_path.clone(),
        }
    }
}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks_indexed: usize,
    pub questions: usize,
    pub answered: usize,
    pub failed: usize,
    pub ingest_ms: u64,
    pub total_ms: u64,
}

pub struct Pipeline<P> {
    config: PipelineConfig,
    provider: Arc<P>,
    embed: Box<EmbedFn>,
    store: Arc<dyn VectorStore>,
}

impl<P: LlmProvider + 'static> Pipeline<P> {
    #[must_use]
    pub fn new(config: PipelineConfig, provider: Arc<P>, store: Arc<dyn VectorStore>) -> Self {
        let embed = embed_fn(Arc::clone(&provider));
        Self {
            config,
            provider,
            embed,
            store,
        }
    }

    /// Open the outputs, read both inputs, then [`run`](Self::run).
    ///
    /// Outputs are opened first so that a truncating run leaves them empty when ingestion fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] on unreadable or invalid inputs, ingestion failure, or an
    /// output write failure.
    pub async fn run_files(&self, paths: &PipelinePaths) -> Result<RunSummary, PipelineError> {
        let mut outputs = open_outputs(
            &paths.answers,
            &paths.report,
            self.config.truncate_outputs_on_start,
        )?;
        let knowledge = read_knowledge(&paths.knowledge, self.config.max_knowledge_bytes).await?;
        let questions = read_questions(&paths.questions).await?;
        self.run(&knowledge, &questions, &mut outputs).await
    }

    /// Ingest `knowledge`, then answer each non-blank question, recording one entry per
    /// question in `outputs`.
    ///
    /// A question that fails retrieval or generation is recorded as an error and the run
    /// moves on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if ingestion fails (no question is processed) or if an
    /// output cannot be written.
    pub async fn run<A: Write, R: Write>(
        &self,
        knowledge: &str,
        questions: &[String],
        outputs: &mut Outputs<A, R>,
    ) -> Result<RunSummary, PipelineError> {
        let run_start = Instant::now();
        let mut summary = RunSummary::default();

        if !self.provider.supports_embeddings() {
            return Err(PipelineError::EmbeddingUnsupported {
                provider: self.provider.name().to_owned(),
            });
        }

        tracing::info!(
            chunk_size_words = self.config.chunk_size_words,
            collection = %self.config.collection,
            "ingestion started"
        );
        let chunks = chunk(knowledge, self.config.chunk_size_words)?;
        summary.chunks_indexed = index(
            chunks,
            self.embed.as_ref(),
            self.store.as_ref(),
            &self.config.collection,
        )
        .await?;
        summary.ingest_ms = millis(run_start.elapsed());
        tracing::info!(
            chunks = summary.chunks_indexed,
            ingest_ms = summary.ingest_ms,
            "knowledge stored"
        );

        for question in questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
        {
            summary.questions += 1;
            let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

            match self.answer_question(question, timestamp.clone()).await {
                Ok(record) => {
                    outputs.record_answer(&record)?;
                    summary.answered += 1;
                    tracing::info!(question, total_ms = record.total_ms, "question answered");
                }
                Err(e) => {
                    tracing::warn!(question, error = %e, "question failed");
                    outputs.record_error(&ErrorRecord {
                        timestamp,
                        question: question.to_owned(),
                        error: e.to_string(),
                        top_k: self.config.top_k,
                    })?;
                    summary.failed += 1;
                }
            }
        }

        summary.total_ms = millis(run_start.elapsed());
        tracing::info!(
            chunks_indexed = summary.chunks_indexed,
            questions = summary.questions,
            answered = summary.answered,
            failed = summary.failed,
            total_ms = summary.total_ms,
            "run finished"
        );
        Ok(summary)
    }

    async fn answer_question(
        &self,
        question: &str,
        timestamp: String,
    ) -> Result<AnswerRecord, QuestionError> {
        let t0 = Instant::now();
        let retrieved = retrieve(
            question,
            self.embed.as_ref(),
            self.store.as_ref(),
            &self.config.collection,
            self.config.top_k,
        )
        .await?;
        let t1 = Instant::now();

        let context = build_context(&retrieved);
        let ctx_chars = context.chars().count();
        let text = answer(question, &context, self.provider.as_ref()).await?;
        let t2 = Instant::now();

        let retrieval_ms = millis(t1 - t0);
        let generation_ms = millis(t2 - t1);
        Ok(AnswerRecord {
            timestamp,
            question: question.to_owned(),
            answer: text,
            retrieval_ms,
            generation_ms,
            total_ms: retrieval_ms + generation_ms,
            ctx_chars,
            top_k: self.config.top_k,
        })
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use ragrun_llm::mock::MockProvider;
    use ragrun_memory::InMemoryVectorStore;

    use super::*;

    fn buffers() -> Outputs<Vec<u8>, Vec<u8>> {
        Outputs {
            answers: AnswerLog::new(Vec::new(), "answers"),
            report: MetricsReport::new(Vec::new(), "report", true).unwrap(),
        }
    }

    fn split(outputs: Outputs<Vec<u8>, Vec<u8>>) -> (String, String) {
        (
            String::from_utf8(outputs.answers.into_inner()).unwrap(),
            String::from_utf8(outputs.report.into_inner()).unwrap(),
        )
    }

    fn pipeline(mock: MockProvider, top_k: usize) -> Pipeline<MockProvider> {
        let config = PipelineConfig {
            chunk_size_words: 4,
            top_k,
            ..PipelineConfig::default()
        };
        Pipeline::new(config, Arc::new(mock), Arc::new(InMemoryVectorStore::new()))
    }

    #[tokio::test]
    async fn nearest_chunk_becomes_sole_context() {
        let mock = MockProvider::with_responses(vec!["It is A.".into()])
            .with_embedding("A B C D", vec![1.0, 0.0])
            .with_embedding("E F G H", vec![0.0, 1.0])
            .with_embedding("Which letters?", vec![0.9, 0.1]);
        let recorder = mock.clone();
        let p = pipeline(mock, 1);
        let mut outputs = buffers();

        let summary = p
            .run("A B C D E F G H", &["Which letters?".into()], &mut outputs)
            .await
            .unwrap();
        assert_eq!(summary.chunks_indexed, 2);
        assert_eq!(summary.answered, 1);

        let prompts = recorder.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("information:\nA B C D\n\n\nQuestion: Which letters?"));
        assert!(!prompts[0].contains("E F G H"));

        let (log, csv) = split(outputs);
        assert!(log.contains("Answer:\nIt is A.\n"));
        assert!(log.contains("ctx_chars=8, top_k=1"));
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",\"Which letters?\",8,1,8,"));
        assert!(row.ends_with(','));
    }

    #[tokio::test]
    async fn failed_question_is_isolated() {
        let mock = MockProvider::with_responses(vec!["first".into(), "third".into()])
            .failing_embed_for("Q2");
        let p = pipeline(mock, 3);
        let mut outputs = buffers();
        let questions = vec!["Q1".to_owned(), "Q2".to_owned(), "Q3".to_owned()];

        let summary = p
            .run("some knowledge text here", &questions, &mut outputs)
            .await
            .unwrap();
        assert_eq!(summary.questions, 3);
        assert_eq!(summary.answered, 2);
        assert_eq!(summary.failed, 1);

        let (log, csv) = split(outputs);
        let q1 = log.find("Question:\nQ1").unwrap();
        let q2 = log.find("ERROR while processing question: Q2 -> ").unwrap();
        let q3 = log.find("Question:\nQ3").unwrap();
        assert!(q1 < q2 && q2 < q3);

        let rows: Vec<_> = csv.lines().skip(1).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].ends_with(",\"Q2\",0,3,0,0,0,0,ERROR"));
        assert!(rows[2].contains(",\"Q3\",5,"));
    }

    #[tokio::test]
    async fn generation_failure_is_recorded() {
        let p = pipeline(MockProvider::failing(), 3);
        let mut outputs = buffers();
        let summary = p
            .run("knowledge", &["Q".into()], &mut outputs)
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        let (log, _) = split(outputs);
        assert!(log.starts_with("ERROR while processing question: Q -> generation failed"));
    }

    #[tokio::test]
    async fn blank_questions_are_skipped() {
        let p = pipeline(MockProvider::default(), 3);
        let mut outputs = buffers();
        let summary = p
            .run(
                "knowledge",
                &["  ".into(), " real? ".into(), String::new()],
                &mut outputs,
            )
            .await
            .unwrap();
        assert_eq!(summary.questions, 1);
        let (log, _) = split(outputs);
        assert!(log.starts_with("Question:\nreal?\n"));
    }

    #[tokio::test]
    async fn ingestion_failure_processes_no_question() {
        let mock = MockProvider::default().failing_embed_for("knowledge");
        let recorder = mock.clone();
        let p = pipeline(mock, 3);
        let mut outputs = buffers();

        let err = p
            .run("knowledge", &["Q1".into()], &mut outputs)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Index(_)));
        assert!(recorder.prompts().is_empty());

        let (log, csv) = split(outputs);
        assert!(log.is_empty());
        assert_eq!(csv, format!("{REPORT_HEADER}\n"));
    }

    #[tokio::test]
    async fn rerun_on_shared_store_keeps_one_entry_per_chunk() {
        let mock = MockProvider::default()
            .with_embedding("A B C D", vec![1.0, 0.0])
            .with_embedding("E F G H", vec![0.0, 1.0])
            .with_embedding("q", vec![1.0, 0.0]);
        let recorder = mock.clone();
        let store = Arc::new(InMemoryVectorStore::new());
        let config = PipelineConfig {
            chunk_size_words: 4,
            top_k: 2,
            ..PipelineConfig::default()
        };
        let p = Pipeline::new(config.clone(), Arc::new(mock), store.clone());

        for _ in 0..2 {
            let mut outputs = buffers();
            p.run("A B C D E F G H", &["q".into()], &mut outputs)
                .await
                .unwrap();
        }
        assert_eq!(store.len(&config.collection), 2);

        let prompts = recorder.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("information:\nA B C D\nE F G H\n\n\nQuestion: q"));
    }

    #[tokio::test]
    async fn provider_without_embeddings_is_fatal() {
        let mut mock = MockProvider::default();
        mock.supports_embeddings = false;
        let recorder = mock.clone();
        let p = pipeline(mock, 3);
        let mut outputs = buffers();

        let err = p
            .run("knowledge", &["Q".into()], &mut outputs)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::EmbeddingUnsupported { ref provider } if provider == "mock"
        ));
        assert!(recorder.prompts().is_empty());
        let (log, _) = split(outputs);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn empty_knowledge_is_invalid_input() {
        let p = pipeline(MockProvider::default(), 3);
        let mut outputs = buffers();
        let err = p.run("   ", &["Q".into()], &mut outputs).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn latency_parts_sum_to_total() {
        let mock = MockProvider::default().with_delay(15);
        let p = pipeline(mock, 2);
        let mut outputs = buffers();
        p.run("a b c d e f", &["x".into(), "y".into()], &mut outputs)
            .await
            .unwrap();

        let (_, csv) = split(outputs);
        for row in csv.lines().skip(1) {
            let fields: Vec<u64> = row
                .rsplit(',')
                .skip(1)
                .take(3)
                .map(|f| f.parse().unwrap())
                .collect();
            let (total, generation, retrieval) = (fields[0], fields[1], fields[2]);
            assert_eq!(retrieval + generation, total);
            assert!(generation >= 15);
        }
    }

    #[test]
    fn config_from_settings() {
        let mut config = Config::default();
        config.pipeline.top_k = 9;
        config.vector_store.collection = "docs".into();
        let pc = PipelineConfig::from(&config);
        assert_eq!(pc.top_k, 9);
        assert_eq!(pc.collection, "docs");
        assert_eq!(pc.chunk_size_words, 150);

        let paths = PipelinePaths::from(&config);
        assert_eq!(paths.report, PathBuf::from("report.csv"));
    }
}

use std::path::Path;
use std::sync::Arc;

use ragrun_core::PipelineError;
use ragrun_core::pipeline::{Pipeline, PipelineConfig, PipelinePaths, REPORT_HEADER};
use ragrun_llm::any::AnyProvider;
use ragrun_llm::mock::MockProvider;
use ragrun_memory::InMemoryVectorStore;
use tempfile::TempDir;

const SEPARATOR: &str = "-----------------------------------------------------";

fn paths(dir: &Path) -> PipelinePaths {
    PipelinePaths {
        knowledge: dir.join("knowledge.txt"),
        questions: dir.join("questions.txt"),
        answers: dir.join("answers.txt"),
        report: dir.join("report.csv"),
    }
}

fn setup(knowledge: &str, questions: &str) -> (TempDir, PipelinePaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    std::fs::write(&paths.knowledge, knowledge).unwrap();
    std::fs::write(&paths.questions, questions).unwrap();
    (dir, paths)
}

fn pipeline(mock: MockProvider, config: PipelineConfig) -> Pipeline<AnyProvider> {
    Pipeline::new(
        config,
        Arc::new(AnyProvider::Mock(mock)),
        Arc::new(InMemoryVectorStore::new()),
    )
}

fn small_chunks() -> PipelineConfig {
    PipelineConfig {
        chunk_size_words: 4,
        top_k: 1,
        ..PipelineConfig::default()
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn full_run_writes_answer_log_and_report() {
    let (_dir, paths) = setup("A B C D E F G H", "What comes first?\n\n");
    let mock = MockProvider::with_responses(vec!["A does.".into()])
        .with_embedding("A B C D", vec![1.0, 0.0])
        .with_embedding("E F G H", vec![0.0, 1.0])
        .with_embedding("What comes first?", vec![0.8, 0.2]);
    let recorder = mock.clone();

    let summary = pipeline(mock, small_chunks())
        .run_files(&paths)
        .await
        .unwrap();
    assert_eq!(summary.chunks_indexed, 2);
    assert_eq!(summary.questions, 1);
    assert_eq!(summary.answered, 1);

    assert_eq!(
        recorder.prompts(),
        vec![
            "You are a knowledgeable assistant. Answer only using the following information:\n\
             A B C D\n\n\nQuestion: What comes first?\nAnswer:"
        ]
    );

    let log = read(&paths.answers);
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some("Question:"));
    assert_eq!(lines.next(), Some("What comes first?"));
    assert_eq!(lines.next(), Some("Answer:"));
    assert_eq!(lines.next(), Some("A does."));
    let stats = lines.next().unwrap();
    assert!(stats.starts_with("Stats: retrieval="));
    assert!(stats.ends_with("ctx_chars=8, top_k=1"));
    assert_eq!(lines.next(), Some(SEPARATOR));
    assert_eq!(lines.next(), None);

    let csv = read(&paths.report);
    let rows: Vec<_> = csv.lines().collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], REPORT_HEADER);
    assert!(rows[1].starts_with('"'));
    assert!(rows[1].contains(",\"What comes first?\",7,1,8,"));
}

#[tokio::test]
async fn retrieval_failure_on_second_question_is_recorded() {
    let (_dir, paths) = setup("alpha beta gamma delta", "Q1\nQ2\n");
    let mock = MockProvider::with_responses(vec!["answer one".into()]).failing_embed_for("Q2");

    let summary = pipeline(mock, small_chunks())
        .run_files(&paths)
        .await
        .unwrap();
    assert_eq!(summary.answered, 1);
    assert_eq!(summary.failed, 1);

    let log = read(&paths.answers);
    let blocks: Vec<_> = log.split(&format!("{SEPARATOR}\n")).collect();
    assert_eq!(blocks.len(), 3);
    assert!(blocks[0].starts_with("Question:\nQ1\nAnswer:\nanswer one\n"));
    assert!(blocks[1].starts_with("ERROR while processing question: Q2 -> query embedding failed"));
    assert!(blocks[2].is_empty());

    let csv = read(&paths.report);
    let rows: Vec<_> = csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].ends_with(','));
    assert!(rows[1].ends_with(",\"Q2\",0,1,0,0,0,0,ERROR"));
}

#[tokio::test]
async fn truncate_on_start_keeps_only_current_run() {
    let (_dir, paths) = setup("one two three", "Only question\n");
    std::fs::write(&paths.answers, "stale answer\n").unwrap();
    let stale_report = format!("{REPORT_HEADER}\n\"old\",\"old\",1,1,1,1,1,2,\n");
    std::fs::write(&paths.report, stale_report).unwrap();

    pipeline(MockProvider::default(), small_chunks())
        .run_files(&paths)
        .await
        .unwrap();

    let log = read(&paths.answers);
    assert!(!log.contains("stale"));
    assert!(log.starts_with("Question:\nOnly question\n"));

    let csv = read(&paths.report);
    assert_eq!(csv.lines().count(), 2);
    assert!(!csv.contains("\"old\""));
}

#[tokio::test]
async fn append_mode_accumulates_runs() {
    let (_dir, paths) = setup("one two three", "Q\n");
    let config = PipelineConfig {
        truncate_outputs_on_start: false,
        ..small_chunks()
    };

    for _ in 0..2 {
        pipeline(MockProvider::default(), config.clone())
            .run_files(&paths)
            .await
            .unwrap();
    }

    let csv = read(&paths.report);
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], REPORT_HEADER);
    assert_eq!(
        csv.matches(REPORT_HEADER).count(),
        1,
        "header written once"
    );
    assert_eq!(read(&paths.answers).matches("Question:\nQ\n").count(), 2);
}

#[tokio::test]
async fn latency_parts_sum_to_total() {
    let (_dir, paths) = setup("a b c d e f g h", "first\nsecond\nthird\n");
    let mock = MockProvider::default().with_delay(5);

    pipeline(mock, small_chunks())
        .run_files(&paths)
        .await
        .unwrap();

    let csv = read(&paths.report);
    for row in csv.lines().skip(1) {
        let fields: Vec<&str> = row.rsplitn(5, ',').collect();
        let total: u64 = fields[1].parse().unwrap();
        let generation: u64 = fields[2].parse().unwrap();
        let retrieval: u64 = fields[3].parse().unwrap();
        assert_eq!(retrieval + generation, total);
    }

    let log = read(&paths.answers);
    for stats in log.lines().filter(|l| l.starts_with("Stats: ")) {
        let nums: Vec<u64> = stats
            .split(['=', ' '])
            .filter_map(|t| t.trim_end_matches(',').parse().ok())
            .collect();
        assert_eq!(nums[0] + nums[1], nums[2]);
    }
}

#[tokio::test]
async fn ingestion_failure_is_fatal_and_processes_no_question() {
    let (_dir, paths) = setup("alpha beta", "Q1\nQ2\n");
    let mock = MockProvider::default().failing_embed_for("alpha beta");
    let recorder = mock.clone();

    let err = pipeline(mock, small_chunks())
        .run_files(&paths)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Index(_)));
    assert!(recorder.prompts().is_empty());
    assert_eq!(read(&paths.answers), "");
    assert_eq!(read(&paths.report), format!("{REPORT_HEADER}\n"));
}

#[tokio::test]
async fn empty_knowledge_is_fatal() {
    let (_dir, paths) = setup("  \n\t", "Q1\n");
    let err = pipeline(MockProvider::default(), small_chunks())
        .run_files(&paths)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert_eq!(read(&paths.answers), "");
}

#[tokio::test]
async fn missing_questions_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    std::fs::write(&paths.knowledge, "some text").unwrap();

    let err = pipeline(MockProvider::default(), small_chunks())
        .run_files(&paths)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
}

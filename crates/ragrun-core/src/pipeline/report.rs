//! Answer log and metrics CSV writers.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::PipelineError;

pub const REPORT_HEADER: &str = "timestamp,question,answer_length,top_k,ctx_chars,retrieval_ms,generation_ms,total_ms,manual_relevance";

const SEPARATOR: &str = "-----------------------------------------------------";

const ERROR_MARKER: &str = "ERROR";

/// Outcome of a successfully answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub timestamp: String,
    pub question: String,
    pub answer: String,
    pub retrieval_ms: u64,
    pub generation_ms: u64,
    pub total_ms: u64,
    pub ctx_chars: usize,
    pub top_k: usize,
}

/// Outcome of a question that failed during retrieval or generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub timestamp: String,
    pub question: String,
    pub error: String,
    pub top_k: usize,
}

/// One line of the metrics report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsRow<'a> {
    pub timestamp: &'a str,
    pub question: &'a str,
    pub answer_length: usize,
    pub top_k: usize,
    pub ctx_chars: usize,
    pub retrieval_ms: u64,
    pub generation_ms: u64,
    pub total_ms: u64,
    pub manual_relevance: Option<&'static str>,
}

impl<'a> From<&'a AnswerRecord> for MetricsRow<'a> {
    fn from(r: &'a AnswerRecord) -> Self {
        Self {
            timestamp: &r.timestamp,
            question: &r.question,
            answer_length: r.answer.chars().count(),
            top_k: r.top_k,
            ctx_chars: r.ctx_chars,
            retrieval_ms: r.retrieval_ms,
            generation_ms: r.generation_ms,
            total_ms: r.total_ms,
            manual_relevance: None,
        }
    }
}

impl<'a> From<&'a ErrorRecord> for MetricsRow<'a> {
    fn from(r: &'a ErrorRecord) -> Self {
        Self {
            timestamp: &r.timestamp,
            question: &r.question,
            answer_length: 0,
            top_k: r.top_k,
            ctx_chars: 0,
            retrieval_ms: 0,
            generation_ms: 0,
            total_ms: 0,
            manual_relevance: Some(ERROR_MARKER),
        }
    }
}

/// Wrap in double quotes, doubling any embedded quote.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

impl fmt::Display for MetricsRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{},{}",
            quoted(self.timestamp),
            quoted(self.question),
            self.answer_length,
            self.top_k,
            self.ctx_chars,
            self.retrieval_ms,
            self.generation_ms,
            self.total_ms,
            self.manual_relevance.unwrap_or_default()
        )
    }
}

/// Human-readable per-question log.
pub struct AnswerLog<W: Write> {
    writer: W,
    name: String,
}

impl<W: Write> AnswerLog<W> {
    #[must_use]
    pub fn new(writer: W, name: impl Into<String>) -> Self {
        Self {
            writer,
            name: name.into(),
        }
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if writing or flushing fails.
    pub fn write_answer(&mut self, record: &AnswerRecord) -> Result<(), PipelineError> {
        let result = writeln!(
            self.writer,
            "Question:\n{}\nAnswer:\n{}\nStats: retrieval={} ms, generation={} ms, total={} ms, ctx_chars={}, top_k={}\n{SEPARATOR}",
            record.question,
            record.answer,
            record.retrieval_ms,
            record.generation_ms,
            record.total_ms,
            record.ctx_chars,
            record.top_k,
        )
        .and_then(|()| self.writer.flush());
        result.map_err(|e| PipelineError::io(&self.name, e))
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if writing or flushing fails.
    pub fn write_error(&mut self, record: &ErrorRecord) -> Result<(), PipelineError> {
        let result = writeln!(
            self.writer,
            "ERROR while processing question: {} -> {}\n{SEPARATOR}",
            record.question, record.error,
        )
        .and_then(|()| self.writer.flush());
        result.map_err(|e| PipelineError::io(&self.name, e))
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// CSV metrics report, one row per question.
pub struct MetricsReport<W: Write> {
    writer: W,
    name: String,
}

impl<W: Write> MetricsReport<W> {
    /// Wrap `writer`, emitting the header line first when `write_header` is set.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the header cannot be written.
    pub fn new(
        mut writer: W,
        name: impl Into<String>,
        write_header: bool,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if write_header {
            writeln!(writer, "{REPORT_HEADER}")
                .and_then(|()| writer.flush())
                .map_err(|e| PipelineError::io(&name, e))?;
        }
        Ok(Self { writer, name })
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if writing or flushing fails.
    pub fn write_row(&mut self, row: &MetricsRow<'_>) -> Result<(), PipelineError> {
        writeln!(self.writer, "{row}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| PipelineError::io(&self.name, e))
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Both run outputs, written together per question.
pub struct Outputs<A: Write, R: Write> {
    pub answers: AnswerLog<A>,
    pub report: MetricsReport<R>,
}

impl<A: Write, R: Write> Outputs<A, R> {
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if either output fails.
    pub fn record_answer(&mut self, record: &AnswerRecord) -> Result<(), PipelineError> {
        self.answers.write_answer(record)?;
        self.report.write_row(&MetricsRow::from(record))
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if either output fails.
    pub fn record_error(&mut self, record: &ErrorRecord) -> Result<(), PipelineError> {
        self.answers.write_error(record)?;
        self.report.write_row(&MetricsRow::from(record))
    }
}

pub type FileOutputs = Outputs<BufWriter<File>, BufWriter<File>>;

/// Open the answer log and metrics report on disk.
///
/// With `truncate` both files are recreated (the report holds only its header). Otherwise
/// they are opened for append and the header is written only if the report is new or empty.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if either file cannot be opened or the header cannot be written.
pub fn open_outputs(
    answers_path: &Path,
    report_path: &Path,
    truncate: bool,
) -> Result<FileOutputs, PipelineError> {
    let answers = open_file(answers_path, truncate)?;
    let report = open_file(report_path, truncate)?;
    let report_is_empty = report
        .metadata()
        .map_err(|e| PipelineError::io(report_path, e))?
        .len()
        == 0;

    Ok(Outputs {
        answers: AnswerLog::new(
            BufWriter::new(answers),
            answers_path.display().to_string(),
        ),
        report: MetricsReport::new(
            BufWriter::new(report),
            report_path.display().to_string(),
            report_is_empty,
        )?,
    })
}

fn open_file(path: &Path, truncate: bool) -> Result<File, PipelineError> {
    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path).map_err(|e| PipelineError::io(path, e))
}

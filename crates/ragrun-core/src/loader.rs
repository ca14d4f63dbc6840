//! Reading the knowledge document and the question list.

use std::path::Path;

use crate::error::PipelineError;

/// Read the knowledge document, refusing files larger than `max_bytes` or without text.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be read and
/// [`PipelineError::InvalidInput`] if it is oversize or blank.
pub async fn read_knowledge(path: &Path, max_bytes: u64) -> Result<String, PipelineError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    if meta.len() > max_bytes {
        return Err(PipelineError::InvalidInput(format!(
            "knowledge file {} is {} bytes, limit is {max_bytes}",
            path.display(),
            meta.len()
        )));
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    if text.trim().is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "knowledge file {} is empty",
            path.display()
        )));
    }
    Ok(text)
}

/// Trimmed non-empty lines of `text`, in order.
#[must_use]
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_owned)
        .collect()
}

/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be read.
pub async fn read_questions(path: &Path) -> Result<Vec<String>, PipelineError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    Ok(parse_questions(&text))
}

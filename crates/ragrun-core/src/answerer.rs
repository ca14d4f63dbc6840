//! Prompt assembly and single-shot generation.

use ragrun_llm::LlmProvider;

use crate::error::GenerationError;
use crate::retriever::RetrievedChunk;

/// Concatenate chunk texts in retrieval order, each followed by a newline.
#[must_use]
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    let mut context = String::with_capacity(chunks.iter().map(|c| c.text.len() + 1).sum());
    for chunk in chunks {
        context.push_str(&chunk.text);
        context.push('\n');
    }
    context
}

#[must_use]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a knowledgeable assistant. Answer only using the following information:\n{context}\n\nQuestion: {question}\nAnswer:"
    )
}

/// Ask `llm` to answer `question` from `context`. One call, no retry.
///
/// # Errors
///
/// Returns [`GenerationError::Llm`] if the provider fails and
/// [`GenerationError::EmptyResponse`] if the trimmed answer is empty.
pub async fn answer<P: LlmProvider>(
    question: &str,
    context: &str,
    llm: &P,
) -> Result<String, GenerationError> {
    let prompt = build_prompt(context, question);
    let raw = llm.generate(&prompt).await?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(trimmed.to_owned())
}

//! Query-time lookup: embed the question and rank the nearest chunks.

use ragrun_llm::provider::EmbedFn;
use ragrun_memory::VectorStore;

use crate::error::RetrievalError;

/// A chunk returned for a query, ranked from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub rank: usize,
    pub text: String,
    pub score: f32,
}

/// Fetch at most `k` chunks for `query`, in the order the store reports them.
///
/// Hits without a string `content` payload are dropped.
///
/// # Errors
///
/// Returns [`RetrievalError`] if embedding the query or searching the store fails.
pub async fn retrieve(
    query: &str,
    embed_fn: &EmbedFn,
    store: &dyn VectorStore,
    collection: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>, RetrievalError> {
    if k == 0 {
        return Ok(Vec::new());
    }

    let vector = embed_fn(query).await.map_err(RetrievalError::Embedding)?;
    let hits = store
        .search(collection, vector, u64::try_from(k).unwrap_or(u64::MAX))
        .await
        .map_err(RetrievalError::Store)?;

    let chunks: Vec<RetrievedChunk> = hits
        .iter()
        .filter_map(|hit| {
            let text = hit.payload_str("content");
            if text.is_none() {
                tracing::debug!(id = %hit.id, "search hit without content payload");
            }
            text.map(|t| (t.to_owned(), hit.score))
        })
        .take(k)
        .enumerate()
        .map(|(i, (text, score))| RetrievedChunk {
            rank: i + 1,
            text,
            score,
        })
        .collect();

    Ok(chunks)
}

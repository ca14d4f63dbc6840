//! Ingestion: embed every chunk and insert it into the vector store.

use std::collections::HashMap;

use ragrun_llm::provider::EmbedFn;
use ragrun_memory::{VectorPoint, VectorStore};

use crate::chunker::Chunk;
use crate::error::IndexError;

/// Embed each chunk and upsert it into `collection`, returning the number inserted.
///
/// The collection is created with the dimension of the first embedding. Blank chunks are
/// skipped. Point ids are derived from the collection, chunk index and text, so indexing the
/// same document again overwrites its entries instead of duplicating them. The first
/// embedding or store failure aborts ingestion; entries already inserted are left in place.
///
/// # Errors
///
/// Returns [`IndexError`] naming the chunk that failed.
pub async fn index<I>(
    chunks: I,
    embed_fn: &EmbedFn,
    store: &dyn VectorStore,
    collection: &str,
) -> Result<usize, IndexError>
where
    I: IntoIterator<Item = Chunk>,
{
    let mut inserted = 0usize;
    let mut collection_ready = false;

    for chunk in chunks {
        if chunk.text.trim().is_empty() {
            continue;
        }
        let chunk_index = chunk.index;

        let vector = embed_fn(chunk.text.as_str())
            .await
            .map_err(|source| IndexError::Embedding {
                chunk_index,
                source,
            })?;

        if !collection_ready {
            let vector_size = u64::try_from(vector.len()).unwrap_or(u64::MAX);
            store
                .ensure_collection(collection, vector_size)
                .await
                .map_err(|source| IndexError::Store {
                    chunk_index,
                    source,
                })?;
            collection_ready = true;
        }

        let id = point_id(collection, &chunk);
        let payload = HashMap::from([
            ("content".to_owned(), serde_json::json!(chunk.text)),
            ("chunk_index".to_owned(), serde_json::json!(chunk_index)),
        ]);
        let point = VectorPoint {
            id,
            vector,
            payload,
        };
        store
            .upsert(collection, vec![point])
            .await
            .map_err(|source| IndexError::Store {
                chunk_index,
                source,
            })?;

        inserted += 1;
        tracing::debug!(chunk_index, "chunk indexed");
    }

    Ok(inserted)
}

fn point_id(collection: &str, chunk: &Chunk) -> String {
    let key = format!("{collection}:{}:{}", chunk.index, chunk.text);
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

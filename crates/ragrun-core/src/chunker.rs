//! Fixed-size word chunking of the knowledge document.

use std::str::SplitWhitespace;

use crate::error::PipelineError;

/// One contiguous span of the document, `size_words` words at most.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position in the document.
    pub index: usize,
    pub text: String,
}

/// Lazy iterator over the chunks of a document.
///
/// Cloning yields an independent pass starting from the current position.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    words: SplitWhitespace<'a>,
    size_words: usize,
    next_index: usize,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let mut text = String::new();
        for word in self.words.by_ref().take(self.size_words) {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
        if text.is_empty() {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(Chunk { index, text })
    }
}

/// Split `text` into chunks of exactly `size_words` words, the last one possibly shorter.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if `text` has no words or `size_words` is zero.
pub fn chunk(text: &str, size_words: usize) -> Result<Chunks<'_>, PipelineError> {
    if size_words == 0 {
        return Err(PipelineError::InvalidInput(
            "chunk size must be at least one word".into(),
        ));
    }
    if text.trim().is_empty() {
        return Err(PipelineError::InvalidInput(
            "knowledge document is empty".into(),
        ));
    }
    Ok(Chunks {
        words: text.split_whitespace(),
        size_words,
        next_index: 0,
    })
}

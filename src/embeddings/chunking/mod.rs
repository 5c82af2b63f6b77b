#[cfg(test)]
mod tests;

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::{RagError, Result};

/// A chunk of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk within its document
    pub index: usize,
    /// Whitespace-normalized chunk text
    pub text: String,
    /// Number of words in `text`
    pub word_count: usize,
    /// Leading words of `text` repeated from the tail of the previous chunk
    pub overlap_words: usize,
}

impl Chunk {
    /// The chunk text without the words carried over from the previous chunk
    #[inline]
    pub fn fresh_text(&self) -> String {
        self.text
            .split_whitespace()
            .skip(self.overlap_words)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Configuration for document chunking. All sizes are in words and always given
/// explicitly; the configured defaults live in `config::settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Upper bound for a chunk unless a single sentence is longer
    pub max_chunk_size: usize,
    /// A final buffer smaller than this is folded into the previous chunk
    pub min_chunk_size: usize,
    /// Words carried from the end of one chunk to the start of the next
    pub overlap: usize,
}

impl ChunkingConfig {
    #[inline]
    pub fn new(max_chunk_size: usize, min_chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            max_chunk_size,
            min_chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(RagError::InvalidInput(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(RagError::InvalidInput(format!(
                "min_chunk_size ({}) exceeds max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            )));
        }
        if self.overlap >= self.max_chunk_size {
            return Err(RagError::InvalidInput(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// Count whitespace-separated words
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentences, each reduced to its words
#[inline]
pub fn split_sentences(text: &str) -> Vec<Vec<&str>> {
    text.unicode_sentences()
        .map(|sentence| sentence.split_whitespace().collect::<Vec<_>>())
        .filter(|words| !words.is_empty())
        .collect()
}

#[derive(Default)]
struct Buffer<'a> {
    words: Vec<&'a str>,
    seed_len: usize,
}

impl<'a> Buffer<'a> {
    fn seeded(seed: &[&'a str]) -> Self {
        Self {
            words: seed.to_vec(),
            seed_len: seed.len(),
        }
    }

    fn into_chunk(self, index: usize) -> Chunk {
        Chunk {
            index,
            word_count: self.words.len(),
            text: self.words.join(" "),
            overlap_words: self.seed_len,
        }
    }
}

/// Split document text into overlapping, size-bounded chunks.
///
/// Sentences are never split. A sentence that would push the current buffer past
/// `max_chunk_size` always closes the buffer first, so before the final chunk only a
/// single sentence longer than `max_chunk_size` produces an oversized chunk. A buffer
/// closed that way can be shorter than `min_chunk_size` when the sentence after it is
/// long. A trailing buffer below `min_chunk_size` is folded back into the previous
/// chunk.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut buffer = Buffer::default();

    for sentence in sentences {
        let would_overflow = buffer.words.len() + sentence.len() > config.max_chunk_size;
        if would_overflow && !buffer.words.is_empty() {
            if buffer.words.len() < config.min_chunk_size {
                debug!(
                    "Closing a {}-word buffer ahead of a {}-word sentence",
                    buffer.words.len(),
                    sentence.len()
                );
            }

            // Keep the seeded chunk within bounds when the sentence itself fits.
            let room = config.max_chunk_size.saturating_sub(sentence.len());
            let seed_len = config.overlap.min(buffer.words.len()).min(room);
            let seed_start = buffer.words.len() - seed_len;
            let next = Buffer::seeded(&buffer.words[seed_start..]);

            let closed = std::mem::replace(&mut buffer, next);
            chunks.push(closed.into_chunk(chunks.len()));
        }
        buffer.words.extend(sentence);
    }

    finish(&mut chunks, buffer, config);

    debug!(
        "Chunked {} words into {} chunks",
        chunks.iter().map(|c| c.word_count - c.overlap_words).sum::<usize>(),
        chunks.len()
    );

    Ok(chunks)
}

// A trailing buffer under the minimum is folded into the previous chunk, which then
// becomes the final chunk and may exceed the maximum by fewer than min_chunk_size words.
fn finish(chunks: &mut Vec<Chunk>, buffer: Buffer<'_>, config: &ChunkingConfig) {
    if buffer.words.len() <= buffer.seed_len {
        return;
    }

    if buffer.words.len() >= config.min_chunk_size {
        chunks.push(buffer.into_chunk(chunks.len()));
        return;
    }

    match chunks.last_mut() {
        Some(previous) => {
            let fresh = &buffer.words[buffer.seed_len..];
            previous.text.push(' ');
            previous.text.push_str(&fresh.join(" "));
            previous.word_count += fresh.len();
        }
        None => chunks.push(buffer.into_chunk(0)),
    }
}

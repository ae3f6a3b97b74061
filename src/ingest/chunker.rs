use crate::error::{AskblogError, Result};
use crate::ingest::Document;

/// A contiguous window of a document's text, with provenance for attribution.
///
/// Transient: exists only while the vector index is being built.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source_url: String,
}

/// Split documents into overlapping character windows.
///
/// Every chunk is at most `chunk_size` characters long and, after the first,
/// re-starts exactly `chunk_overlap` characters before the previous chunk's
/// end, so the boundary region of consecutive chunks is character-identical.
/// Window ends prefer a nearby whitespace or sentence boundary over a hard
/// mid-word cut. Each chunk inherits its document's source URL.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for doc in documents {
        for text in split_text(&doc.text, chunk_size, chunk_overlap)? {
            chunks.push(Chunk {
                text,
                source_url: doc.url.clone(),
            });
        }
    }
    Ok(chunks)
}

/// Split one text into overlapping windows, counted in characters.
///
/// All slicing happens on character boundaries, so multi-byte UTF-8 content
/// is safe.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(AskblogError::Config(
            "chunk_size must be greater than 0".to_string(),
        ));
    }
    if chunk_overlap >= chunk_size {
        return Err(AskblogError::Config(
            "chunk_overlap must be less than chunk_size".to_string(),
        ));
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char, plus the end of the text, so char-indexed
    // windows can slice without scanning.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = offsets.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + chunk_size).min(total_chars);
        let end = if hard_end < total_chars {
            natural_break(text, &offsets, start, hard_end, chunk_size, chunk_overlap)
        } else {
            hard_end
        };

        chunks.push(text[offsets[start]..offsets[end]].to_string());

        if end >= total_chars {
            break;
        }
        start = end - chunk_overlap;
    }

    Ok(chunks)
}

/// Pick a window end at a whitespace or sentence boundary if one exists in
/// the last fifth of the window; otherwise cut at `hard_end`.
///
/// The break never moves below `start + chunk_overlap + 1`, which keeps the
/// next window strictly advancing.
fn natural_break(
    text: &str,
    offsets: &[usize],
    start: usize,
    hard_end: usize,
    chunk_size: usize,
    chunk_overlap: usize,
) -> usize {
    let floor = (start + chunk_overlap + 1).max(hard_end.saturating_sub(chunk_size / 5));
    if floor >= hard_end {
        return hard_end;
    }

    for end in (floor..=hard_end).rev() {
        let prev_char = text[offsets[end - 1]..offsets[end]]
            .chars()
            .next()
            .unwrap_or(' ');
        if prev_char.is_whitespace() || matches!(prev_char, '.' | '!' | '?') {
            return end;
        }
    }
    hard_end
}

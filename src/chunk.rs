//! Text normalization and chunking for the speech command.
//!
//! The speech process receives each chunk as a single command-line argument,
//! so chunks are length-bounded and packed on word boundaries.

/// Collapse runs of whitespace (including newlines from PDF extraction) into
/// single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into chunks of at most `max_chars` without breaking words.
///
/// Words are packed greedily, joined by single spaces; a chunk is closed as
/// soon as the next word would not fit. A single word longer than `max_chars`
/// is kept whole and becomes an oversized chunk on its own.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + word.len() + 1 <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            chunks.push(current);
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

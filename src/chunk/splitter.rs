//! Boundary-aware splitting of a document into overlapping windows.

use anyhow::{ensure, Result};

/// One bounded window of the source document.
///
/// `start` and `end` are byte offsets into the document, always on char
/// boundaries. Indexes ascend from zero and adjacent chunks overlap by up
/// to the configured overlap so each chunk keeps enough trailing context
/// from its predecessor to be transformed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Validated splitting parameters.
#[derive(Debug, Clone, Copy)]
pub struct SplitterConfig {
    max_chunk_size: usize,
    overlap: usize,
}

impl SplitterConfig {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Result<Self> {
        ensure!(max_chunk_size > 0, "max_chunk_size must be positive");
        ensure!(
            overlap < max_chunk_size,
            "overlap ({overlap}) must be smaller than max_chunk_size ({max_chunk_size})"
        );
        Ok(Self {
            max_chunk_size,
            overlap,
        })
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Split `document` into ordered, overlapping chunks of at most
/// `max_chunk_size` bytes.
///
/// Cuts prefer, in order: a paragraph break, a sentence end, any
/// whitespace — all searched backwards from the hard limit — and fall back
/// to a hard cut only when the window contains none. The chunks cover the
/// whole document with no gaps; the final chunk always ends exactly at the
/// document's end. An empty document yields no chunks.
pub fn split(document: &str, config: &SplitterConfig) -> Vec<Chunk> {
    let len = document.len();
    if len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let hard_end = floor_char_boundary(document, (start + config.max_chunk_size).min(len));
        let mut end = if hard_end >= len {
            len
        } else {
            find_break(document, start, hard_end)
        };
        // A window narrower than one char can only happen with pathological
        // configs; still make progress.
        if end <= start {
            end = ceil_char_boundary(document, (start + 1).min(len));
        }

        chunks.push(Chunk {
            index,
            start,
            end,
            text: document[start..end].to_string(),
        });

        if end == len {
            break;
        }

        index += 1;
        let mut next = end.saturating_sub(config.overlap);
        if next <= start {
            next = start + 1;
        }
        start = ceil_char_boundary(document, next);
    }

    chunks
}

/// Best cut point in `document[start..limit]`, searching backwards from the
/// hard limit. Every returned cut is strictly past `start`.
fn find_break(document: &str, start: usize, limit: usize) -> usize {
    let window = &document[start..limit];

    // Paragraph break: cut after the blank line.
    if let Some(pos) = window.rfind("\n\n") {
        return start + pos + 2;
    }

    // Sentence end: punctuation followed by whitespace.
    let sentence = [". ", ".\n", "! ", "!\n", "? ", "?\n"]
        .iter()
        .filter_map(|pat| window.rfind(pat))
        .max();
    if let Some(pos) = sentence {
        return start + pos + 2;
    }

    if let Some(pos) = window.rfind('\n') {
        return start + pos + 1;
    }

    // Any whitespace: cut after it.
    if let Some((pos, ws)) = window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
    {
        return start + pos + ws.len_utf8();
    }

    limit
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

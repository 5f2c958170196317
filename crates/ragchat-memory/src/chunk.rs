use ragchat_core::{RagError, RagResult};
use serde::{Deserialize, Serialize};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A contiguous segment of the source text.
///
/// `text` is exactly `source[start..end]` (byte offsets), so consecutive
/// chunks share a region that is a suffix of the first and a prefix of the
/// second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of the chunk in the sequence produced for one text.
    pub index: usize,
    /// The chunk text.
    pub text: String,
    /// Byte offset of the first character in the source.
    pub start: usize,
    /// Byte offset one past the last character in the source.
    pub end: usize,
}

/// Line-oriented splitter with overlapping windows.
///
/// Windows end on the last line break that keeps them within `chunk_size`
/// characters, and each new window starts on a line break at most `overlap`
/// characters before the previous end. A line longer than the window is cut
/// at character boundaries into windows that step by `chunk_size - overlap`,
/// so adjacent pieces share exactly `overlap` characters.
///
/// A window holding only whitespace is folded into the preceding chunk (or
/// the following one at the start of the text), so chunk ranges stay
/// contiguous. Such chunks may exceed `chunk_size` by that whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Creates a chunker, rejecting a zero window or an overlap that is not
    /// smaller than the window.
    pub fn new(chunk_size: usize, overlap: usize) -> RagResult<Self> {
        if chunk_size == 0 {
            return Err(RagError::Chunking("chunk_size must be positive".into()));
        }
        if overlap >= chunk_size {
            return Err(RagError::Chunking(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum overlap between consecutive chunks in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into ordered chunks. Whitespace-only text yields none.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let layout = Layout::new(text);
        let len = layout.len();
        let mut chunks: Vec<Chunk> = Vec::new();
        // Byte start of a leading whitespace run not yet owned by a chunk.
        let mut pending: Option<usize> = None;
        let mut start = 0;

        loop {
            let limit = (start + self.chunk_size).min(len);
            let end = if limit == len {
                len
            } else {
                layout.last_boundary_in(start, limit).unwrap_or(limit)
            };

            let (from, to) = (layout.byte(start), layout.byte(end));
            if text[from..to].trim().is_empty() {
                match chunks.last_mut() {
                    Some(last) => {
                        last.end = to;
                        last.text = text[last.start..to].to_string();
                    }
                    None => {
                        if pending.is_none() {
                            pending = Some(from);
                        }
                    }
                }
            } else {
                let from = pending.take().unwrap_or(from);
                chunks.push(Chunk {
                    index: chunks.len(),
                    text: text[from..to].to_string(),
                    start: from,
                    end: to,
                });
            }

            if end == len {
                break;
            }
            start = self.next_start(&layout, start, end);
        }

        chunks
    }

    /// Character position where the window after `start..end` begins.
    ///
    /// Always greater than `start`, and the window opened there always
    /// reaches past `end`.
    fn next_start(&self, layout: &Layout, start: usize, end: usize) -> usize {
        let floor = end.saturating_sub(self.overlap).max(start + 1);
        if !layout.is_boundary(end) {
            // Cut inside an over-long line: plain stride.
            return floor;
        }
        let next_end = layout.first_boundary_after(end);
        if next_end - end > self.chunk_size {
            // The next line is cut on its own; it starts a fresh window.
            return end;
        }
        // Earliest line start inside the overlap that still leaves room for
        // the whole next line.
        let lowest = floor.max(next_end.saturating_sub(self.chunk_size));
        layout.first_boundary_from(lowest).min(end)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Character positions of a text mapped to byte offsets, plus the positions
/// where lines begin.
struct Layout {
    /// Byte offset of every character, then `text.len()`.
    offsets: Vec<usize>,
    /// Sorted line starts, always including 0 and the end of the text.
    boundaries: Vec<usize>,
}

impl Layout {
    fn new(text: &str) -> Self {
        let mut offsets = Vec::with_capacity(text.len() + 1);
        let mut boundaries = vec![0];
        for (pos, (byte, ch)) in text.char_indices().enumerate() {
            offsets.push(byte);
            if ch == '\n' {
                boundaries.push(pos + 1);
            }
        }
        offsets.push(text.len());
        let len = offsets.len() - 1;
        if boundaries.last() != Some(&len) {
            boundaries.push(len);
        }
        Self {
            offsets,
            boundaries,
        }
    }

    /// Length in characters.
    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn byte(&self, pos: usize) -> usize {
        self.offsets[pos]
    }

    fn is_boundary(&self, pos: usize) -> bool {
        self.boundaries.binary_search(&pos).is_ok()
    }

    /// Largest line start in `(after, upto]`.
    fn last_boundary_in(&self, after: usize, upto: usize) -> Option<usize> {
        let idx = self.boundaries.partition_point(|&b| b <= upto);
        idx.checked_sub(1)
            .map(|i| self.boundaries[i])
            .filter(|&b| b > after)
    }

    /// Smallest line start strictly after `pos`, or the end of the text.
    fn first_boundary_after(&self, pos: usize) -> usize {
        let idx = self.boundaries.partition_point(|&b| b <= pos);
        self.boundaries.get(idx).copied().unwrap_or(self.len())
    }

    /// Smallest line start at or after `pos`, or the end of the text.
    fn first_boundary_from(&self, pos: usize) -> usize {
        let idx = self.boundaries.partition_point(|&b| b < pos);
        self.boundaries.get(idx).copied().unwrap_or(self.len())
    }
}

/// Splits `text` with the given window and overlap.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> RagResult<Vec<Chunk>> {
    Ok(Chunker::new(chunk_size, overlap)?.split(text))
}

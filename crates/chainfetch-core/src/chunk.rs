//! Partitioning of a block range into bounded, contiguous chunks.
//!
//! A plan over `[start, end)` with chunk size `n` yields
//! `ceil((end - start) / n)` spans in ascending order. Every span is at most
//! `n` blocks wide, only the last one can be narrower, and consecutive spans
//! share their seam (`prev.to == next.from`).

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

// ─── ChunkSpan ────────────────────────────────────────────────────────────────

/// One half-open `[from, to)` sub-range of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpan {
    /// Zero-based position of this chunk within its plan.
    pub index: u64,
    /// First block of the chunk.
    pub from: u64,
    /// End bound of the chunk (`min(from + chunk_size, range_end)`).
    pub to: u64,
}

impl ChunkSpan {
    /// Number of blocks covered by this chunk.
    pub fn width(&self) -> u64 {
        self.to - self.from
    }
}

// ─── ChunkPlan ────────────────────────────────────────────────────────────────

/// The chunk layout of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    start: u64,
    end: u64,
    chunk_size: u64,
    len: u64,
}

impl ChunkPlan {
    pub fn new(start: u64, end: u64, chunk_size: u64) -> Result<Self, FetchError> {
        if chunk_size == 0 {
            return Err(FetchError::InvalidConfig(
                "chunk_size must be positive".into(),
            ));
        }
        if end < start {
            return Err(FetchError::InvalidConfig(format!(
                "range end {end} is before range start {start}"
            )));
        }
        let width = end - start;
        let len = width / chunk_size + u64::from(width % chunk_size != 0);
        Ok(Self {
            start,
            end,
            chunk_size,
            len,
        })
    }

    /// Number of chunks in the plan.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// The `index`-th span, or `None` past the end of the plan.
    pub fn span(&self, index: u64) -> Option<ChunkSpan> {
        if index >= self.len {
            return None;
        }
        // index < len guarantees from < end, so neither step can overflow.
        let from = self.start + index * self.chunk_size;
        let to = (self.end - from).min(self.chunk_size) + from;
        Some(ChunkSpan { index, from, to })
    }

    /// Iterate spans in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
        (0..self.len).filter_map(move |i| self.span(i))
    }
}

/// `floor(100 * completed / total)`, or 0 for an empty plan.
pub fn percentage(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = u128::from(completed) * 100 / u128::from(total);
    pct.min(100) as u8
}

// ─── Tests ────────────────────────────────────────────────────────────────────

//! Chunk planning
//!
//! Splits a payload of known length into contiguous byte ranges no larger than
//! the destination limit. Planning is pure: the same inputs always produce the
//! same plan, and the plan's index order is the only order the driver appends in.

/// Smallest limit accepted for text, so every UTF-8 char fits in one chunk
pub const MIN_TEXT_CHUNK_LIMIT: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("invalid chunk limit {limit}: must be at least {min}")]
    InvalidLimit { limit: i64, min: i64 },
}

/// A chunk limit that has already been validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimit(u64);

impl ChunkLimit {
    /// Validate a byte-payload limit: anything above zero
    pub fn new(limit: i64) -> Result<Self, PlanError> {
        if limit <= 0 {
            return Err(PlanError::InvalidLimit { limit, min: 1 });
        }
        Ok(Self(limit as u64))
    }

    /// Validate a text-payload limit
    pub fn for_text(limit: i64) -> Result<Self, PlanError> {
        if limit < MIN_TEXT_CHUNK_LIMIT {
            return Err(PlanError::InvalidLimit {
                limit,
                min: MIN_TEXT_CHUNK_LIMIT,
            });
        }
        Ok(Self(limit as u64))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// One `[start, end)` byte range of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    limit: u64,
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Fixed-size ranges; the last chunk holds the remainder.
    pub fn for_length(total_size: u64, limit: ChunkLimit) -> Self {
        let limit = limit.get();
        if total_size == 0 {
            return Self::empty(limit);
        }

        let mut chunks = Vec::with_capacity(total_size.div_ceil(limit).min(1024) as usize);
        let mut start = 0u64;
        while start < total_size {
            // Stepping by the remainder keeps `end` within u64 for any limit.
            let end = start + limit.min(total_size - start);
            chunks.push(Chunk {
                index: chunks.len(),
                start,
                end,
            });
            start = end;
        }

        Self {
            total_size,
            limit,
            chunks,
        }
    }

    /// Ranges whose boundaries fall on UTF-8 char boundaries of `text`.
    pub fn for_text(text: &str, limit: ChunkLimit) -> Self {
        let limit_bytes = limit.get() as usize;
        let total = text.len();
        if total == 0 {
            return Self::empty(limit.get());
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < total {
            let mut end = (start + limit_bytes).min(total);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            if end == start {
                // Only reachable with limits below the widest char; take the whole char.
                end = start + 1;
                while !text.is_char_boundary(end) {
                    end += 1;
                }
            }
            chunks.push(Chunk {
                index: chunks.len(),
                start: start as u64,
                end: end as u64,
            });
            start = end;
        }

        Self {
            total_size: total as u64,
            limit: limit.get(),
            chunks,
        }
    }

    fn empty(limit: u64) -> Self {
        Self {
            total_size: 0,
            limit,
            chunks: vec![Chunk {
                index: 0,
                start: 0,
                end: 0,
            }],
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// A plan always holds at least one chunk
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }
}

/// Plan a byte payload of `total_size` bytes against `limit`.
pub fn plan(total_size: u64, limit: i64) -> Result<ChunkPlan, PlanError> {
    let limit = ChunkLimit::new(limit)?;
    Ok(ChunkPlan::for_length(total_size, limit))
}

/// Plan a text payload without splitting any UTF-8 char across chunks.
pub fn plan_text(text: &str, limit: i64) -> Result<ChunkPlan, PlanError> {
    let limit = ChunkLimit::for_text(limit)?;
    Ok(ChunkPlan::for_text(text, limit))
}

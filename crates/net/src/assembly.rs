//! Reassembly of wrapped commands from their chunks.
//!
//! Memory is proportional to the bytes actually received: fragments are kept
//! as they arrive and only concatenated once they tile the declared length
//! exactly.

use crate::error::AssemblyError;
use crate::wrapper::WrapperChunk;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Default bound on a reassembled command (16 MiB).
pub const DEFAULT_MAX_ASSEMBLED_LEN: usize = 16 * 1024 * 1024;

/// Default bound on wrapped commands assembled concurrently.
pub const DEFAULT_MAX_PENDING: usize = 32;

/// Default bound on the chunk count of one wrapped command.
pub const DEFAULT_MAX_CHUNKS: u32 = 65_536;

/// Bounds applied while reassembling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyLimits {
    /// Largest `total_data_length` accepted.
    pub max_assembled_len: usize,
    /// Most wrapped commands waiting for chunks at once.
    pub max_pending: usize,
    /// Largest `num_chunks` accepted.
    pub max_chunks: u32,
}

impl Default for AssemblyLimits {
    fn default() -> Self {
        Self {
            max_assembled_len: DEFAULT_MAX_ASSEMBLED_LEN,
            max_pending: DEFAULT_MAX_PENDING,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

#[derive(Debug)]
struct Fragment {
    offset: u32,
    data: Vec<u8>,
}

#[derive(Debug)]
struct PendingCommand {
    num_chunks: u32,
    total_data_length: u32,
    /// Keyed by chunk number.
    fragments: HashMap<u32, Fragment>,
    /// Occupied byte ranges, start -> end. Never overlapping.
    spans: BTreeMap<u32, u32>,
    received_len: u64,
}

impl PendingCommand {
    fn new(chunk: &WrapperChunk) -> Self {
        Self {
            num_chunks: chunk.num_chunks,
            total_data_length: chunk.total_data_length,
            fragments: HashMap::new(),
            spans: BTreeMap::new(),
            received_len: 0,
        }
    }

    /// Spans are disjoint and sorted, so only the last span starting before
    /// `end` can reach past `start`.
    fn overlaps(&self, start: u32, end: u32) -> bool {
        self.spans
            .range(..end)
            .next_back()
            .is_some_and(|(_, &span_end)| span_end > start)
    }

    fn insert(&mut self, chunk: &WrapperChunk, end: u32) {
        self.spans.insert(chunk.data_offset, end);
        self.received_len += chunk.chunk_data.len() as u64;
        self.fragments.insert(
            chunk.chunk_number,
            Fragment {
                offset: chunk.data_offset,
                data: chunk.chunk_data.clone(),
            },
        );
    }

    fn into_payload(self) -> Vec<u8> {
        let mut fragments: Vec<Fragment> = self.fragments.into_values().collect();
        fragments.sort_by_key(|f| f.offset);
        let mut payload = Vec::with_capacity(self.total_data_length as usize);
        for fragment in fragments {
            payload.extend_from_slice(&fragment.data);
        }
        payload
    }
}

/// Collects chunks per wrapped command id until each command is complete.
#[derive(Debug, Default)]
pub struct WrapperAssembler {
    limits: AssemblyLimits,
    pending: HashMap<u16, PendingCommand>,
}

impl WrapperAssembler {
    /// Assembler with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembler with explicit limits.
    pub fn with_limits(limits: AssemblyLimits) -> Self {
        Self {
            limits,
            pending: HashMap::new(),
        }
    }

    /// Number of commands still waiting for chunks.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop a partially assembled command.
    pub fn discard(&mut self, wrapped_command_id: u16) -> bool {
        self.pending.remove(&wrapped_command_id).is_some()
    }

    /// Add one chunk.
    ///
    /// Returns the reassembled command once its last chunk arrives and the
    /// chunks cover every byte of the declared length. Exact duplicates are
    /// ignored; a chunk that contradicts or overlaps earlier ones is an error
    /// and leaves the pending command untouched. A command whose chunks all
    /// arrived but leave gaps is dropped with [`AssemblyError::Incomplete`].
    pub fn ingest(&mut self, chunk: &WrapperChunk) -> Result<Option<Vec<u8>>, AssemblyError> {
        let id = chunk.wrapped_command_id;
        if chunk.num_chunks == 0 {
            // Unchunked: nothing to wait for.
            return Ok(Some(Vec::new()));
        }
        if chunk.chunk_number >= chunk.num_chunks {
            return Err(AssemblyError::ChunkOutOfRange {
                chunk_number: chunk.chunk_number,
                num_chunks: chunk.num_chunks,
            });
        }
        if chunk.total_data_length as usize > self.limits.max_assembled_len {
            return Err(AssemblyError::TooLarge {
                declared: chunk.total_data_length,
                limit: self.limits.max_assembled_len,
            });
        }
        if chunk.num_chunks > self.limits.max_chunks {
            return Err(AssemblyError::TooManyChunks {
                declared: chunk.num_chunks,
                limit: self.limits.max_chunks,
            });
        }
        // Every chunk but an unchunked wrapper carries at least one byte.
        if chunk.chunk_data.is_empty() || chunk.num_chunks > chunk.total_data_length {
            return Err(AssemblyError::Inconsistent(id));
        }
        let offset = u64::from(chunk.data_offset);
        let end = offset + chunk.chunk_data.len() as u64;
        if end > u64::from(chunk.total_data_length) {
            return Err(AssemblyError::DataOutOfBounds {
                offset,
                end,
                total: chunk.total_data_length,
            });
        }
        // Bounded by total_data_length above.
        let end = end as u32;

        if !self.pending.contains_key(&id) && self.pending.len() >= self.limits.max_pending {
            return Err(AssemblyError::TooManyPending {
                limit: self.limits.max_pending,
            });
        }
        let entry = self
            .pending
            .entry(id)
            .or_insert_with(|| PendingCommand::new(chunk));
        if entry.num_chunks != chunk.num_chunks
            || entry.total_data_length != chunk.total_data_length
        {
            return Err(AssemblyError::Inconsistent(id));
        }

        if let Some(seen) = entry.fragments.get(&chunk.chunk_number) {
            if seen.offset == chunk.data_offset && seen.data == chunk.chunk_data {
                trace!(id, chunk = chunk.chunk_number, "duplicate wrapper chunk ignored");
                return Ok(None);
            }
            return Err(AssemblyError::ConflictingDuplicate(chunk.chunk_number, id));
        }
        if entry.overlaps(chunk.data_offset, end) {
            return Err(AssemblyError::Overlap(chunk.chunk_number, id));
        }
        entry.insert(chunk, end);

        if (entry.fragments.len() as u64) < u64::from(entry.num_chunks) {
            return Ok(None);
        }
        let Some(finished) = self.pending.remove(&id) else {
            return Ok(None);
        };
        if finished.received_len != u64::from(finished.total_data_length) {
            return Err(AssemblyError::Incomplete {
                id,
                received: finished.received_len,
                total: finished.total_data_length,
            });
        }
        debug!(id, "wrapped command reassembled");
        Ok(Some(finished.into_payload()))
    }
}

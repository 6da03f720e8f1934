//! Error types for wrapper chunk handling.

use thiserror::Error;

/// How a rejection should be classified by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Shape or field values violate the decoder's contract.
    Structural,
    /// Declared lengths disagree with the bytes actually present.
    Corruption,
}

/// Why an inbound wrapper chunk was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkRejection {
    /// Fewer bytes than the fixed header.
    #[error("chunk truncated: {actual} bytes, header needs {required}")]
    Truncated {
        /// Bytes available.
        actual: usize,
        /// Header size.
        required: usize,
    },
    /// Declared data length disagrees with the bytes present.
    #[error("chunk length mismatch: header declares {declared} data bytes, {actual} present")]
    LengthMismatch {
        /// Length from the header or length field.
        declared: usize,
        /// Bytes actually present.
        actual: usize,
    },
    /// A chunk claiming no payload still carried data.
    #[error("unchunked wrapper carries {0} data bytes")]
    UnchunkedWithData(usize),
    /// A required field was absent or not a valid integer.
    #[error("wrapper field {0} missing or invalid")]
    InvalidField(&'static str),
    /// The embedded payload could not be coerced to bytes.
    #[error("wrapper payload is not a byte sequence")]
    InvalidPayload,
    /// The input is neither a byte buffer nor a property bag.
    #[error("input is not a wrapper chunk")]
    NotAChunk,
}

impl ChunkRejection {
    /// Rejection category.
    pub fn kind(&self) -> RejectionKind {
        match self {
            ChunkRejection::Truncated { .. }
            | ChunkRejection::LengthMismatch { .. }
            | ChunkRejection::UnchunkedWithData(_) => RejectionKind::Corruption,
            ChunkRejection::InvalidField(_)
            | ChunkRejection::InvalidPayload
            | ChunkRejection::NotAChunk => RejectionKind::Structural,
        }
    }
}

/// Refusal to encode or split an internally inconsistent chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkEncodeError {
    /// `num_chunks == 0` must not carry data.
    #[error("unchunked wrapper must not carry data ({0} bytes given)")]
    UnchunkedWithData(usize),
    /// Lengths must fit the 32-bit header fields.
    #[error("{0} bytes do not fit a 32-bit length field")]
    TooLarge(usize),
    /// Fragment size must be positive.
    #[error("chunk data size must be at least one byte")]
    ZeroChunkSize,
}

/// Reassembly of a wrapped command failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// Chunk number is not below the chunk count.
    #[error("chunk {chunk_number} out of range for {num_chunks} chunks")]
    ChunkOutOfRange {
        /// Offending chunk number.
        chunk_number: u32,
        /// Declared chunk count.
        num_chunks: u32,
    },
    /// Chunk data would extend past the declared total.
    #[error("chunk data [{offset}, {end}) exceeds total length {total}")]
    DataOutOfBounds {
        /// Data offset.
        offset: u64,
        /// Offset plus length.
        end: u64,
        /// Declared total length.
        total: u32,
    },
    /// Chunk disagrees with earlier chunks of the same command.
    #[error("chunk header disagrees with earlier chunks of wrapped command {0}")]
    Inconsistent(u16),
    /// Declared total exceeds the configured bound.
    #[error("wrapped command length {declared} exceeds limit {limit}")]
    TooLarge {
        /// Declared total length.
        declared: u32,
        /// Configured limit.
        limit: usize,
    },
    /// Declared chunk count exceeds the configured bound.
    #[error("wrapped command declares {declared} chunks, limit is {limit}")]
    TooManyChunks {
        /// Declared chunk count.
        declared: u32,
        /// Configured limit.
        limit: u32,
    },
    /// Too many wrapped commands are already being assembled.
    #[error("{limit} wrapped commands already pending")]
    TooManyPending {
        /// Configured limit.
        limit: usize,
    },
    /// Chunk data overlaps bytes placed by an earlier chunk.
    #[error("chunk {0} of wrapped command {1} overlaps earlier data")]
    Overlap(u32, u16),
    /// Every chunk arrived but they do not cover the declared length.
    #[error("wrapped command {id} complete with {received} of {total} bytes")]
    Incomplete {
        /// Wrapped command id.
        id: u16,
        /// Bytes covered by the chunks.
        received: u64,
        /// Declared total length.
        total: u32,
    },
    /// Two chunks with the same number carry different bytes.
    #[error("chunk {0} of wrapped command {1} resent with different data")]
    ConflictingDuplicate(u32, u16),
}

//! Errors raised at trusted local call sites.

use thiserror::Error;

/// An out-of-domain value passed by local code.
///
/// These indicate a programming defect in the caller, never a network
/// condition: untrusted input is rejected with a no-value result instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    /// Command tags are non-negative.
    #[error("command type must be non-negative, got {0}")]
    NegativeCommandType(i64),
    /// Command tags are whole numbers.
    #[error("command type must be a finite integer, got {0}")]
    NonIntegralCommandType(f64),
    /// Command tag does not fit the tag space.
    #[error("command type {0} is outside the tag space")]
    CommandTypeOutOfRange(i64),
    /// Sequencer seeds live in the 16-bit id space.
    #[error("command id seed must be within [0, 65535], got {0}")]
    SeedOutOfRange(i64),
}

#![warn(missing_docs)]
//! Command taxonomy shared by every layer of the lockstep protocol.
//!
//! The command type set is closed and the policy tables are constants, so
//! peers built from the same source agree on them without negotiation.

mod command_type;
mod error;
mod policy;

pub use command_type::{CommandTag, CommandType, UnknownCommandName, CANONICAL_PREFIX};
pub use error::ArgumentError;
pub use policy::{CommandPolicy, CommandSet, PolicyFlags};

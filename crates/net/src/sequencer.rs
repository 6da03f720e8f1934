//! Outbound command id assignment.
//!
//! One 16-bit id space per session, shared by every id-requiring command kind:
//! gap and duplicate detection on the receiving side keys on send order, not
//! per-type order. Sequencers are deliberately not `Clone`, and a new session
//! builds a new sequencer instead of rewinding an old one.

use lockstep_core::{ArgumentError, CommandPolicy, CommandTag, CommandType};
use tracing::trace;

/// Seed for a fresh session, clear of the reserved low ids.
pub const COMMAND_ID_SEED: u16 = 64000;

/// Monotonic wraparound command id generator.
#[derive(Debug)]
pub struct CommandIdSequencer {
    current: u16,
    policy: CommandPolicy,
}

impl CommandIdSequencer {
    /// Sequencer seeded with [`COMMAND_ID_SEED`].
    pub fn new() -> Self {
        Self {
            current: COMMAND_ID_SEED,
            policy: CommandPolicy::STANDARD,
        }
    }

    /// Sequencer seeded with an explicit starting id.
    pub fn with_seed(seed: i64) -> Result<Self, ArgumentError> {
        let current = u16::try_from(seed).map_err(|_| ArgumentError::SeedOutOfRange(seed))?;
        Ok(Self {
            current,
            policy: CommandPolicy::STANDARD,
        })
    }

    /// Replace the policy table used by [`Self::next_id_for_type`].
    pub fn with_policy(mut self, policy: CommandPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The most recently issued id (or the seed, before any is issued).
    pub fn current_id(&self) -> u16 {
        self.current
    }

    /// Advance and return the new id, wrapping from 65535 to 0.
    pub fn next_id(&mut self) -> u16 {
        self.current = self.current.wrapping_add(1);
        self.current
    }

    /// Issue an id only if the command type needs one.
    ///
    /// Types outside the id-requiring set consume nothing.
    pub fn next_id_for_type(&mut self, tag: impl Into<CommandTag>) -> Option<u16> {
        let tag = tag.into();
        if !self.policy.requires_id(tag) {
            return None;
        }
        Some(self.next_id())
    }
}

impl Default for CommandIdSequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery decisions for one outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundStamp {
    /// Command kind being sent.
    pub command_type: CommandType,
    /// Assigned id, if the kind carries one.
    pub command_id: Option<u16>,
    /// Transport must retain it until acknowledged.
    pub requires_ack: bool,
    /// Transport must send it outside normal batching.
    pub direct_send: bool,
    /// Part of the synchronized frame stream.
    pub synchronized: bool,
}

/// Send-path owner of a session's id space.
#[derive(Debug)]
pub struct CommandStamper {
    sequencer: CommandIdSequencer,
    policy: CommandPolicy,
    seed: u16,
}

impl CommandStamper {
    /// Stamper for a new session using the standard policy and seed.
    pub fn new() -> Self {
        Self::from_parts(COMMAND_ID_SEED, CommandPolicy::STANDARD)
    }

    /// Stamper for a new session with an explicit seed.
    pub fn with_seed(seed: i64) -> Result<Self, ArgumentError> {
        let sequencer = CommandIdSequencer::with_seed(seed)?;
        Ok(Self::from_parts(sequencer.current_id(), CommandPolicy::STANDARD))
    }

    fn from_parts(seed: u16, policy: CommandPolicy) -> Self {
        Self {
            sequencer: CommandIdSequencer {
                current: seed,
                policy,
            },
            policy,
            seed,
        }
    }

    /// Decide id and delivery flags for one outbound command.
    pub fn stamp(&mut self, command_type: CommandType) -> OutboundStamp {
        let command_id = self.sequencer.next_id_for_type(command_type);
        let flags = self.policy.flags(command_type);
        trace!(?command_type, ?command_id, "stamped outbound command");
        OutboundStamp {
            command_type,
            command_id,
            requires_ack: flags.requires_ack,
            direct_send: flags.requires_direct_send,
            synchronized: flags.synchronized,
        }
    }

    /// Id of the most recently stamped command (or the seed).
    pub fn current_id(&self) -> u16 {
        self.sequencer.current_id()
    }

    /// End this session and start the next with a fresh id space.
    pub fn next_session(self) -> Self {
        Self::from_parts(self.seed, self.policy)
    }
}

impl Default for CommandStamper {
    fn default() -> Self {
        Self::new()
    }
}

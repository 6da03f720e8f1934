//! Per-command-type delivery policy.
//!
//! Four independent membership sets rather than one reliability level: a
//! disconnect vote needs an id, an ack and a direct send but is not part of the
//! synchronized stream, while run-ahead needs an id, an ack and is synchronized
//! but is batched normally.

use crate::command_type::{CommandTag, CommandType};
use serde::Serialize;

/// A set of command tags, one bit per tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandSet(u64);

impl CommandSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Build a set from a list of command types.
    pub const fn of(types: &[CommandType]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < types.len() {
            bits |= 1u64 << types[i].tag();
            i += 1;
        }
        Self(bits)
    }

    /// Membership test; tags outside the bit range are never members.
    pub const fn contains(self, tag: CommandTag) -> bool {
        let value = tag.value();
        value < u64::BITS && (self.0 >> value) & 1 == 1
    }

    /// Set difference.
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Members in tag order.
    pub fn iter(self) -> impl Iterator<Item = CommandType> {
        CommandType::ALL
            .into_iter()
            .filter(move |ty| self.contains(CommandTag::from(*ty)))
    }
}

const REQUIRES_ID: CommandSet = CommandSet::of(&[
    CommandType::GameCommand,
    CommandType::FrameInfo,
    CommandType::PlayerLeave,
    CommandType::DestroyPlayer,
    CommandType::RunAheadMetrics,
    CommandType::RunAhead,
    CommandType::Chat,
    CommandType::DisconnectVote,
    CommandType::LoadComplete,
    CommandType::TimeoutStart,
    CommandType::Wrapper,
    CommandType::File,
    CommandType::FileAnnounce,
    CommandType::FileProgress,
    CommandType::DisconnectPlayer,
    CommandType::DisconnectFrame,
    CommandType::DisconnectScreenOff,
    CommandType::FrameResendRequest,
]);

// Run-ahead metrics are stamped for ordering but superseded by the next report.
const REQUIRES_ACK: CommandSet =
    REQUIRES_ID.without(CommandSet::of(&[CommandType::RunAheadMetrics]));

const REQUIRES_DIRECT_SEND: CommandSet = CommandSet::of(&[
    CommandType::AckBoth,
    CommandType::AckStage1,
    CommandType::AckStage2,
    CommandType::DisconnectKeepAlive,
    CommandType::DisconnectVote,
    CommandType::DisconnectPlayer,
    CommandType::PacketRouterQuery,
    CommandType::PacketRouterAck,
    CommandType::DisconnectChat,
    CommandType::LoadComplete,
    CommandType::TimeoutStart,
    CommandType::File,
    CommandType::FileAnnounce,
    CommandType::FileProgress,
    CommandType::FrameResendRequest,
    CommandType::DisconnectFrame,
    CommandType::DisconnectScreenOff,
    CommandType::Progress,
]);

const SYNCHRONIZED: CommandSet = CommandSet::of(&[
    CommandType::GameCommand,
    CommandType::FrameInfo,
    CommandType::PlayerLeave,
    CommandType::DestroyPlayer,
    CommandType::RunAhead,
]);

/// Immutable policy table consulted by the send path and the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPolicy {
    requires_id: CommandSet,
    requires_ack: CommandSet,
    requires_direct_send: CommandSet,
    synchronized: CommandSet,
}

impl CommandPolicy {
    /// The protocol's policy table.
    pub const STANDARD: Self = Self {
        requires_id: REQUIRES_ID,
        requires_ack: REQUIRES_ACK,
        requires_direct_send: REQUIRES_DIRECT_SEND,
        synchronized: SYNCHRONIZED,
    };

    /// Build a custom table, e.g. for protocol experiments in tests.
    pub const fn new(
        requires_id: CommandSet,
        requires_ack: CommandSet,
        requires_direct_send: CommandSet,
        synchronized: CommandSet,
    ) -> Self {
        Self {
            requires_id,
            requires_ack,
            requires_direct_send,
            synchronized,
        }
    }

    /// Whether commands of this type are stamped with a command id.
    pub fn requires_id(&self, tag: impl Into<CommandTag>) -> bool {
        self.requires_id.contains(tag.into())
    }

    /// Whether the receiver must acknowledge commands of this type.
    pub fn requires_ack(&self, tag: impl Into<CommandTag>) -> bool {
        self.requires_ack.contains(tag.into())
    }

    /// Whether commands of this type bypass normal batching.
    pub fn requires_direct_send(&self, tag: impl Into<CommandTag>) -> bool {
        self.requires_direct_send.contains(tag.into())
    }

    /// Whether commands of this type belong to the deterministic frame stream.
    pub fn is_synchronized(&self, tag: impl Into<CommandTag>) -> bool {
        self.synchronized.contains(tag.into())
    }

    /// All four flags for one command type.
    pub fn flags(&self, ty: CommandType) -> PolicyFlags {
        PolicyFlags {
            requires_id: self.requires_id(ty),
            requires_ack: self.requires_ack(ty),
            requires_direct_send: self.requires_direct_send(ty),
            synchronized: self.is_synchronized(ty),
        }
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Snapshot of the four policy flags for one command type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PolicyFlags {
    /// Stamped with a command id.
    pub requires_id: bool,
    /// Acknowledged by the receiver.
    pub requires_ack: bool,
    /// Sent outside normal batching.
    pub requires_direct_send: bool,
    /// Part of the synchronized stream.
    pub synchronized: bool,
}

impl CommandType {
    /// Policy flags under [`CommandPolicy::STANDARD`].
    pub fn policy(self) -> PolicyFlags {
        CommandPolicy::STANDARD.flags(self)
    }
}

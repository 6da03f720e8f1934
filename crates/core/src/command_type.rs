//! The closed set of network command kinds and their canonical names.
//!
//! Tags are stable on the wire: every peer in a session must agree on them,
//! so new kinds are only ever appended before [`CommandType::ALL`] ends.

use crate::error::ArgumentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Prefix shared by every canonical command type name.
pub const CANONICAL_PREFIX: &str = "NETCOMMANDTYPE_";

/// Normalized form of [`CANONICAL_PREFIX`], stripped before name comparison.
const NORMALIZED_PREFIX: &str = "netcommandtype";

/// Logical network command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommandType {
    /// Acknowledges both delivery stages at once.
    AckBoth = 0,
    /// First-stage (received) acknowledgement.
    AckStage1 = 1,
    /// Second-stage (processed) acknowledgement.
    AckStage2 = 2,
    /// Per-frame command count and desync hash.
    FrameInfo = 3,
    /// Simulation command executed on a lockstep frame.
    GameCommand = 4,
    /// A player left the session.
    PlayerLeave = 5,
    /// Latency/fps report used to compute run-ahead.
    RunAheadMetrics = 6,
    /// New run-ahead value agreed for the session.
    RunAhead = 7,
    /// Remove a player from the simulation.
    DestroyPlayer = 8,
    /// Connection keep-alive.
    KeepAlive = 9,
    /// Chat while the disconnect screen is up.
    DisconnectChat = 10,
    /// In-game chat.
    Chat = 11,
    /// NAT mangler detection request.
    ManglerQuery = 12,
    /// NAT mangler reply.
    ManglerResponse = 13,
    /// Map load progress.
    Progress = 14,
    /// Map load finished.
    LoadComplete = 15,
    /// Load timeout countdown started.
    TimeoutStart = 16,
    /// One fragment of an oversized command.
    Wrapper = 17,
    /// Bulk file body.
    File = 18,
    /// Announces an upcoming file transfer.
    FileAnnounce = 19,
    /// File transfer progress.
    FileProgress = 20,
    /// Request to resend commands from a given frame.
    FrameResendRequest = 21,
    /// Disconnect screen opened.
    DisconnectStart = 22,
    /// Keep-alive while the disconnect screen is up.
    DisconnectKeepAlive = 23,
    /// Disconnect a specific player.
    DisconnectPlayer = 24,
    /// Ask which peer is the packet router.
    PacketRouterQuery = 25,
    /// Packet router announces itself.
    PacketRouterAck = 26,
    /// Vote to disconnect a player.
    DisconnectVote = 27,
    /// Last frame a peer executed before stalling.
    DisconnectFrame = 28,
    /// Disconnect screen closed.
    DisconnectScreenOff = 29,
    /// Disconnect negotiation finished.
    DisconnectEnd = 30,
}

impl CommandType {
    /// Every command type, in tag order.
    pub const ALL: [CommandType; 31] = [
        CommandType::AckBoth,
        CommandType::AckStage1,
        CommandType::AckStage2,
        CommandType::FrameInfo,
        CommandType::GameCommand,
        CommandType::PlayerLeave,
        CommandType::RunAheadMetrics,
        CommandType::RunAhead,
        CommandType::DestroyPlayer,
        CommandType::KeepAlive,
        CommandType::DisconnectChat,
        CommandType::Chat,
        CommandType::ManglerQuery,
        CommandType::ManglerResponse,
        CommandType::Progress,
        CommandType::LoadComplete,
        CommandType::TimeoutStart,
        CommandType::Wrapper,
        CommandType::File,
        CommandType::FileAnnounce,
        CommandType::FileProgress,
        CommandType::FrameResendRequest,
        CommandType::DisconnectStart,
        CommandType::DisconnectKeepAlive,
        CommandType::DisconnectPlayer,
        CommandType::PacketRouterQuery,
        CommandType::PacketRouterAck,
        CommandType::DisconnectVote,
        CommandType::DisconnectFrame,
        CommandType::DisconnectScreenOff,
        CommandType::DisconnectEnd,
    ];

    /// Numeric wire tag.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a command type by its wire tag.
    pub fn from_tag(tag: CommandTag) -> Option<Self> {
        Self::ALL.get(tag.value() as usize).copied()
    }

    /// Canonical diagnostic name, e.g. `NETCOMMANDTYPE_FRAMEINFO`.
    pub const fn name(self) -> &'static str {
        match self {
            CommandType::AckBoth => "NETCOMMANDTYPE_ACKBOTH",
            CommandType::AckStage1 => "NETCOMMANDTYPE_ACKSTAGE1",
            CommandType::AckStage2 => "NETCOMMANDTYPE_ACKSTAGE2",
            CommandType::FrameInfo => "NETCOMMANDTYPE_FRAMEINFO",
            CommandType::GameCommand => "NETCOMMANDTYPE_GAMECOMMAND",
            CommandType::PlayerLeave => "NETCOMMANDTYPE_PLAYERLEAVE",
            CommandType::RunAheadMetrics => "NETCOMMANDTYPE_RUNAHEADMETRICS",
            CommandType::RunAhead => "NETCOMMANDTYPE_RUNAHEAD",
            CommandType::DestroyPlayer => "NETCOMMANDTYPE_DESTROYPLAYER",
            CommandType::KeepAlive => "NETCOMMANDTYPE_KEEPALIVE",
            CommandType::DisconnectChat => "NETCOMMANDTYPE_DISCONNECTCHAT",
            CommandType::Chat => "NETCOMMANDTYPE_CHAT",
            CommandType::ManglerQuery => "NETCOMMANDTYPE_MANGLERQUERY",
            CommandType::ManglerResponse => "NETCOMMANDTYPE_MANGLERRESPONSE",
            CommandType::Progress => "NETCOMMANDTYPE_PROGRESS",
            CommandType::LoadComplete => "NETCOMMANDTYPE_LOADCOMPLETE",
            CommandType::TimeoutStart => "NETCOMMANDTYPE_TIMEOUTSTART",
            CommandType::Wrapper => "NETCOMMANDTYPE_WRAPPER",
            CommandType::File => "NETCOMMANDTYPE_FILE",
            CommandType::FileAnnounce => "NETCOMMANDTYPE_FILEANNOUNCE",
            CommandType::FileProgress => "NETCOMMANDTYPE_FILEPROGRESS",
            CommandType::FrameResendRequest => "NETCOMMANDTYPE_FRAMERESENDREQUEST",
            CommandType::DisconnectStart => "NETCOMMANDTYPE_DISCONNECTSTART",
            CommandType::DisconnectKeepAlive => "NETCOMMANDTYPE_DISCONNECTKEEPALIVE",
            CommandType::DisconnectPlayer => "NETCOMMANDTYPE_DISCONNECTPLAYER",
            CommandType::PacketRouterQuery => "NETCOMMANDTYPE_PACKETROUTERQUERY",
            CommandType::PacketRouterAck => "NETCOMMANDTYPE_PACKETROUTERACK",
            CommandType::DisconnectVote => "NETCOMMANDTYPE_DISCONNECTVOTE",
            CommandType::DisconnectFrame => "NETCOMMANDTYPE_DISCONNECTFRAME",
            CommandType::DisconnectScreenOff => "NETCOMMANDTYPE_DISCONNECTSCREENOFF",
            CommandType::DisconnectEnd => "NETCOMMANDTYPE_DISCONNECTEND",
        }
    }

    /// Resolve a command type from a diagnostic name.
    ///
    /// Matching ignores case and punctuation, and the `NETCOMMANDTYPE` prefix
    /// is optional: `NETCOMMANDTYPE_FRAMEINFO`, `frame-info` and `FrameInfo`
    /// all resolve to [`CommandType::FrameInfo`].
    pub fn from_name(name: &str) -> Option<Self> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        name_index().get(&key).copied()
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name does not match any [`CommandType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command type name: {0:?}")]
pub struct UnknownCommandName(pub String);

impl FromStr for CommandType {
    type Err = UnknownCommandName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownCommandName(s.to_string()))
    }
}

/// Lowercase, drop anything that is not ASCII alphanumeric, then strip the
/// shared prefix.
fn normalize_name(name: &str) -> String {
    let folded: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match folded.strip_prefix(NORMALIZED_PREFIX) {
        Some(rest) => rest.to_string(),
        None => folded,
    }
}

fn name_index() -> &'static HashMap<String, CommandType> {
    static INDEX: OnceLock<HashMap<String, CommandType>> = OnceLock::new();
    INDEX.get_or_init(|| {
        CommandType::ALL
            .iter()
            .map(|&ty| (normalize_name(ty.name()), ty))
            .collect()
    })
}

/// A raw command tag as supplied by a local call site.
///
/// Construction is where out-of-domain values are caught: a negative,
/// fractional or non-finite tag is an [`ArgumentError`]. A valid tag does not
/// have to name a known [`CommandType`]; unknown tags simply belong to no
/// policy set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandTag(u32);

impl CommandTag {
    /// Raw tag value.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Validate a floating-point tag.
    pub fn from_f64(value: f64) -> Result<Self, ArgumentError> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(ArgumentError::NonIntegralCommandType(value));
        }
        if value < 0.0 {
            return Err(ArgumentError::NegativeCommandType(value as i64));
        }
        if value > f64::from(u32::MAX) {
            return Err(ArgumentError::CommandTypeOutOfRange(value as i64));
        }
        Ok(Self(value as u32))
    }

    /// The command type this tag names, if any.
    pub fn command_type(self) -> Option<CommandType> {
        CommandType::from_tag(self)
    }
}

impl TryFrom<i64> for CommandTag {
    type Error = ArgumentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(ArgumentError::NegativeCommandType(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ArgumentError::CommandTypeOutOfRange(value))
    }
}

impl From<CommandType> for CommandTag {
    fn from(ty: CommandType) -> Self {
        Self(u32::from(ty.tag()))
    }
}

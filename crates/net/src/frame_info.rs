//! Per-frame synchronization metadata.
//!
//! A frame-info message tells peers how many commands a sender issued for a
//! lockstep frame and, optionally, a desync checksum for that frame.

use crate::resolve::{resolve_numeric_field, slot_index, truncate_to_u32, FieldAliases};
use crate::value::MessageSource;
use serde::Serialize;
use tracing::trace;

/// Default number of seats in a session.
pub const MAX_SLOTS: usize = 8;

pub(crate) const SENDER: FieldAliases = FieldAliases::new(
    &["sender", "player", "playerId", "playerID", "playerIndex", "slot"],
    &["getPlayerID", "getPlayerId", "getSender"],
);

const FRAME: FieldAliases = FieldAliases::new(
    &["frame", "executionFrame", "gameFrame"],
    &["getExecutionFrame", "getFrame"],
);

const COMMAND_COUNT: FieldAliases =
    FieldAliases::new(&["commandCount", "count"], &["getCommandCount"]);

const FRAME_HASH: FieldAliases =
    FieldAliases::new(&["frameHash", "hash"], &["getFrameHash"]);

const LOGIC_CRC: FieldAliases = FieldAliases::new(
    &["logicCRC", "logicCrc", "stateCRC", "crc"],
    &["getLogicCRC", "getLogicCrc"],
);

/// Which checksum a frame carried.
///
/// The two are compared under different policies downstream, so they are kept
/// apart rather than folded into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashKind {
    /// Cheap per-frame divergence check.
    FrameHash,
    /// Heavier game-logic state CRC.
    LogicCrc,
}

/// Desync checksum attached to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHash {
    /// Checksum flavour.
    pub kind: HashKind,
    /// Checksum value.
    pub value: u32,
}

/// Decoded frame-info message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodedFrameInfo {
    /// Sending slot.
    pub sender: usize,
    /// Lockstep frame the info describes.
    pub frame: u32,
    /// Commands the sender issued for the frame, when reported.
    pub command_count: Option<u32>,
    /// Desync checksum, when reported.
    pub hash: Option<FrameHash>,
}

/// Resolve the sender slot shared by frame-info and router messages.
pub(crate) fn resolve_sender<S>(source: &S, max_slots: usize) -> Option<usize>
where
    S: MessageSource + ?Sized,
{
    let raw = resolve_numeric_field(source, &SENDER)?;
    slot_index(raw, max_slots)
}

/// Decode a frame-info message.
///
/// Sender and frame are required; a malformed command count or hash is
/// dropped without rejecting the message.
pub fn decode_frame_info<S>(source: &S, max_slots: usize) -> Option<DecodedFrameInfo>
where
    S: MessageSource + ?Sized,
{
    let Some(sender) = resolve_sender(source, max_slots) else {
        trace!(max_slots, "frame info rejected: missing or out-of-range sender");
        return None;
    };
    let Some(frame) = resolve_numeric_field(source, &FRAME).and_then(truncate_to_u32) else {
        trace!(sender, "frame info rejected: missing or negative frame");
        return None;
    };
    let command_count = resolve_numeric_field(source, &COMMAND_COUNT).and_then(truncate_to_u32);
    let hash = resolve_hash(source);

    Some(DecodedFrameInfo {
        sender,
        frame,
        command_count,
        hash,
    })
}

fn resolve_hash<S>(source: &S) -> Option<FrameHash>
where
    S: MessageSource + ?Sized,
{
    let frame_hash = resolve_numeric_field(source, &FRAME_HASH)
        .and_then(truncate_to_u32)
        .map(|value| FrameHash {
            kind: HashKind::FrameHash,
            value,
        });
    frame_hash.or_else(|| {
        resolve_numeric_field(source, &LOGIC_CRC)
            .and_then(truncate_to_u32)
            .map(|value| FrameHash {
                kind: HashKind::LogicCrc,
                value,
            })
    })
}

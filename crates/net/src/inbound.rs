//! Inbound message classification.
//!
//! Establishes the command type of an opaque inbound message and routes it to
//! the matching decoder. Messages of a type this layer does not decode are
//! passed through untouched for the session layer.

use crate::frame_info::{decode_frame_info, DecodedFrameInfo};
use crate::resolve::{resolve_field_with, resolve_number, resolve_text, FieldAliases};
use crate::router::{decode_packet_router_ack, decode_packet_router_query, RouterMessage};
use crate::value::{MessageSource, WireValue};
use crate::wrapper::{resolve_wrapper_chunk, WrapperChunk};
use lockstep_core::{CommandTag, CommandType};
use tracing::trace;

const COMMAND_TYPE: FieldAliases = FieldAliases::new(
    &["commandType", "netCommandType", "type"],
    &["getNetCommandType", "getCommandType", "getType"],
);

/// Interpret one candidate as a command type.
///
/// Numbers (and numeric strings) are wire tags; other text is a diagnostic
/// name. Tags outside the closed set do not resolve.
fn interpret_command_type(value: &WireValue) -> Option<CommandType> {
    if let Some(number) = resolve_number(value) {
        return CommandTag::from_f64(number).ok()?.command_type();
    }
    resolve_text(value).and_then(CommandType::from_name)
}

/// Resolve the command type of an inbound message.
///
/// Candidates are tried in priority order and the first that names a known
/// command type wins.
pub fn resolve_command_type<S>(source: &S) -> Option<CommandType>
where
    S: MessageSource + ?Sized,
{
    resolve_field_with(source, &COMMAND_TYPE, interpret_command_type)
}

/// An inbound message after classification and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Per-frame command count and checksum.
    FrameInfo(DecodedFrameInfo),
    /// Probe for the current packet router.
    PacketRouterQuery(RouterMessage),
    /// Packet router announcement; see [`crate::accept_packet_router_ack`].
    PacketRouterAck(RouterMessage),
    /// One fragment of an oversized command.
    Wrapper(WrapperChunk),
    /// A known type this layer does not decode.
    Other(CommandType),
}

impl InboundCommand {
    /// Command type the message was classified as.
    pub fn command_type(&self) -> CommandType {
        match self {
            InboundCommand::FrameInfo(_) => CommandType::FrameInfo,
            InboundCommand::PacketRouterQuery(_) => CommandType::PacketRouterQuery,
            InboundCommand::PacketRouterAck(_) => CommandType::PacketRouterAck,
            InboundCommand::Wrapper(_) => CommandType::Wrapper,
            InboundCommand::Other(ty) => *ty,
        }
    }
}

/// Classify and decode one inbound message.
///
/// Returns `None` when the command type cannot be established or when the
/// routed decoder rejects the message. The caller drops exactly that message.
pub fn classify_inbound<S>(source: &S, max_slots: usize) -> Option<InboundCommand>
where
    S: MessageSource + ?Sized,
{
    let Some(command_type) = resolve_command_type(source) else {
        trace!("inbound message rejected: unknown command type");
        return None;
    };

    let decoded = match command_type {
        CommandType::FrameInfo => {
            decode_frame_info(source, max_slots).map(InboundCommand::FrameInfo)
        }
        CommandType::PacketRouterQuery => {
            decode_packet_router_query(source, max_slots).map(InboundCommand::PacketRouterQuery)
        }
        CommandType::PacketRouterAck => {
            decode_packet_router_ack(source, max_slots).map(InboundCommand::PacketRouterAck)
        }
        CommandType::Wrapper => resolve_wrapper_chunk(source).map(InboundCommand::Wrapper),
        other => Some(InboundCommand::Other(other)),
    };
    if decoded.is_none() {
        trace!(%command_type, "inbound message rejected by decoder");
    }
    decoded
}

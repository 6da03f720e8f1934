//! Packet-router election messages.
//!
//! In a mesh session one peer relays traffic for the others. Peers query for
//! it with a query and the router answers with an ack; only an ack from the
//! slot currently tracked as router may change election state.

use crate::frame_info::resolve_sender;
use crate::value::MessageSource;
use serde::Serialize;
use tracing::debug;

/// Decoded router query or ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouterMessage {
    /// Sending slot.
    pub sender: usize,
}

/// Decode a packet-router query.
pub fn decode_packet_router_query<S>(source: &S, max_slots: usize) -> Option<RouterMessage>
where
    S: MessageSource + ?Sized,
{
    resolve_sender(source, max_slots).map(|sender| RouterMessage { sender })
}

/// Decode a packet-router ack.
pub fn decode_packet_router_ack<S>(source: &S, max_slots: usize) -> Option<RouterMessage>
where
    S: MessageSource + ?Sized,
{
    resolve_sender(source, max_slots).map(|sender| RouterMessage { sender })
}

/// Whether an ack should be honored given the currently elected router slot.
pub fn accept_packet_router_ack(ack: &RouterMessage, current_router_slot: usize) -> bool {
    let accepted = ack.sender == current_router_slot;
    if !accepted {
        debug!(
            sender = ack.sender,
            router = current_router_slot,
            "ignoring packet router ack from non-router slot"
        );
    }
    accepted
}

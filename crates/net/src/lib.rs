#![warn(missing_docs)]
//! Command synchronization layer for lockstep sessions.
//!
//! Classifies inbound command traffic, stamps outbound commands with ids and
//! decodes the structured payloads (frame info, packet-router election,
//! wrapper chunks) that the transport and session layers act upon. Untrusted
//! input never raises: every decoder returns `None` for a message the caller
//! should drop.

mod assembly;
mod error;
mod frame_info;
mod inbound;
mod resolve;
mod router;
mod sequencer;
mod value;
mod wrapper;

pub use assembly::{
    AssemblyLimits, WrapperAssembler, DEFAULT_MAX_ASSEMBLED_LEN, DEFAULT_MAX_CHUNKS,
    DEFAULT_MAX_PENDING,
};
pub use error::{AssemblyError, ChunkEncodeError, ChunkRejection, RejectionKind};
pub use frame_info::{decode_frame_info, DecodedFrameInfo, FrameHash, HashKind, MAX_SLOTS};
pub use inbound::{classify_inbound, resolve_command_type, InboundCommand};
pub use resolve::{
    resolve_accessor, resolve_field_with, resolve_number, resolve_numeric_field,
    resolve_raw_field, resolve_text, resolve_text_field, slot_index, truncate_to_u32,
    FieldAliases,
};
pub use router::{
    accept_packet_router_ack, decode_packet_router_ack, decode_packet_router_query,
    RouterMessage,
};
pub use sequencer::{CommandIdSequencer, CommandStamper, OutboundStamp, COMMAND_ID_SEED};
pub use value::{AccessorError, MessageSource, TypedArray, WireMessage, WireValue};
pub use wrapper::{
    coerce_bytes, decode_wrapper_chunk, decode_wrapper_chunk_fields, resolve_wrapper_chunk,
    split_into_chunks, try_resolve_wrapper_chunk, WrapperChunk, WRAPPER_HEADER_LEN,
};

pub use lockstep_core::{ArgumentError, CommandPolicy, CommandTag, CommandType};

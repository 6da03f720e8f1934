//! Wrapper chunks: fragments of a command too large for one transport message.
//!
//! Binary layout, little-endian, no padding:
//!
//! ```text
//! [0]  wrapped_command_id  u16
//! [2]  chunk_number        u32
//! [6]  num_chunks          u32
//! [10] total_data_length   u32
//! [14] chunk_data_length   u32
//! [18] data_offset         u32
//! [22] chunk_data          chunk_data_length bytes
//! ```
//!
//! Decoding fails closed: the buffer must be exactly header plus declared data.

use crate::error::{ChunkEncodeError, ChunkRejection};
use crate::resolve::{
    exact_integer, resolve_number, resolve_numeric_field, resolve_raw_field, FieldAliases,
};
use crate::value::{MessageSource, WireValue};
use serde::Serialize;
use tracing::trace;

/// Size of the fixed binary header.
pub const WRAPPER_HEADER_LEN: usize = 22;

const WRAPPED_COMMAND_ID: FieldAliases = FieldAliases::new(
    &["wrappedCommandId", "wrappedCmdId", "wrappedCommandID"],
    &["getWrappedCommandID", "getWrappedCommandId"],
);
const CHUNK_NUMBER: FieldAliases =
    FieldAliases::new(&["chunkNumber", "chunkNum", "chunkIndex"], &["getChunkNumber"]);
const NUM_CHUNKS: FieldAliases =
    FieldAliases::new(&["numChunks", "chunkCount", "totalChunks"], &["getNumChunks"]);
const TOTAL_DATA_LENGTH: FieldAliases =
    FieldAliases::new(&["totalDataLength", "totalLength"], &["getTotalDataLength"]);
const DATA_OFFSET: FieldAliases = FieldAliases::new(&["dataOffset", "offset"], &["getDataOffset"]);
const DATA_LENGTH: FieldAliases =
    FieldAliases::new(&["dataLength", "chunkDataLength"], &["getDataLength"]);
const PAYLOAD: FieldAliases =
    FieldAliases::new(&["payload", "data", "chunkData"], &["getData", "getPayload"]);

/// One fragment of a wrapped command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrapperChunk {
    /// Command id of the wrapped (reassembled) command.
    pub wrapped_command_id: u16,
    /// Index of this fragment.
    pub chunk_number: u32,
    /// Fragment count; zero means the command was not actually chunked.
    pub num_chunks: u32,
    /// Length of the reassembled command.
    pub total_data_length: u32,
    /// Offset of this fragment in the reassembled command.
    pub data_offset: u32,
    /// Fragment bytes.
    pub chunk_data: Vec<u8>,
}

impl WrapperChunk {
    /// Parse the binary form.
    pub fn parse(bytes: &[u8]) -> Result<Self, ChunkRejection> {
        if bytes.len() < WRAPPER_HEADER_LEN {
            return Err(ChunkRejection::Truncated {
                actual: bytes.len(),
                required: WRAPPER_HEADER_LEN,
            });
        }
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };

        let wrapped_command_id = u16::from_le_bytes([bytes[0], bytes[1]]);
        let chunk_number = u32_at(2);
        let num_chunks = u32_at(6);
        let total_data_length = u32_at(10);
        let chunk_data_length = u32_at(14) as usize;
        let data_offset = u32_at(18);

        let body = &bytes[WRAPPER_HEADER_LEN..];
        if num_chunks == 0 && chunk_data_length != 0 {
            return Err(ChunkRejection::UnchunkedWithData(chunk_data_length));
        }
        if body.len() != chunk_data_length {
            return Err(ChunkRejection::LengthMismatch {
                declared: chunk_data_length,
                actual: body.len(),
            });
        }

        Ok(Self {
            wrapped_command_id,
            chunk_number,
            num_chunks,
            total_data_length,
            data_offset,
            chunk_data: body.to_vec(),
        })
    }

    /// Parse the object form from any message source.
    ///
    /// Every numeric field accepts numeric strings. `dataLength`, when given,
    /// must match the payload; a missing payload means no data.
    pub fn from_fields<S>(source: &S) -> Result<Self, ChunkRejection>
    where
        S: MessageSource + ?Sized,
    {
        let field = |aliases: &FieldAliases, name: &'static str, max: u32| {
            resolve_numeric_field(source, aliases)
                .and_then(|n| exact_integer(n, max))
                .ok_or(ChunkRejection::InvalidField(name))
        };

        let wrapped_command_id =
            field(&WRAPPED_COMMAND_ID, "wrappedCommandId", u32::from(u16::MAX))? as u16;
        let chunk_number = field(&CHUNK_NUMBER, "chunkNumber", u32::MAX)?;
        let num_chunks = field(&NUM_CHUNKS, "numChunks", u32::MAX)?;
        let total_data_length = field(&TOTAL_DATA_LENGTH, "totalDataLength", u32::MAX)?;
        let data_offset = field(&DATA_OFFSET, "dataOffset", u32::MAX)?;

        let chunk_data = match resolve_raw_field(source, &PAYLOAD) {
            Some(value) => coerce_bytes(&value).ok_or(ChunkRejection::InvalidPayload)?,
            None => Vec::new(),
        };

        if let Some(declared) = resolve_numeric_field(source, &DATA_LENGTH) {
            let declared = exact_integer(declared, u32::MAX)
                .ok_or(ChunkRejection::InvalidField("dataLength"))? as usize;
            if declared != chunk_data.len() {
                return Err(ChunkRejection::LengthMismatch {
                    declared,
                    actual: chunk_data.len(),
                });
            }
        }
        if num_chunks == 0 && !chunk_data.is_empty() {
            return Err(ChunkRejection::UnchunkedWithData(chunk_data.len()));
        }

        Ok(Self {
            wrapped_command_id,
            chunk_number,
            num_chunks,
            total_data_length,
            data_offset,
            chunk_data,
        })
    }

    /// Encode the binary form.
    pub fn encode(&self) -> Result<Vec<u8>, ChunkEncodeError> {
        if self.num_chunks == 0 && !self.chunk_data.is_empty() {
            return Err(ChunkEncodeError::UnchunkedWithData(self.chunk_data.len()));
        }
        let data_len = u32::try_from(self.chunk_data.len())
            .map_err(|_| ChunkEncodeError::TooLarge(self.chunk_data.len()))?;

        let mut out = Vec::with_capacity(WRAPPER_HEADER_LEN + self.chunk_data.len());
        out.extend_from_slice(&self.wrapped_command_id.to_le_bytes());
        out.extend_from_slice(&self.chunk_number.to_le_bytes());
        out.extend_from_slice(&self.num_chunks.to_le_bytes());
        out.extend_from_slice(&self.total_data_length.to_le_bytes());
        out.extend_from_slice(&data_len.to_le_bytes());
        out.extend_from_slice(&self.data_offset.to_le_bytes());
        out.extend_from_slice(&self.chunk_data);
        Ok(out)
    }

    /// Object form using the primary field names.
    ///
    /// Data is emitted as a number list: a byte buffer under `payload` would
    /// be read back as the binary form.
    pub fn to_wire_value(&self) -> WireValue {
        WireValue::object([
            ("wrappedCommandId", WireValue::from(self.wrapped_command_id)),
            ("chunkNumber", WireValue::from(self.chunk_number)),
            ("numChunks", WireValue::from(self.num_chunks)),
            ("totalDataLength", WireValue::from(self.total_data_length)),
            ("dataOffset", WireValue::from(self.data_offset)),
            ("dataLength", WireValue::Number(self.chunk_data.len() as f64)),
            (
                "payload",
                WireValue::List(
                    self.chunk_data
                        .iter()
                        .map(|&b| WireValue::from(u32::from(b)))
                        .collect(),
                ),
            ),
        ])
    }
}

/// Decode the binary form, returning no value on any rejection.
pub fn decode_wrapper_chunk(bytes: &[u8]) -> Option<WrapperChunk> {
    WrapperChunk::parse(bytes)
        .map_err(|err| trace!(kind = ?err.kind(), "wrapper chunk rejected: {err}"))
        .ok()
}

/// Decode the object form, returning no value on any rejection.
pub fn decode_wrapper_chunk_fields<S>(source: &S) -> Option<WrapperChunk>
where
    S: MessageSource + ?Sized,
{
    WrapperChunk::from_fields(source)
        .map_err(|err| trace!(kind = ?err.kind(), "wrapper chunk fields rejected: {err}"))
        .ok()
}

/// Decode a chunk from whatever shape it arrived in.
///
/// A binary buffer, either the whole input or a buffer-valued `payload`/`data`
/// field, is decoded as the self-describing binary form and any sidecar fields
/// are ignored. Otherwise the object form applies.
pub fn try_resolve_wrapper_chunk<S>(source: &S) -> Result<WrapperChunk, ChunkRejection>
where
    S: MessageSource + ?Sized,
{
    if let Some(value) = source.as_value() {
        if value.is_buffer() {
            let bytes = coerce_bytes(value).ok_or(ChunkRejection::InvalidPayload)?;
            return WrapperChunk::parse(&bytes);
        }
        if !matches!(value, WireValue::Object(_)) {
            return Err(ChunkRejection::NotAChunk);
        }
    }
    if let Some(raw) = resolve_raw_field(source, &PAYLOAD).filter(WireValue::is_buffer) {
        let bytes = coerce_bytes(&raw).ok_or(ChunkRejection::InvalidPayload)?;
        return WrapperChunk::parse(&bytes);
    }
    WrapperChunk::from_fields(source)
}

/// [`try_resolve_wrapper_chunk`] with rejections collapsed to no value.
pub fn resolve_wrapper_chunk<S>(source: &S) -> Option<WrapperChunk>
where
    S: MessageSource + ?Sized,
{
    try_resolve_wrapper_chunk(source)
        .map_err(|err| trace!(kind = ?err.kind(), "wrapper chunk rejected: {err}"))
        .ok()
}

/// Coerce a loosely-typed value to bytes.
///
/// Accepts raw buffers as-is, typed arrays by their byte representation,
/// text one character code per byte (Latin-1 only), and sequences whose every
/// element is a byte-valued number or numeric string. One bad element fails
/// the whole coercion.
pub fn coerce_bytes(value: &WireValue) -> Option<Vec<u8>> {
    match value {
        WireValue::Bytes(bytes) => Some(bytes.clone()),
        WireValue::Typed(array) => Some(array.to_le_bytes()),
        WireValue::Text(text) => text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect(),
        WireValue::List(items) => items.iter().map(coerce_byte).collect(),
        _ => None,
    }
}

fn coerce_byte(value: &WireValue) -> Option<u8> {
    resolve_number(value)
        .and_then(|n| exact_integer(n, u32::from(u8::MAX)))
        .map(|n| n as u8)
}

/// Split a command into wrapper chunks of at most `max_chunk_data_len` bytes.
///
/// An empty payload yields a single unchunked (`num_chunks == 0`) wrapper.
pub fn split_into_chunks(
    wrapped_command_id: u16,
    payload: &[u8],
    max_chunk_data_len: usize,
) -> Result<Vec<WrapperChunk>, ChunkEncodeError> {
    if max_chunk_data_len == 0 {
        return Err(ChunkEncodeError::ZeroChunkSize);
    }
    let total_data_length =
        u32::try_from(payload.len()).map_err(|_| ChunkEncodeError::TooLarge(payload.len()))?;

    if payload.is_empty() {
        return Ok(vec![WrapperChunk {
            wrapped_command_id,
            chunk_number: 0,
            num_chunks: 0,
            total_data_length: 0,
            data_offset: 0,
            chunk_data: Vec::new(),
        }]);
    }

    let pieces = payload.chunks(max_chunk_data_len);
    let num_chunks =
        u32::try_from(pieces.len()).map_err(|_| ChunkEncodeError::TooLarge(payload.len()))?;

    Ok(pieces
        .enumerate()
        .map(|(index, piece)| WrapperChunk {
            wrapped_command_id,
            chunk_number: index as u32,
            num_chunks,
            total_data_length,
            data_offset: (index * max_chunk_data_len) as u32,
            chunk_data: piece.to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionKind;
    use crate::value::{TypedArray, WireMessage};
    use serde_json::json;

    fn header(id: u16, number: u32, count: u32, total: u32, data_len: u32, offset: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_le_bytes());
        for field in [number, count, total, data_len, offset] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out
    }

    #[test]
    fn decodes_binary_chunk() {
        let mut bytes = header(0x1234, 0, 2, 8, 4, 0);
        bytes.extend_from_slice(&[9, 8, 7, 6]);
        assert_eq!(
            decode_wrapper_chunk(&bytes),
            Some(WrapperChunk {
                wrapped_command_id: 0x1234,
                chunk_number: 0,
                num_chunks: 2,
                total_data_length: 8,
                data_offset: 0,
                chunk_data: vec![9, 8, 7, 6],
            })
        );
    }

    #[test]
    fn header_layout_is_little_endian() {
        let chunk = WrapperChunk {
            wrapped_command_id: 0x1234,
            chunk_number: 1,
            num_chunks: 2,
            total_data_length: 8,
            data_offset: 4,
            chunk_data: vec![0xAA, 0xBB],
        };
        let bytes = chunk.encode().unwrap();
        assert_eq!(bytes.len(), WRAPPER_HEADER_LEN + 2);
        assert_eq!(&bytes[0..2], &[0x34, 0x12]);
        assert_eq!(&bytes[14..18], &[2, 0, 0, 0]);
        assert_eq!(&bytes[18..22], &[4, 0, 0, 0]);
        assert_eq!(WrapperChunk::parse(&bytes), Ok(chunk));
    }

    #[test]
    fn unchunked_with_trailing_byte_is_rejected() {
        let mut bytes = header(0x1234, 0, 0, 8, 0, 0);
        assert!(decode_wrapper_chunk(&bytes).is_some());
        bytes.push(0);
        assert_eq!(decode_wrapper_chunk(&bytes), None);
    }

    #[test]
    fn unchunked_with_declared_data_is_rejected() {
        let mut bytes = header(1, 0, 0, 1, 1, 0);
        bytes.push(5);
        assert_eq!(
            WrapperChunk::parse(&bytes),
            Err(ChunkRejection::UnchunkedWithData(1))
        );
    }

    #[test]
    fn trailing_and_missing_bytes_are_corruption() {
        let mut long = header(1, 0, 1, 2, 2, 0);
        long.extend_from_slice(&[1, 2, 3]);
        let err = WrapperChunk::parse(&long).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::Corruption);

        let mut short = header(1, 0, 1, 2, 2, 0);
        short.push(1);
        assert_eq!(
            WrapperChunk::parse(&short),
            Err(ChunkRejection::LengthMismatch {
                declared: 2,
                actual: 1,
            })
        );

        assert!(matches!(
            WrapperChunk::parse(&[0; 21]),
            Err(ChunkRejection::Truncated { actual: 21, .. })
        ));
    }

    #[test]
    fn huge_declared_length_is_rejected_without_allocating() {
        let bytes = header(1, 0, 1, u32::MAX, u32::MAX, 0);
        assert!(decode_wrapper_chunk(&bytes).is_none());
    }

    #[test]
    fn decodes_object_form_aliases() {
        let value = WireValue::from(json!({
            "wrappedCmdId": "4660",
            "chunkNumber": "0",
            "numChunks": "1",
            "totalDataLength": "4",
            "dataOffset": "0",
            "dataLength": "4",
            "payload": [1, 2, 3, 4],
        }));
        assert_eq!(
            decode_wrapper_chunk_fields(&value),
            Some(WrapperChunk {
                wrapped_command_id: 4660,
                chunk_number: 0,
                num_chunks: 1,
                total_data_length: 4,
                data_offset: 0,
                chunk_data: vec![1, 2, 3, 4],
            })
        );
    }

    #[test]
    fn object_form_length_must_match() {
        let value = WireValue::from(json!({
            "wrappedCommandId": 1, "chunkNumber": 0, "numChunks": 1,
            "totalDataLength": 4, "dataOffset": 0, "dataLength": 3,
            "data": [1, 2, 3, 4],
        }));
        assert_eq!(
            WrapperChunk::from_fields(&value),
            Err(ChunkRejection::LengthMismatch {
                declared: 3,
                actual: 4,
            })
        );
    }

    #[test]
    fn object_form_requires_integral_fields() {
        let value = WireValue::from(json!({
            "wrappedCommandId": 70000, "chunkNumber": 0, "numChunks": 1,
            "totalDataLength": 4, "dataOffset": 0,
        }));
        assert_eq!(
            WrapperChunk::from_fields(&value),
            Err(ChunkRejection::InvalidField("wrappedCommandId"))
        );

        let value = WireValue::from(json!({
            "wrappedCommandId": 1, "chunkNumber": 0.5, "numChunks": 1,
            "totalDataLength": 4, "dataOffset": 0,
        }));
        assert_eq!(
            WrapperChunk::from_fields(&value),
            Err(ChunkRejection::InvalidField("chunkNumber"))
        );
    }

    #[test]
    fn object_form_unchunked_rejects_payload() {
        let value = WireValue::from(json!({
            "wrappedCommandId": 1, "chunkNumber": 0, "numChunks": 0,
            "totalDataLength": 0, "dataOffset": 0, "payload": [1],
        }));
        assert_eq!(
            WrapperChunk::from_fields(&value),
            Err(ChunkRejection::UnchunkedWithData(1))
        );
    }

    #[test]
    fn object_form_from_getters() {
        let msg = WireMessage::new()
            .with_getter("getWrappedCommandID", 7)
            .with_getter("getChunkNumber", 1)
            .with_getter("getNumChunks", 3)
            .with_getter("getTotalDataLength", 9)
            .with_getter("getDataOffset", 3)
            .with_getter("getData", WireValue::Bytes(vec![4, 5, 6]));
        let chunk = decode_wrapper_chunk_fields(&msg).unwrap();
        assert_eq!(chunk.wrapped_command_id, 7);
        assert_eq!(chunk.chunk_data, vec![4, 5, 6]);
    }

    #[test]
    fn byte_coercion() {
        let mixed = WireValue::from(json!([1, "2", 3]));
        assert_eq!(coerce_bytes(&mixed), Some(vec![1, 2, 3]));
        assert_eq!(coerce_bytes(&WireValue::from(json!([1, "bad"]))), None);
        assert_eq!(coerce_bytes(&WireValue::from(json!([256]))), None);
        assert_eq!(coerce_bytes(&WireValue::from(json!([1.5]))), None);
        assert_eq!(coerce_bytes(&"AB".into()), Some(vec![65, 66]));
        assert_eq!(coerce_bytes(&"\u{263A}".into()), None);
        assert_eq!(
            coerce_bytes(&TypedArray::U16(vec![0x0201]).into()),
            Some(vec![1, 2])
        );
        assert_eq!(coerce_bytes(&WireValue::Bytes(vec![7])), Some(vec![7]));
        assert_eq!(coerce_bytes(&WireValue::Number(3.0)), None);
    }

    #[test]
    fn binary_payload_wins_over_sidecar_fields() {
        let chunk = WrapperChunk {
            wrapped_command_id: 99,
            chunk_number: 0,
            num_chunks: 1,
            total_data_length: 2,
            data_offset: 0,
            chunk_data: vec![1, 2],
        };
        let value = WireValue::object([
            ("wrappedCommandId", WireValue::Number(5.0)),
            ("numChunks", WireValue::Number(40.0)),
            ("payload", WireValue::Bytes(chunk.encode().unwrap())),
        ]);
        assert_eq!(resolve_wrapper_chunk(&value), Some(chunk.clone()));

        let bare = WireValue::Bytes(chunk.encode().unwrap());
        assert_eq!(resolve_wrapper_chunk(&bare), Some(chunk));
    }

    #[test]
    fn corrupt_binary_payload_does_not_fall_back_to_fields() {
        let value = WireValue::object([
            ("wrappedCommandId", WireValue::Number(5.0)),
            ("chunkNumber", WireValue::Number(0.0)),
            ("numChunks", WireValue::Number(1.0)),
            ("totalDataLength", WireValue::Number(2.0)),
            ("dataOffset", WireValue::Number(0.0)),
            ("payload", WireValue::Bytes(vec![1, 2])),
        ]);
        assert_eq!(resolve_wrapper_chunk(&value), None);
    }

    #[test]
    fn resolution_falls_back_to_object_form() {
        let value = WireValue::from(json!({
            "wrappedCmdId": 3, "chunkNumber": 0, "numChunks": 1,
            "totalDataLength": 2, "dataOffset": 0, "payload": [5, 6],
        }));
        assert_eq!(
            resolve_wrapper_chunk(&value).map(|c| c.chunk_data),
            Some(vec![5, 6])
        );
        assert_eq!(
            try_resolve_wrapper_chunk(&WireValue::Number(1.0)),
            Err(ChunkRejection::NotAChunk)
        );
    }

    #[test]
    fn object_form_round_trips_through_wire_value() {
        let chunk = WrapperChunk {
            wrapped_command_id: 12,
            chunk_number: 2,
            num_chunks: 3,
            total_data_length: 30,
            data_offset: 20,
            chunk_data: vec![1; 10],
        };
        assert_eq!(WrapperChunk::from_fields(&chunk.to_wire_value()), Ok(chunk.clone()));
        assert_eq!(resolve_wrapper_chunk(&chunk.to_wire_value()), Some(chunk));
    }

    #[test]
    fn encode_refuses_unchunked_data() {
        let chunk = WrapperChunk {
            wrapped_command_id: 1,
            chunk_number: 0,
            num_chunks: 0,
            total_data_length: 1,
            data_offset: 0,
            chunk_data: vec![1],
        };
        assert_eq!(chunk.encode(), Err(ChunkEncodeError::UnchunkedWithData(1)));
    }

    #[test]
    fn split_covers_payload() {
        let payload: Vec<u8> = (0..10).collect();
        let chunks = split_into_chunks(5, &payload, 4).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.num_chunks == 3 && c.total_data_length == 10));
        assert_eq!(
            chunks.iter().map(|c| c.data_offset).collect::<Vec<_>>(),
            vec![0, 4, 8]
        );
        assert_eq!(chunks[2].chunk_data, vec![8, 9]);
    }

    #[test]
    fn split_empty_and_zero_size() {
        let chunks = split_into_chunks(5, &[], 4).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].num_chunks, 0);
        assert!(chunks[0].encode().is_ok());
        assert_eq!(
            split_into_chunks(5, &[1], 0),
            Err(ChunkEncodeError::ZeroChunkSize)
        );
    }
}

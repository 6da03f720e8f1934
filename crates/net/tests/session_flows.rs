//! End-to-end flows through the command synchronization layer.

use lockstep_core::CommandType;
use lockstep_net::{
    accept_packet_router_ack, classify_inbound, split_into_chunks, AccessorError, CommandStamper,
    HashKind, InboundCommand, WireMessage, WireValue, WrapperAssembler,
};
use serde_json::json;

const MAX_SLOTS: usize = 8;

#[test]
fn oversized_command_survives_fragmentation_over_the_wire() {
    let mut stamper = CommandStamper::new();
    let stamp = stamper.stamp(CommandType::Wrapper);
    let wrapped_id = stamp.command_id.expect("wrapper commands carry ids");

    let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let chunks = split_into_chunks(wrapped_id, &payload, 400).unwrap();
    assert_eq!(chunks.len(), 3);

    let mut assembler = WrapperAssembler::new();
    let mut assembled = None;
    for chunk in chunks.iter().rev() {
        let message = WireValue::object([
            ("commandType", WireValue::from(u32::from(CommandType::Wrapper.tag()))),
            ("payload", WireValue::Bytes(chunk.encode().unwrap())),
        ]);
        let Some(InboundCommand::Wrapper(decoded)) = classify_inbound(&message, MAX_SLOTS) else {
            panic!("wrapper chunk failed to classify");
        };
        assert_eq!(&decoded, chunk);
        if let Some(bytes) = assembler.ingest(&decoded).unwrap() {
            assembled = Some(bytes);
        }
    }
    assert_eq!(assembled, Some(payload));
}

#[test]
fn object_form_chunks_reassemble() {
    let chunks = split_into_chunks(77, b"lockstep", 3).unwrap();
    let mut assembler = WrapperAssembler::new();
    let mut assembled = None;
    for chunk in &chunks {
        let mut message = chunk.to_wire_value();
        if let WireValue::Object(map) = &mut message {
            map.insert("type".into(), "NETCOMMANDTYPE_WRAPPER".into());
        }
        let Some(InboundCommand::Wrapper(decoded)) = classify_inbound(&message, MAX_SLOTS) else {
            panic!("object-form chunk failed to classify");
        };
        assembled = assembler.ingest(&decoded).unwrap().or(assembled);
    }
    assert_eq!(assembled.as_deref(), Some(&b"lockstep"[..]));
}

#[test]
fn frame_info_from_mixed_encodings() {
    let flat = WireValue::from(json!({
        "commandType": 3, "sender": 2, "frame": 14, "commandCount": 5, "frameHash": 0x1020,
    }));
    let getters = WireMessage::new()
        .with_getter("getNetCommandType", "FrameInfo")
        .with_getter("getPlayerID", 2)
        .with_getter("getExecutionFrame", "14")
        .with_getter("getCommandCount", 5)
        .with_accessor("getLogicCRC", || Err(AccessorError::new("getLogicCRC", "unavailable")))
        .with_getter("getFrameHash", 0x1020);

    let a = classify_inbound(&flat, MAX_SLOTS).unwrap();
    let b = classify_inbound(&getters, MAX_SLOTS).unwrap();
    assert_eq!(a, b);
    match a {
        InboundCommand::FrameInfo(info) => {
            assert_eq!(info.hash.map(|h| h.kind), Some(HashKind::FrameHash));
            assert_eq!(info.hash.map(|h| h.value), Some(0x1020));
        }
        other => panic!("expected frame info, got {other:?}"),
    }
}

#[test]
fn router_election_ignores_forged_acks() {
    let current_router = 1;
    let genuine = WireValue::from(json!({"commandType": 26, "sender": 1}));
    let forged = WireValue::from(json!({"commandType": 26, "sender": 5}));

    let accepted: Vec<bool> = [genuine, forged]
        .iter()
        .map(|msg| match classify_inbound(msg, MAX_SLOTS) {
            Some(InboundCommand::PacketRouterAck(ack)) => {
                accept_packet_router_ack(&ack, current_router)
            }
            other => panic!("expected router ack, got {other:?}"),
        })
        .collect();
    assert_eq!(accepted, vec![true, false]);
}

#[test]
fn outbound_ids_follow_send_order_across_types() {
    let mut stamper = CommandStamper::new();
    let sent = [
        CommandType::GameCommand,
        CommandType::KeepAlive,
        CommandType::RunAheadMetrics,
        CommandType::PacketRouterQuery,
        CommandType::FrameInfo,
    ];
    let ids: Vec<Option<u16>> = sent.iter().map(|&ty| stamper.stamp(ty).command_id).collect();
    assert_eq!(ids, vec![Some(64001), None, Some(64002), None, Some(64003)]);

    let fresh = stamper.next_session();
    assert_eq!(fresh.current_id(), 64000);
}

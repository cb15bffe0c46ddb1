use sentinelfs_wire::{capability, Frame, FrameCodec, Hello, Message, MsgType, Reject, RejectReason, Welcome};
use tokio_util::codec::{Decoder, Encoder};
use bytes::BytesMut;

fn frame_for(msg: &Message, seq: u32) -> Frame {
    Frame::new(msg.msg_type() as u16, seq, msg.encode_payload())
}

fn round_trip(frame: Frame) -> Message {
    let bytes = frame.encode().unwrap();
    let decoded = Frame::decode(&bytes).unwrap();
    let msg_type = MsgType::try_from(decoded.msg_type).unwrap();
    Message::decode(msg_type, &decoded.payload).unwrap()
}

#[test]
fn hello_welcome_handshake_round_trips_through_frames() {
    let hello = Message::Hello(Hello {
        protocol_version: 1,
        peer_id: b"client-01".to_vec(),
        session_code: b"mesh-secret".to_vec(),
        capabilities: capability::DELTA_SYNC | capability::RESUME,
        proposed_chunk_size: 65536,
    });
    let decoded_hello = round_trip(frame_for(&hello, 0));
    assert_eq!(decoded_hello, hello);

    let welcome = Message::Welcome(Welcome {
        protocol_version: 1,
        peer_id: b"server-01".to_vec(),
        capabilities: capability::DELTA_SYNC,
        agreed_chunk_size: 65536,
    });
    let decoded_welcome = round_trip(frame_for(&welcome, 1));
    assert_eq!(decoded_welcome, welcome);
}

#[test]
fn reject_handshake_round_trips() {
    let reject = Message::Reject(Reject {
        reason: RejectReason::VersionIncompatible,
        message: b"client speaks protocol 2, server speaks 1".to_vec(),
    });
    let decoded = round_trip(frame_for(&reject, 0));
    assert_eq!(decoded, reject);
}

#[test]
fn codec_streams_a_full_handshake_over_one_buffer() {
    let hello = Message::Hello(Hello {
        protocol_version: 1,
        peer_id: b"client-01".to_vec(),
        session_code: b"mesh-secret".to_vec(),
        capabilities: capability::DELTA_SYNC,
        proposed_chunk_size: 4096,
    });
    let welcome = Message::Welcome(Welcome {
        protocol_version: 1,
        peer_id: b"server-01".to_vec(),
        capabilities: capability::DELTA_SYNC,
        agreed_chunk_size: 4096,
    });

    let mut codec = FrameCodec;
    let mut buf = BytesMut::new();
    codec.encode(frame_for(&hello, 0), &mut buf).unwrap();
    codec.encode(frame_for(&welcome, 1), &mut buf).unwrap();

    let first = codec.decode(&mut buf).unwrap().unwrap();
    let second = codec.decode(&mut buf).unwrap().unwrap();
    assert!(codec.decode(&mut buf).unwrap().is_none());

    let first_type = MsgType::try_from(first.msg_type).unwrap();
    let second_type = MsgType::try_from(second.msg_type).unwrap();
    assert_eq!(Message::decode(first_type, &first.payload).unwrap(), hello);
    assert_eq!(Message::decode(second_type, &second.payload).unwrap(), welcome);
}

// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Codec round-trip coverage: every message shape the scripted sessions
//! put on the wire must survive `decode ∘ encode` byte-for-byte.

use dgram_coap::{
    BlockInfo, ContentFormat, Error, MessageRead, MessageWrite, MsgCode, MsgToken, MsgType,
    OptionInsert, OptionNumber, OwnedImmutableMessage, VecMessageEncoder,
};

fn encode_message(
    msg_type: MsgType,
    code: MsgCode,
    mid: u16,
    token: MsgToken,
    build: impl FnOnce(&mut VecMessageEncoder),
) -> Vec<u8> {
    let mut encoder = VecMessageEncoder::new();
    encoder.set_msg_type(msg_type);
    encoder.set_msg_code(code);
    encoder.set_msg_id(mid);
    encoder.set_msg_token(token);
    build(&mut encoder);
    encoder.into()
}

/// Decodes and re-encodes the message, asserting byte equality both ways.
fn assert_round_trip(bytes: Vec<u8>) -> OwnedImmutableMessage {
    let message = OwnedImmutableMessage::new(bytes.clone()).expect("decode failed");

    let mut encoder = VecMessageEncoder::new();
    message.write_msg_to(&mut encoder).expect("re-encode failed");
    assert_eq!(bytes, Vec::<u8>::from(encoder), "re-encoded bytes differ");

    let reparsed = OwnedImmutableMessage::new(bytes).expect("re-decode failed");
    assert_eq!(message, reparsed);

    message
}

#[test]
fn block_put_request_round_trip() {
    let token = MsgToken::new(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02, 0x03]);
    let bytes = encode_message(MsgType::Con, MsgCode::MethodPut, 0x4321, token, |encoder| {
        encoder
            .insert_option_str(OptionNumber::URI_PATH, "blocks")
            .unwrap();
        encoder
            .insert_option_str(OptionNumber::URI_PATH, "put")
            .unwrap();
        encoder
            .insert_option_uint(OptionNumber::CONTENT_FORMAT, 0)
            .unwrap();
        encoder
            .insert_option_uint(
                OptionNumber::BLOCK1,
                BlockInfo::new(0, true, 3).unwrap().0,
            )
            .unwrap();
        encoder.append_payload_bytes(&[b'-'; 128]).unwrap();
    });

    let message = assert_round_trip(bytes);
    assert_eq!(MsgCode::MethodPut, message.msg_code());
    assert_eq!(token, message.msg_token());
    assert_eq!(Some(ContentFormat::TEXT_PLAIN_UTF8), message.content_format());

    let block1 = message.block1().unwrap();
    assert_eq!(0, block1.num());
    assert!(block1.more_flag());
    assert_eq!(128, block1.len());
    assert_eq!(128, message.payload().len());
}

#[test]
fn piggybacked_ack_round_trip() {
    let token = MsgToken::new(&[0x01, 0x02]);
    let bytes = encode_message(
        MsgType::Ack,
        MsgCode::SuccessChanged,
        0x0001,
        token,
        |encoder| {
            encoder
                .insert_option_uint(
                    OptionNumber::BLOCK1,
                    BlockInfo::new(1, true, 4).unwrap().0,
                )
                .unwrap();
        },
    );

    let message = assert_round_trip(bytes);
    assert_eq!(MsgType::Ack, message.msg_type());
    assert_eq!(MsgCode::SuccessChanged, message.msg_code());
    let block1 = message.block1().unwrap();
    assert_eq!(1, block1.num());
    assert_eq!(256, block1.len());
    assert!(message.payload().is_empty());
}

#[test]
fn empty_ack_with_zero_length_token_round_trip() {
    let bytes = encode_message(
        MsgType::Ack,
        MsgCode::Empty,
        0xBEEF,
        MsgToken::EMPTY,
        |_| {},
    );

    assert_eq!(4, bytes.len());
    let message = assert_round_trip(bytes);
    assert_eq!(MsgToken::EMPTY, message.msg_token());
    assert!(message.payload().is_empty());
}

#[test]
fn reset_round_trip() {
    let bytes = encode_message(
        MsgType::Rst,
        MsgCode::Empty,
        0x00FF,
        MsgToken::EMPTY,
        |_| {},
    );

    let message = assert_round_trip(bytes);
    assert_eq!(MsgType::Rst, message.msg_type());
    assert_eq!(MsgCode::Empty, message.msg_code());
}

#[test]
fn options_survive_in_ascending_order() {
    let bytes = encode_message(
        MsgType::Con,
        MsgCode::MethodPost,
        0x1000,
        MsgToken::new(&[0xAA]),
        |encoder| {
            encoder
                .insert_option_str(OptionNumber::URI_PATH, "unexpected-block1")
                .unwrap();
            encoder
                .insert_option_uint(OptionNumber::CONTENT_FORMAT, 50)
                .unwrap();
            encoder
                .insert_option_uint(OptionNumber::SIZE1, 1024)
                .unwrap();
            encoder.append_payload_bytes(b"Lorem ipsum...").unwrap();
        },
    );

    let message = assert_round_trip(bytes);
    let numbers: Vec<OptionNumber> = message
        .options()
        .map(|option| option.unwrap().0)
        .collect();
    assert_eq!(
        vec![
            OptionNumber::URI_PATH,
            OptionNumber::CONTENT_FORMAT,
            OptionNumber::SIZE1
        ],
        numbers
    );

    let mut sorted = numbers.clone();
    sorted.sort();
    assert_eq!(sorted, numbers);
}

#[test]
fn truncated_datagrams_are_rejected() {
    assert_eq!(
        Err(Error::ParseFailure),
        OwnedImmutableMessage::new(vec![0x40])
    );
    assert_eq!(
        Err(Error::ParseFailure),
        OwnedImmutableMessage::new(vec![0x40, 0x01, 0x00])
    );

    // Token length claims four bytes; only two are present.
    assert_eq!(
        Err(Error::ParseFailure),
        OwnedImmutableMessage::new(vec![0x44, 0x01, 0x00, 0x01, 0xAA, 0xBB])
    );
}

#[test]
fn trailing_garbage_in_options_is_rejected() {
    // A well-formed GET followed by an option whose value overruns the
    // datagram.
    let mut bytes = encode_message(
        MsgType::Con,
        MsgCode::MethodGet,
        0x0002,
        MsgToken::EMPTY,
        |_| {},
    );
    bytes.push(0xB4); // Uri-Path, length 4...
    bytes.push(b'x'); // ...but only one byte follows.

    assert_eq!(Err(Error::ParseFailure), OwnedImmutableMessage::new(bytes));
}

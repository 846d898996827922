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

//! Scripted end-to-end sessions against the virtual clock, covering the
//! block-wise transfer and reliability behaviors of the endpoint.

use dgram_coap::testing::{EndpointHarness, SentDatagram};
use dgram_coap::{
    BlockInfo, BlockSize, CoapRequest, ContentFormat, Event, MessageRead, MessageWrite, MsgCode,
    MsgId, MsgToken, MsgType, OptionInsert, OptionNumber, SizeAdoption, VecMessageEncoder,
};

/// Deterministic payload shaped like the separator-line fixtures used
/// throughout: 128-character lines joined by newlines, truncated to `len`.
fn make_payload(len: usize) -> Vec<u8> {
    let mut line: String = "-".repeat(128);
    line.push('\n');
    line.bytes().cycle().take(len).collect()
}

fn ack_bytes(
    mid: MsgId,
    token: MsgToken,
    code: MsgCode,
    block1: Option<BlockInfo>,
) -> Vec<u8> {
    let mut encoder = VecMessageEncoder::new();
    encoder.set_msg_type(MsgType::Ack);
    encoder.set_msg_code(code);
    encoder.set_msg_id(mid);
    encoder.set_msg_token(token);
    if let Some(block1) = block1 {
        encoder
            .insert_option_uint(OptionNumber::BLOCK1, block1.0)
            .unwrap();
    }
    encoder.into()
}

fn rst_bytes(mid: MsgId) -> Vec<u8> {
    let mut encoder = VecMessageEncoder::new();
    encoder.set_msg_type(MsgType::Rst);
    encoder.set_msg_code(MsgCode::Empty);
    encoder.set_msg_id(mid);
    encoder.set_msg_token(MsgToken::EMPTY);
    encoder.into()
}

fn event_names(events: &[Event]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            Event::Acknowledged(_) => "acknowledged",
            Event::BlockSent(_) => "block sent",
            Event::Response(_) => "response",
            Event::Timeout => "timeout",
            Event::Reset => "reset",
            Event::Cancelled => "cancelled",
            Event::SendFailed(_) => "send failed",
        })
        .collect()
}

fn assert_block1(sent: &SentDatagram, num: u32, more: bool, szx: u8) {
    let block1 = sent.message().block1().expect("datagram has no Block1");
    assert_eq!(num, block1.num(), "block1 num of {}", sent.message());
    assert_eq!(more, block1.more_flag(), "block1 m of {}", sent.message());
    assert_eq!(szx, block1.szx(), "block1 szx of {}", sent.message());
}

/// Out-of-order size renegotiation is ignored: the server acknowledges
/// block 1 while asking to grow from 128 to 256; the client must stop
/// advancing and let the exchange time out.
#[test]
fn blockwise_put_ignores_size_growth() {
    let harness = EndpointHarness::new(1);
    let peer = EndpointHarness::peer();
    let payload = make_payload(324);

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/blocks/put")
                .content_format(ContentFormat::TEXT_PLAIN_UTF8)
                .block_size(BlockSize::new(128).unwrap())
                .ack_random_factor(1.0)
                .payload(payload.clone()),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let sent = harness.socket.sent();
    assert_eq!(1, sent.len());
    assert_eq!(0, sent[0].at);
    let block0 = sent[0].message();
    assert_eq!(MsgType::Con, block0.msg_type());
    assert_eq!(MsgCode::MethodPut, block0.msg_code());
    assert_eq!(&payload[0..128], block0.payload());
    assert_block1(&sent[0], 0, true, 3);

    harness.schedule_datagram(
        50,
        peer,
        ack_bytes(
            block0.msg_id(),
            block0.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(0, true, 3),
        ),
    );
    harness.run_until(50);

    let sent = harness.socket.sent();
    assert_eq!(2, sent.len());
    assert_eq!(50, sent[1].at);
    let block1 = sent[1].message();
    assert_eq!(&payload[128..256], block1.payload());
    assert_block1(&sent[1], 1, true, 3);

    // The server acknowledges block 1 but asks to grow to 256-byte blocks.
    harness.schedule_datagram(
        100,
        peer,
        ack_bytes(
            block1.msg_id(),
            block1.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(1, true, 4),
        ),
    );
    harness.run_until(100);

    // Ignored: nothing further goes on the wire, not even retransmissions.
    assert_eq!(2, harness.socket.sent_count());
    harness.run_until(300_000);
    assert_eq!(2, harness.socket.sent_count());

    let events = events.borrow();
    assert_eq!(
        vec!["acknowledged", "block sent", "timeout"],
        event_names(&events)
    );
    match (&events[0], &events[1]) {
        (Event::Acknowledged(a), Event::BlockSent(b)) => {
            assert_eq!(0, a.block1().unwrap().num());
            assert_eq!(0, b.block1().unwrap().num());
        }
        other => panic!("unexpected events: {:?}", other),
    }
    assert!(handle.is_finished());
    assert_eq!(Some(dgram_coap::Error::ProtocolViolation), handle.error());
}

/// A response carrying a Block1 option for a request that was never
/// block-wise is acknowledged but never completes.
#[test]
fn unexpected_block1_response_leaves_exchange_open() {
    let harness = EndpointHarness::new(2);
    let peer = EndpointHarness::peer();

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::post()
                .path("/unexpected-block1")
                .ack_random_factor(1.0)
                .payload(&b"Lorem ipsum..."[..]),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let sent = harness.socket.sent();
    assert_eq!(1, sent.len());
    let request = sent[0].message();
    assert_eq!(MsgType::Con, request.msg_type());
    assert_eq!(MsgCode::MethodPost, request.msg_code());
    assert_eq!(b"Lorem ipsum...", request.payload());
    assert_eq!(None, request.block1());

    harness.schedule_datagram(
        1000,
        peer,
        ack_bytes(
            request.msg_id(),
            request.msg_token(),
            MsgCode::SuccessCreated,
            BlockInfo::new(0, false, 5),
        ),
    );
    harness.run_until(1000);

    // Acknowledged, but the application-level exchange stays open.
    assert_eq!(vec!["acknowledged"], event_names(&events.borrow()));
    assert!(!handle.is_finished());

    harness.run_until(250_000);
    assert_eq!(
        vec!["acknowledged", "timeout"],
        event_names(&events.borrow())
    );
    assert_eq!(1, harness.socket.sent_count());
    assert!(handle.is_finished());
    assert_eq!(Some(dgram_coap::Error::UnexpectedOption), handle.error());
}

/// Losing every acknowledgement for block 1 exhausts the retransmission
/// budget on the deterministic schedule and times the request out.
#[test]
fn retransmission_exhaustion_during_block_two() {
    let harness = EndpointHarness::new(3);
    let peer = EndpointHarness::peer();
    let payload = make_payload(324);

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/blocks/put")
                .content_format(ContentFormat::TEXT_PLAIN_UTF8)
                .block_size(BlockSize::new(128).unwrap())
                .ack_random_factor(1.0)
                .payload(payload.clone()),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let block0 = harness.socket.sent()[0].message();
    harness.schedule_datagram(
        50,
        peer,
        ack_bytes(
            block0.msg_id(),
            block0.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(0, true, 3),
        ),
    );

    // Block 1 goes out at t=50 and is never acknowledged.
    harness.run_until(70_000);

    let sent = harness.socket.sent();
    let times: Vec<u64> = sent.iter().map(|datagram| datagram.at).collect();
    assert_eq!(vec![0, 50, 2050, 6050, 14050, 30050], times);

    // Every retransmission is bit-identical to the original send.
    for retransmit in &sent[2..] {
        assert_eq!(sent[1].bytes, retransmit.bytes);
    }

    assert_eq!(
        vec!["acknowledged", "block sent", "timeout"],
        event_names(&events.borrow())
    );
    assert!(handle.is_finished());
    assert_eq!(Some(dgram_coap::Error::TransactionTimeout), handle.error());
}

/// A duplicated acknowledgement is consumed exactly once.
#[test]
fn duplicate_ack_is_ignored() {
    let harness = EndpointHarness::new(4);
    let peer = EndpointHarness::peer();

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/value")
                .ack_random_factor(1.0)
                .payload(&b"v=1"[..]),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let request = harness.socket.sent()[0].message();
    let ack = ack_bytes(
        request.msg_id(),
        request.msg_token(),
        MsgCode::SuccessChanged,
        None,
    );
    harness.schedule_datagram(50, peer, ack.clone());
    harness.schedule_datagram(100, peer, ack);
    harness.run_until(1000);

    let events = events.borrow();
    assert_eq!(vec!["acknowledged", "response"], event_names(&events));
    assert_eq!(
        1,
        events
            .iter()
            .filter(|event| matches!(event, Event::Acknowledged(_)))
            .count()
    );
    assert!(handle.is_finished());
    assert_eq!(None, handle.error());
}

/// The happy path: a 324-byte payload at 128-byte blocks goes out as
/// exactly three Block1 datagrams numbered 0, 1, 2, with `M` set on all
/// but the last, and completes with the final acknowledgement.
#[test]
fn blockwise_put_happy_path() {
    let harness = EndpointHarness::new(21);
    let peer = EndpointHarness::peer();
    let payload = make_payload(324);

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/blocks/put")
                .content_format(ContentFormat::TEXT_PLAIN_UTF8)
                .block_size(BlockSize::new(128).unwrap())
                .ack_random_factor(1.0)
                .payload(payload.clone()),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let expected = [
        (0u32, 0usize, 128usize, true),
        (1, 128, 256, true),
        (2, 256, 324, false),
    ];

    let mut at = 0;
    for (num, start, end, more) in expected {
        let sent = harness.socket.sent();
        let last = sent.last().unwrap();
        assert_eq!(at, last.at);
        assert_block1(last, num, more, 3);
        assert_eq!(&payload[start..end], last.message().payload());

        at += 50;
        let message = last.message();
        harness.schedule_datagram(
            at,
            peer,
            ack_bytes(
                message.msg_id(),
                message.msg_token(),
                MsgCode::SuccessChanged,
                BlockInfo::new(num, more, 3),
            ),
        );
        harness.run_until(at);
    }

    // Exactly ceil(324/128) = 3 datagrams reached the wire.
    assert_eq!(3, harness.socket.sent_count());
    assert_eq!(
        vec![
            "acknowledged",
            "block sent",
            "acknowledged",
            "block sent",
            "acknowledged",
            "block sent",
            "response",
        ],
        event_names(&events.borrow())
    );
    assert!(handle.is_finished());
    assert_eq!(None, handle.error());

    // Distinct message ids per block, same token throughout.
    let sent = harness.socket.sent();
    let mids: Vec<u16> = sent.iter().map(|d| d.message().msg_id()).collect();
    let mut unique = mids.clone();
    unique.dedup();
    assert_eq!(mids, unique);
    assert!(sent
        .iter()
        .all(|d| d.message().msg_token() == sent[0].message().msg_token()));
}

/// Downward renegotiation: the server shrinks 128-byte blocks to 64 bytes
/// on the first acknowledgement; the transfer realigns and completes.
#[test]
fn blockwise_put_renegotiates_downward() {
    let harness = EndpointHarness::new(5);
    let peer = EndpointHarness::peer();
    let payload = make_payload(324);

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/blocks/put")
                .content_format(ContentFormat::TEXT_PLAIN_UTF8)
                .block_size(BlockSize::new(128).unwrap())
                .ack_random_factor(1.0)
                .payload(payload.clone()),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    // Server accepts block 0 but asks for 64-byte blocks.
    let mut at = 50;
    let block0 = harness.socket.sent()[0].message();
    harness.schedule_datagram(
        at,
        peer,
        ack_bytes(
            block0.msg_id(),
            block0.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(0, true, 2),
        ),
    );
    harness.run_until(at);

    // Remaining blocks run at 64 bytes, realigned after the 128-byte head:
    // nums 2..=5 cover [128..324).
    let expected = [
        (2u32, 128usize, 192usize, true),
        (3, 192, 256, true),
        (4, 256, 320, true),
        (5, 320, 324, false),
    ];

    for (num, start, end, more) in expected {
        let sent = harness.socket.sent();
        let last = sent.last().unwrap();
        assert_eq!(at, last.at);
        assert_block1(last, num, more, 2);
        assert_eq!(&payload[start..end], last.message().payload());

        at += 50;
        let message = last.message();
        harness.schedule_datagram(
            at,
            peer,
            ack_bytes(
                message.msg_id(),
                message.msg_token(),
                MsgCode::SuccessChanged,
                BlockInfo::new(num, more, 2),
            ),
        );
        harness.run_until(at);
    }

    assert_eq!(5, harness.socket.sent_count());
    assert_eq!(
        vec![
            "acknowledged",
            "block sent",
            "acknowledged",
            "block sent",
            "acknowledged",
            "block sent",
            "acknowledged",
            "block sent",
            "acknowledged",
            "block sent",
            "response",
        ],
        event_names(&events.borrow())
    );
    assert!(handle.is_finished());
}

/// With the RFC 7959 adoption policy, a server that renegotiated down may
/// later grow the block size back, as long as the transfer is aligned and
/// the submitted block size is not exceeded.
#[test]
fn rfc7959_policy_adopts_aligned_growth() {
    let harness = EndpointHarness::new(6);
    let peer = EndpointHarness::peer();
    let payload = make_payload(324);

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/blocks/put")
                .block_size(BlockSize::new(128).unwrap())
                .size_adoption(SizeAdoption::Rfc7959)
                .ack_random_factor(1.0)
                .payload(payload.clone()),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    // Block 0 (128 bytes) accepted at 64; blocks realign to nums 2, 3.
    let block0 = harness.socket.sent()[0].message();
    harness.schedule_datagram(
        50,
        peer,
        ack_bytes(
            block0.msg_id(),
            block0.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(0, true, 2),
        ),
    );
    harness.run_until(50);
    let sent = harness.socket.sent();
    assert_block1(&sent[1], 2, true, 2);
    assert_eq!(&payload[128..192], sent[1].message().payload());

    let num2 = sent[1].message();
    harness.schedule_datagram(
        100,
        peer,
        ack_bytes(
            num2.msg_id(),
            num2.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(2, true, 2),
        ),
    );
    harness.run_until(100);
    let sent = harness.socket.sent();
    assert_block1(&sent[2], 3, true, 2);
    assert_eq!(&payload[192..256], sent[2].message().payload());

    // At offset 256 the transfer is 128-aligned again; the server asks to
    // grow back and the client follows.
    let num3 = sent[2].message();
    harness.schedule_datagram(
        150,
        peer,
        ack_bytes(
            num3.msg_id(),
            num3.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(3, true, 3),
        ),
    );
    harness.run_until(150);
    let sent = harness.socket.sent();
    assert_block1(&sent[3], 2, false, 3);
    assert_eq!(&payload[256..324], sent[3].message().payload());

    let num2_big = sent[3].message();
    harness.schedule_datagram(
        200,
        peer,
        ack_bytes(
            num2_big.msg_id(),
            num2_big.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(2, false, 3),
        ),
    );
    harness.run_until(200);

    assert_eq!(4, harness.socket.sent_count());
    let events = events.borrow();
    assert_eq!("response", *event_names(&events).last().unwrap());
    assert!(handle.is_finished());
}

/// An empty acknowledgement keeps the exchange open for a separate
/// response; the confirmable response is acknowledged, and a duplicate of
/// it gets the cached acknowledgement replayed.
#[test]
fn separate_response_with_duplicate_replay() {
    let harness = EndpointHarness::new(7);
    let peer = EndpointHarness::peer();

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::get().path("/slow").ack_random_factor(1.0),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let request = harness.socket.sent()[0].message();

    // Empty ACK: the server needs time.
    harness.schedule_datagram(
        10,
        peer,
        ack_bytes(request.msg_id(), MsgToken::EMPTY, MsgCode::Empty, None),
    );
    harness.run_until(10);
    assert_eq!(vec!["acknowledged"], event_names(&events.borrow()));
    assert!(!handle.is_finished());

    // The separate response arrives as a confirmable with our token.
    let mut encoder = VecMessageEncoder::new();
    encoder.set_msg_type(MsgType::Con);
    encoder.set_msg_code(MsgCode::SuccessContent);
    encoder.set_msg_id(0x7001);
    encoder.set_msg_token(request.msg_token());
    encoder.append_payload_bytes(b"finally").unwrap();
    let response: Vec<u8> = encoder.into();

    harness.schedule_datagram(500, peer, response.clone());
    harness.run_until(500);

    let sent = harness.socket.sent();
    assert_eq!(2, sent.len());
    let ack_out = sent[1].message();
    assert_eq!(MsgType::Ack, ack_out.msg_type());
    assert_eq!(MsgCode::Empty, ack_out.msg_code());
    assert_eq!(0x7001, ack_out.msg_id());
    assert_eq!(
        vec!["acknowledged", "response"],
        event_names(&events.borrow())
    );
    assert!(handle.is_finished());

    // The server retransmits the response; the cached ACK is replayed and
    // no second response event fires.
    harness.schedule_datagram(600, peer, response);
    harness.run_until(600);

    let sent = harness.socket.sent();
    assert_eq!(3, sent.len());
    assert_eq!(sent[1].bytes, sent[2].bytes);
    assert_eq!(
        vec!["acknowledged", "response"],
        event_names(&events.borrow())
    );
}

/// A reset from the server terminates the request with a single `reset`
/// event; no timeout follows.
#[test]
fn reset_terminates_request() {
    let harness = EndpointHarness::new(8);
    let peer = EndpointHarness::peer();

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::post()
                .path("/reject-me")
                .ack_random_factor(1.0)
                .payload(&b"?"[..]),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let request = harness.socket.sent()[0].message();
    harness.schedule_datagram(20, peer, rst_bytes(request.msg_id()));
    harness.run_until(300_000);

    assert_eq!(vec!["reset"], event_names(&events.borrow()));
    assert_eq!(1, harness.socket.sent_count());
    assert!(handle.is_finished());
    assert_eq!(Some(dgram_coap::Error::Reset), handle.error());
}

/// Cancellation stops retransmission immediately and emits exactly one
/// `cancelled` event.
#[test]
fn cancel_tears_down_blockwise_request() {
    let harness = EndpointHarness::new(9);
    let peer = EndpointHarness::peer();
    let payload = make_payload(324);

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/blocks/put")
                .block_size(BlockSize::new(128).unwrap())
                .ack_random_factor(1.0)
                .payload(payload),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let block0 = harness.socket.sent()[0].message();
    harness.schedule_datagram(
        50,
        peer,
        ack_bytes(
            block0.msg_id(),
            block0.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(0, true, 3),
        ),
    );
    harness.run_until(50);
    assert_eq!(2, harness.socket.sent_count());

    handle.cancel();
    assert!(handle.is_finished());
    assert_eq!(Some(dgram_coap::Error::Cancelled), handle.error());

    // No retransmissions of block 1, no timeout, no further events.
    harness.run_until(300_000);
    assert_eq!(2, harness.socket.sent_count());
    assert_eq!(
        vec!["acknowledged", "block sent", "cancelled"],
        event_names(&events.borrow())
    );
}

/// A non-confirmable request has no retransmission machinery at all; its
/// response is matched by token.
#[test]
fn nonconfirmable_request_round_trip() {
    let harness = EndpointHarness::new(10);
    let peer = EndpointHarness::peer();

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::get().path("/telemetry").nonconfirmable(),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let sent = harness.socket.sent();
    assert_eq!(1, sent.len());
    let request = sent[0].message();
    assert_eq!(MsgType::Non, request.msg_type());

    // Only the exchange deadline is pending.
    assert_eq!(Some(247_000), harness.endpoint.next_wakeup());

    let mut encoder = VecMessageEncoder::new();
    encoder.set_msg_type(MsgType::Non);
    encoder.set_msg_code(MsgCode::SuccessContent);
    encoder.set_msg_id(0x2222);
    encoder.set_msg_token(request.msg_token());
    encoder.append_payload_bytes(b"21.5C").unwrap();
    harness.schedule_datagram(100, peer, encoder.into());
    harness.run_until(100);

    assert_eq!(vec!["response"], event_names(&events.borrow()));
    assert_eq!(1, harness.socket.sent_count());
    assert!(handle.is_finished());
}

/// A payload that cannot fit in a single datagram and has no block size
/// configured is rejected at submission.
#[test]
fn oversized_unsegmented_payload_is_rejected() {
    let harness = EndpointHarness::new(11);
    let peer = EndpointHarness::peer();

    let result = harness.endpoint.submit(
        CoapRequest::put().path("/big").payload(make_payload(4096)),
        peer,
    );

    assert_eq!(Some(dgram_coap::Error::OutOfSpace), result.err());
    assert_eq!(0, harness.socket.sent_count());
}

/// Stale acknowledgements that match no pending transaction are dropped
/// without events, including acknowledgements with an unexpected block
/// number.
#[test]
fn stale_block_ack_is_dropped() {
    let harness = EndpointHarness::new(12);
    let peer = EndpointHarness::peer();
    let payload = make_payload(324);

    let handle = harness
        .endpoint
        .submit(
            CoapRequest::put()
                .path("/blocks/put")
                .block_size(BlockSize::new(128).unwrap())
                .ack_random_factor(1.0)
                .payload(payload),
            peer,
        )
        .unwrap();
    let events = harness.record_events(&handle);

    let block0 = harness.socket.sent()[0].message();

    // Acknowledgement for a block number that is not in flight.
    harness.schedule_datagram(
        50,
        peer,
        ack_bytes(
            block0.msg_id(),
            block0.msg_token(),
            MsgCode::SuccessChanged,
            BlockInfo::new(7, true, 3),
        ),
    );
    harness.run_until(50);

    // Dropped silently: no events, no advance beyond block 0.
    assert!(event_names(&events.borrow()).is_empty());
    assert_eq!(1, harness.socket.sent_count());
}

/// Fire-and-forget sends go out as non-confirmables with a fresh message
/// id and leave no state behind.
#[test]
fn send_non_confirmable_is_stateless() {
    let harness = EndpointHarness::new(13);
    let peer = EndpointHarness::peer();

    let mut encoder = VecMessageEncoder::new();
    encoder.set_msg_type(MsgType::Con);
    encoder.set_msg_code(MsgCode::MethodPut);
    encoder.set_msg_id(0);
    encoder.set_msg_token(MsgToken::new(&[0x0F]));
    encoder
        .insert_option_str(OptionNumber::URI_PATH, "beacon")
        .unwrap();
    encoder.append_payload_bytes(b"ping").unwrap();
    let message = dgram_coap::OwnedImmutableMessage::new(encoder.into()).unwrap();

    harness
        .endpoint
        .send_non_confirmable(&message, peer)
        .unwrap();

    let sent = harness.socket.sent();
    assert_eq!(1, sent.len());
    let out = sent[0].message();
    assert_eq!(MsgType::Non, out.msg_type());
    assert_eq!(MsgCode::MethodPut, out.msg_code());
    assert_eq!(b"ping", out.payload());

    // Nothing is pending: no retransmission, no exchange deadline.
    assert_eq!(None, harness.endpoint.next_wakeup());
}

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

//! The client-side CoAP endpoint.
//!
//! [`Endpoint`] owns the socket handle, every live transaction and request,
//! a duplicate-suppression table, and a timer queue keyed by monotonic
//! [`Clock`] deadlines. It is single-threaded and entirely event-driven:
//! inbound datagrams are pushed in with [`Endpoint::handle_datagram`], and
//! time only advances when [`Endpoint::poll`] runs the timers that are due.
//!
//! Inbound dispatch follows RFC 7252 §4.2: `ACK`/`RST` match a pending
//! transaction by `(peer, message id)`; responses match a request by
//! token; duplicate confirmables are suppressed and their cached
//! acknowledgement replayed.

use super::*;
use log::{debug, error, warn};
use rand::{RngCore, SeedableRng};
use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::rc::{Rc, Weak};

mod transaction;
use transaction::{Transaction, TransactionState};

mod exchange;
use exchange::{build_request_message, ExchangeState, Request, RequestBody};

mod blockwise;
use blockwise::BlockwiseState;

mod request;
pub use request::{CoapRequest, RequestConfig, SizeAdoption};

mod events;
pub use events::{Event, RequestHandle};
use events::{dispatch_events, RequestShared};

/// What a timer entry means when it fires.
#[derive(Debug)]
enum TimerKind<SA> {
    /// Retransmit (or give up on) the pending transaction `(peer, mid)`.
    Retransmit { peer: SA, mid: MsgId },

    /// The exchange owned by `token` reached its lifetime.
    ExchangeDeadline { token: MsgToken },
}

/// An entry in the timer heap. Entries are never removed eagerly;
/// cancellation bumps the owner's `timer_seq` and stale entries are
/// skipped when they surface.
#[derive(Debug)]
struct TimerEntry<SA> {
    deadline: u64,
    seq: u64,
    kind: TimerKind<SA>,
}

impl<SA> PartialEq for TimerEntry<SA> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<SA> Eq for TimerEntry<SA> {}

impl<SA> PartialOrd for TimerEntry<SA> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<SA> Ord for TimerEntry<SA> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

/// Duplicate suppression for inbound confirmables and non-confirmables,
/// per RFC 7252 §4.5: a `(peer, mid)` pair stays relevant for one
/// exchange lifetime, and the acknowledgement we produced (if any) is
/// replayed for duplicates instead of reprocessing the message.
#[derive(Debug)]
struct DuplicateFilter<SA> {
    lifetime: u64,
    entries: HashMap<(SA, MsgId), DedupEntry>,
    order: VecDeque<((SA, MsgId), u64)>,
}

#[derive(Debug)]
struct DedupEntry {
    expires: u64,
    cached_reply: Option<Vec<u8>>,
}

impl<SA: Copy + Eq + std::hash::Hash> DuplicateFilter<SA> {
    fn new(lifetime: u64) -> DuplicateFilter<SA> {
        DuplicateFilter {
            lifetime,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn purge(&mut self, now: u64) {
        while let Some((key, expires)) = self.order.front().copied() {
            if expires > now {
                break;
            }
            self.order.pop_front();
            if let Some(entry) = self.entries.get(&key) {
                if entry.expires <= now {
                    self.entries.remove(&key);
                }
            }
        }
    }

    /// Records the given `(peer, mid)` pair, returning `false` if it was
    /// already seen within the exchange lifetime.
    fn record(&mut self, key: (SA, MsgId), now: u64) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        let expires = now + self.lifetime;
        self.entries.insert(
            key,
            DedupEntry {
                expires,
                cached_reply: None,
            },
        );
        self.order.push_back((key, expires));
        true
    }

    fn cached_reply(&self, key: &(SA, MsgId)) -> Option<&[u8]> {
        self.entries
            .get(key)
            .and_then(|entry| entry.cached_reply.as_deref())
    }

    fn cache_reply(&mut self, key: (SA, MsgId), reply: Vec<u8>) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.cached_reply = Some(reply);
        }
    }
}

pub(crate) struct Core<S: DatagramSocket> {
    socket: S,
    clock: Rc<dyn Clock>,
    rng: Box<dyn RngCore>,
    next_msg_id: MsgId,
    transactions: HashMap<(S::SocketAddr, MsgId), Transaction<S::SocketAddr>>,
    requests: HashMap<MsgToken, Request<S::SocketAddr>>,
    dedup: DuplicateFilter<S::SocketAddr>,
    timers: BinaryHeap<Reverse<TimerEntry<S::SocketAddr>>>,
    next_timer_seq: u64,
    pending_events: Vec<(Rc<RequestShared>, Event)>,
}

impl<S: DatagramSocket> Core<S> {
    fn new(socket: S, clock: Rc<dyn Clock>, mut rng: Box<dyn RngCore>) -> Core<S> {
        let next_msg_id = (rng.next_u32() & 0xFFFF) as MsgId;
        let dedup_lifetime =
            TransmissionParameters::default().exchange_lifetime().as_millis() as u64;
        Core {
            socket,
            clock,
            rng,
            next_msg_id,
            transactions: HashMap::new(),
            requests: HashMap::new(),
            dedup: DuplicateFilter::new(dedup_lifetime),
            timers: BinaryHeap::new(),
            next_timer_seq: 0,
            pending_events: Vec::new(),
        }
    }

    fn now(&self) -> u64 {
        self.clock.now()
    }

    pub(crate) fn take_events(&mut self) -> Vec<(Rc<RequestShared>, Event)> {
        std::mem::take(&mut self.pending_events)
    }

    pub(crate) fn emit(&mut self, shared: &Rc<RequestShared>, event: Event) {
        self.pending_events.push((shared.clone(), event));
    }

    /// Message-ID allocation: a wrapping 16-bit counter with a random
    /// starting point.
    fn allocate_msg_id(&mut self) -> MsgId {
        let mid = self.next_msg_id;
        self.next_msg_id = self.next_msg_id.wrapping_add(1);
        mid
    }

    /// Tokens are eight random bytes, regenerated on collision with a
    /// live request.
    fn generate_token(&mut self) -> MsgToken {
        loop {
            let mut bytes = [0u8; 8];
            self.rng.fill_bytes(&mut bytes);
            let token = MsgToken::new(&bytes);
            if !self.requests.contains_key(&token) {
                return token;
            }
            debug!("Token collision on {}; regenerating", token);
        }
    }

    fn schedule_timer(&mut self, deadline: u64, kind: TimerKind<S::SocketAddr>) -> u64 {
        let seq = self.next_timer_seq;
        self.next_timer_seq += 1;
        self.timers.push(Reverse(TimerEntry {
            deadline,
            seq,
            kind,
        }));
        seq
    }

    fn timer_entry_is_live(&self, entry: &TimerEntry<S::SocketAddr>) -> bool {
        match entry.kind {
            TimerKind::Retransmit { peer, mid } => matches!(
                self.transactions.get(&(peer, mid)),
                Some(tx) if tx.timer_seq == entry.seq
            ),
            TimerKind::ExchangeDeadline { token } => matches!(
                self.requests.get(&token),
                Some(request) if matches!(
                    &request.exchange,
                    Some(exchange) if exchange.timer_seq == entry.seq
                )
            ),
        }
    }

    pub(crate) fn next_wakeup(&mut self) -> Option<u64> {
        loop {
            let (live, deadline) = match self.timers.peek() {
                None => return None,
                Some(Reverse(entry)) => (self.timer_entry_is_live(entry), entry.deadline),
            };
            if live {
                return Some(deadline);
            }
            self.timers.pop();
        }
    }

    pub(crate) fn submit(
        &mut self,
        request: CoapRequest,
        peer: S::SocketAddr,
    ) -> Result<(MsgToken, Rc<RequestShared>), Error> {
        let token = self.generate_token();

        let body = match request.config.block_size {
            Some(block_size) if request.payload.len() > block_size.len() => {
                RequestBody::Blockwise(BlockwiseState::new(block_size))
            }
            _ => RequestBody::Simple,
        };

        let shared = Rc::new(RequestShared::new());
        self.requests.insert(
            token,
            Request {
                token,
                peer,
                msg_type: request.msg_type,
                code: request.code,
                path: request.path,
                content_format: request.content_format,
                payload: request.payload,
                config: request.config,
                body,
                exchange: None,
                shared: shared.clone(),
                anomaly: None,
            },
        );

        if let Err(e) = self.start_exchange(token, true) {
            self.requests.remove(&token);
            return Err(e);
        }

        Ok((token, shared))
    }

    /// Opens a new exchange for the request: encodes the next wire image
    /// (the whole payload, or the next block), arms the exchange deadline
    /// and, for confirmables, the retransmission timer, and sends.
    ///
    /// When `initial` is set, a send failure is returned to the submitter;
    /// afterwards it is reported as [`Event::SendFailed`] because the
    /// request already has an owner listening.
    pub(crate) fn start_exchange(&mut self, token: MsgToken, initial: bool) -> Result<(), Error> {
        let mid = self.allocate_msg_id();
        let now = self.now();

        let (bytes, is_con, peer, params, shared) = {
            let request = self.requests.get_mut(&token).ok_or(Error::Cancelled)?;
            let params = request.config.trans_params;

            let (block1, payload_range) = match &mut request.body {
                RequestBody::Simple => (None, 0..request.payload.len()),
                RequestBody::Blockwise(blockwise) => {
                    let payload_len = request.payload.len();
                    let (range, block1) = blockwise
                        .next_block(payload_len)
                        .ok_or(Error::InvalidArgument)?;
                    (Some(block1), range)
                }
            };

            let bytes = build_request_message(request, mid, block1, payload_range)?;
            if bytes.len() > params.max_outbound_packet_len {
                warn!(
                    "Encoded request {} exceeds the outbound packet limit ({} > {})",
                    token,
                    bytes.len(),
                    params.max_outbound_packet_len
                );
                return Err(Error::OutOfSpace);
            }

            (
                bytes,
                request.msg_type.is_con(),
                request.peer,
                params,
                request.shared.clone(),
            )
        };

        let deadline = now + params.exchange_lifetime().as_millis() as u64;
        let timer_seq = self.schedule_timer(deadline, TimerKind::ExchangeDeadline { token });
        if let Some(request) = self.requests.get_mut(&token) {
            request.exchange = Some(ExchangeState {
                mid,
                deadline,
                timer_seq,
            });
        }

        if is_con {
            let interval = params.initial_retransmit_interval(&mut *self.rng);
            let mut tx = Transaction::new(
                mid,
                token,
                peer,
                bytes.clone(),
                interval,
                now,
                params.max_retransmit,
            );
            tx.timer_seq =
                self.schedule_timer(tx.next_fire_at, TimerKind::Retransmit { peer, mid });
            self.transactions.insert((peer, mid), tx);
        }

        debug!(
            "OUTBOUND: {} {}",
            peer,
            CoapByteDisplayFormatter(&bytes)
        );
        if let Err(e) = self.socket.send_to(&bytes, peer) {
            error!("send_to: {:?} (dest={})", e, peer);
            if initial {
                self.transactions.remove(&(peer, mid));
                return Err(e);
            }
            self.emit(&shared, Event::SendFailed(e));
        }

        Ok(())
    }

    /// Encodes and sends a one-shot non-confirmable message. No state is
    /// retained; there will be no retransmission and no matching.
    pub(crate) fn send_non_confirmable(
        &mut self,
        msg: &dyn MessageRead,
        peer: S::SocketAddr,
    ) -> Result<(), Error> {
        let mut encoder = VecMessageEncoder::new();
        msg.write_msg_to(&mut encoder)?;
        encoder.set_msg_type(MsgType::Non);
        if msg.msg_id() == 0 {
            let mid = self.allocate_msg_id();
            encoder.set_msg_id(mid);
        }

        let bytes: Vec<u8> = encoder.into();
        debug!(
            "OUTBOUND: {} {}",
            peer,
            CoapByteDisplayFormatter(&bytes)
        );
        self.socket.send_to(&bytes, peer)
    }

    pub(crate) fn handle_datagram(&mut self, bytes: &[u8], peer: S::SocketAddr) {
        debug!("INBOUND: {} {}", peer, CoapByteDisplayFormatter(bytes));

        let msg = match OwnedImmutableMessage::new(bytes.to_vec()) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Dropping malformed datagram from {}: {:?}", peer, e);
                return;
            }
        };

        match msg.msg_type() {
            MsgType::Ack | MsgType::Rst => self.handle_ack_or_reset(msg, peer),
            MsgType::Con | MsgType::Non => self.handle_con_or_non(msg, peer),
        }
    }

    /// Dispatch for inbound `ACK`/`RST`: matched to a pending transaction
    /// by `(peer, mid)`; unmatched ones are stale and silently dropped.
    fn handle_ack_or_reset(&mut self, msg: OwnedImmutableMessage, peer: S::SocketAddr) {
        let key = (peer, msg.msg_id());
        let mut tx = match self.transactions.remove(&key) {
            Some(tx) => tx,
            None => {
                debug!(
                    "No pending transaction for {} MID:{:04X}; dropping",
                    peer,
                    msg.msg_id()
                );
                return;
            }
        };

        if msg.msg_type().is_rst() {
            tx.state = TransactionState::Reset;
            debug!("Transaction MID:{:04X} reset by {}", tx.mid, peer);
            if self.requests.contains_key(&tx.token) {
                let shared = self.requests[&tx.token].shared.clone();
                self.emit(&shared, Event::Reset);
                self.finish_request(tx.token, Some(Error::Reset));
            }
            return;
        }

        tx.state = TransactionState::Acked;
        if !self.requests.contains_key(&tx.token) {
            debug!("ACK for finished request {}; dropping", tx.token);
            return;
        }
        self.handle_ack(tx.token, msg);
    }

    /// Dispatch for inbound `CON`/`NON`: duplicate suppression first, then
    /// response matching by token. Confirmable separate responses are
    /// acknowledged and the acknowledgement cached for replay; a
    /// confirmable we cannot match (including CoAP ping) is answered with
    /// `RST`.
    fn handle_con_or_non(&mut self, msg: OwnedImmutableMessage, peer: S::SocketAddr) {
        let now = self.now();
        self.dedup.purge(now);

        let key = (peer, msg.msg_id());
        if !self.dedup.record(key, now) {
            match self.dedup.cached_reply(&key) {
                Some(reply) => {
                    debug!("Duplicate MID:{:04X}; replaying cached reply", msg.msg_id());
                    let reply = reply.to_vec();
                    if let Err(e) = self.socket.send_to(&reply, peer) {
                        error!("send_to: {:?} (dest={})", e, peer);
                    }
                }
                None => debug!("Duplicate MID:{:04X}; dropping", msg.msg_id()),
            }
            return;
        }

        if msg.msg_code().is_response() {
            let token = msg.msg_token();
            if !self.requests.contains_key(&token) {
                debug!("Response for unknown token {}; dropping", token);
                return;
            }

            if msg.msg_type().is_con() {
                let mut buffer = [0u8; 12];
                let mut builder = BufferMessageEncoder::new(&mut buffer);
                let _ = AckMessage.write_msg_to(&mut builder);
                builder.set_msg_id(msg.msg_id());
                let reply = builder.as_bytes().to_vec();
                if let Err(e) = self.socket.send_to(&reply, peer) {
                    error!("send_to: {:?} (dest={})", e, peer);
                }
                self.dedup.cache_reply(key, reply);
            }

            let shared = self.requests[&token].shared.clone();
            self.emit(&shared, Event::Response(msg));
            self.finish_request(token, None);
            return;
        }

        if msg.msg_type().is_con() {
            // CoAP ping, or a request role we don't serve. Reject with RST.
            let mut buffer = [0u8; 12];
            let mut builder = BufferMessageEncoder::new(&mut buffer);
            let _ = ResetMessage.write_msg_to(&mut builder);
            builder.set_msg_id(msg.msg_id());
            if let Err(e) = self.socket.send_to(builder.as_bytes(), peer) {
                error!("send_to: {:?} (dest={})", e, peer);
            }
        }
    }

    /// Fires every timer whose deadline has passed.
    pub(crate) fn poll(&mut self) {
        let now = self.now();
        loop {
            let due = matches!(self.timers.peek(), Some(Reverse(entry)) if entry.deadline <= now);
            if !due {
                break;
            }
            let Reverse(entry) = self.timers.pop().expect("peeked entry vanished");
            match entry.kind {
                TimerKind::Retransmit { peer, mid } => {
                    self.fire_retransmit(peer, mid, entry.seq, entry.deadline)
                }
                TimerKind::ExchangeDeadline { token } => {
                    self.fire_exchange_deadline(token, entry.seq)
                }
            }
        }
    }

    fn fire_retransmit(&mut self, peer: S::SocketAddr, mid: MsgId, seq: u64, deadline: u64) {
        let (exhausted, token) = match self.transactions.get(&(peer, mid)) {
            Some(tx) if tx.timer_seq == seq && tx.state == TransactionState::Pending => {
                (tx.budget_exhausted(), tx.token)
            }
            _ => return,
        };

        if exhausted {
            if let Some(mut tx) = self.transactions.remove(&(peer, mid)) {
                tx.state = TransactionState::TimedOut;
                warn!(
                    "Transaction MID:{:04X} to {} timed out after {} retransmits",
                    mid, peer, tx.retransmit_count
                );
            }
            if self.requests.contains_key(&token) {
                let shared = self.requests[&token].shared.clone();
                self.emit(&shared, Event::Timeout);
                self.finish_request(token, Some(Error::TransactionTimeout));
            }
            return;
        }

        let (bytes, next_fire, count) = {
            let tx = self
                .transactions
                .get_mut(&(peer, mid))
                .expect("transaction vanished");
            let next_fire = tx.record_retransmit(deadline);
            (tx.bytes.clone(), next_fire, tx.retransmit_count)
        };

        debug!("Retransmit #{} MID:{:04X} to {}", count, mid, peer);
        if let Err(e) = self.socket.send_to(&bytes, peer) {
            error!("send_to: {:?} (dest={})", e, peer);
            if let Some(request) = self.requests.get(&token) {
                let shared = request.shared.clone();
                self.emit(&shared, Event::SendFailed(e));
            }
        }

        let timer_seq = self.schedule_timer(next_fire, TimerKind::Retransmit { peer, mid });
        if let Some(tx) = self.transactions.get_mut(&(peer, mid)) {
            tx.timer_seq = timer_seq;
        }
    }

    fn fire_exchange_deadline(&mut self, token: MsgToken, seq: u64) {
        let deadline = match self.requests.get(&token) {
            Some(request) => match &request.exchange {
                Some(exchange) if exchange.timer_seq == seq => exchange.deadline,
                _ => return,
            },
            None => return,
        };

        warn!("Exchange {} exceeded its lifetime (deadline {})", token, deadline);
        let shared = self.requests[&token].shared.clone();
        let anomaly = self.requests[&token].anomaly;
        self.emit(&shared, Event::Timeout);
        self.finish_request(token, Some(anomaly.unwrap_or(Error::ExchangeTimeout)));
    }

    /// Tears a request down: its table entry, its pending transaction, and
    /// (by sequence invalidation) all of its timers. The terminal status
    /// becomes visible through [`RequestHandle::error`].
    pub(crate) fn finish_request(&mut self, token: MsgToken, error: Option<Error>) {
        if let Some(request) = self.requests.remove(&token) {
            if let Some(exchange) = request.exchange {
                self.transactions.remove(&(request.peer, exchange.mid));
            }
            request.shared.finish(error);
        }
    }

    pub(crate) fn cancel_request(&mut self, token: MsgToken) {
        if let Some(request) = self.requests.get(&token) {
            debug!("Cancelling request {}", token);
            let shared = request.shared.clone();
            self.finish_request(token, Some(Error::Cancelled));
            self.emit(&shared, Event::Cancelled);
        }
    }
}

impl<S: DatagramSocket> std::fmt::Debug for Core<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("transactions", &self.transactions.keys())
            .field("requests", &self.requests.keys())
            .field("timers", &self.timers.len())
            .finish()
    }
}

/// A client-side CoAP endpoint over a datagram socket.
///
/// The endpoint is deterministic: time comes from the injected [`Clock`],
/// randomness from the injected RNG, and nothing happens outside of
/// [`Endpoint::submit`], [`Endpoint::handle_datagram`], and
/// [`Endpoint::poll`].
///
/// ```
/// use dgram_coap::{CoapRequest, Endpoint, NullSocket};
///
/// let endpoint = Endpoint::new(NullSocket::new());
/// let request = CoapRequest::put().path("/sensors/calibration").payload(&b"42"[..]);
/// let handle = endpoint
///     .submit(request, "192.0.2.1:5683".parse().unwrap())
///     .expect("submit failed");
/// handle.on_event(|event| println!("request event: {:?}", event));
/// ```
#[derive(Debug)]
pub struct Endpoint<S: DatagramSocket> {
    core: Rc<RefCell<Core<S>>>,
}

impl<S: DatagramSocket> Endpoint<S> {
    /// Creates a new endpoint with a [`SteadyClock`] and an
    /// entropy-seeded RNG.
    pub fn new(socket: S) -> Endpoint<S> {
        Self::with_clock_and_rng(
            socket,
            Rc::new(SteadyClock::new()),
            Box::new(rand::rngs::StdRng::from_entropy()),
        )
    }

    /// Creates a new endpoint with explicit clock and RNG capabilities.
    /// This is the constructor test harnesses use to get full control of
    /// time and randomness.
    pub fn with_clock_and_rng(
        socket: S,
        clock: Rc<dyn Clock>,
        rng: Box<dyn RngCore>,
    ) -> Endpoint<S> {
        Endpoint {
            core: Rc::new(RefCell::new(Core::new(socket, clock, rng))),
        }
    }

    /// Submits a request to the given peer. The first datagram goes out
    /// before this method returns; failure to encode or send it is
    /// returned here rather than reported as an event.
    pub fn submit(
        &self,
        request: CoapRequest,
        peer: S::SocketAddr,
    ) -> Result<RequestHandle<S>, Error> {
        let (result, events) = {
            let mut core = self.core.borrow_mut();
            let result = core.submit(request, peer);
            (result, core.take_events())
        };
        dispatch_events(events);

        result.map(|(token, shared)| {
            RequestHandle::new(token, Rc::downgrade(&self.core), shared)
        })
    }

    /// Sends a one-shot non-confirmable message. Fire and forget.
    pub fn send_non_confirmable(
        &self,
        msg: &dyn MessageRead,
        peer: S::SocketAddr,
    ) -> Result<(), Error> {
        self.core.borrow_mut().send_non_confirmable(msg, peer)
    }

    /// Feeds one inbound datagram into the endpoint.
    pub fn handle_datagram(&self, bytes: &[u8], peer: S::SocketAddr) {
        let events = {
            let mut core = self.core.borrow_mut();
            core.handle_datagram(bytes, peer);
            core.take_events()
        };
        dispatch_events(events);
    }

    /// Fires every timer whose deadline has passed according to the
    /// endpoint's clock.
    pub fn poll(&self) {
        let events = {
            let mut core = self.core.borrow_mut();
            core.poll();
            core.take_events()
        };
        dispatch_events(events);
    }

    /// The earliest pending timer deadline, if any. Drive the endpoint by
    /// advancing the clock to this point and calling [`Endpoint::poll`].
    pub fn next_wakeup(&self) -> Option<u64> {
        self.core.borrow_mut().next_wakeup()
    }
}

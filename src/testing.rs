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

//! Programmable test doubles for driving an [`Endpoint`] through scripted
//! sessions.
//!
//! [`ScriptedSocket`] records every outbound datagram with the virtual
//! timestamp it was sent at. [`EndpointHarness`] owns the socket, a
//! [`VirtualClock`], and a queue of scheduled inbound datagrams, and
//! advances time deadline-by-deadline so retransmission schedules are
//! observed exactly.

use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;

/// One datagram captured on its way out of the endpoint.
#[derive(Debug, Clone)]
pub struct SentDatagram {
    /// Virtual time at which the datagram was sent.
    pub at: u64,

    /// Destination peer.
    pub peer: SocketAddr,

    /// The raw datagram.
    pub bytes: Vec<u8>,
}

impl SentDatagram {
    /// Parses the datagram as a CoAP message, panicking on malformed
    /// output (outbound datagrams are always well-formed).
    pub fn message(&self) -> OwnedImmutableMessage {
        OwnedImmutableMessage::new(self.bytes.clone()).expect("endpoint sent malformed datagram")
    }
}

#[derive(Debug)]
struct ScriptedSocketInner {
    clock: Rc<VirtualClock>,
    sent: RefCell<Vec<SentDatagram>>,
}

/// A [`DatagramSocket`] that records outbound datagrams instead of
/// delivering them.
#[derive(Debug, Clone)]
pub struct ScriptedSocket {
    inner: Rc<ScriptedSocketInner>,
}

impl ScriptedSocket {
    /// Creates a new `ScriptedSocket` stamping sends with the given clock.
    pub fn new(clock: Rc<VirtualClock>) -> ScriptedSocket {
        ScriptedSocket {
            inner: Rc::new(ScriptedSocketInner {
                clock,
                sent: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Everything sent so far, in send order.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.inner.sent.borrow().clone()
    }

    /// Number of datagrams sent so far.
    pub fn sent_count(&self) -> usize {
        self.inner.sent.borrow().len()
    }
}

impl DatagramSocket for ScriptedSocket {
    type SocketAddr = SocketAddr;

    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> Result<(), Error> {
        self.inner.sent.borrow_mut().push(SentDatagram {
            at: self.inner.clock.now(),
            peer: dest,
            bytes: buf.to_vec(),
        });
        Ok(())
    }
}

#[derive(Debug)]
struct ScheduledDatagram {
    at: u64,
    peer: SocketAddr,
    bytes: Vec<u8>,
}

/// An [`Endpoint`] wired to a [`ScriptedSocket`] and a [`VirtualClock`],
/// with a schedule of inbound datagrams.
///
/// Time never jumps past an event: [`EndpointHarness::run_until`] advances
/// the clock to each pending deadline or scheduled datagram in order, so
/// the endpoint observes every timer at its exact deadline.
pub struct EndpointHarness {
    /// The virtual clock shared with the endpoint and socket.
    pub clock: Rc<VirtualClock>,

    /// The recording socket shared with the endpoint.
    pub socket: ScriptedSocket,

    /// The endpoint under test.
    pub endpoint: Endpoint<ScriptedSocket>,

    inbound: RefCell<Vec<ScheduledDatagram>>,
}

impl EndpointHarness {
    /// Creates a harness whose endpoint RNG is seeded with `seed`.
    pub fn new(seed: u64) -> EndpointHarness {
        let clock = Rc::new(VirtualClock::new());
        let socket = ScriptedSocket::new(clock.clone());
        let endpoint = Endpoint::with_clock_and_rng(
            socket.clone(),
            clock.clone(),
            Box::new(StdRng::seed_from_u64(seed)),
        );
        EndpointHarness {
            clock,
            socket,
            endpoint,
            inbound: RefCell::new(Vec::new()),
        }
    }

    /// A fixed documentation-range peer address for tests.
    pub fn peer() -> SocketAddr {
        "198.51.100.1:5683".parse().unwrap()
    }

    /// Schedules a raw datagram to arrive from `peer` at virtual time `at`.
    pub fn schedule_datagram(&self, at: u64, peer: SocketAddr, bytes: Vec<u8>) {
        let mut inbound = self.inbound.borrow_mut();
        inbound.push(ScheduledDatagram { at, peer, bytes });
        inbound.sort_by_key(|datagram| datagram.at);
    }

    /// Runs the session forward to virtual time `target`, delivering
    /// scheduled datagrams and firing timers in deadline order.
    pub fn run_until(&self, target: u64) {
        loop {
            let next_inbound = self.inbound.borrow().first().map(|datagram| datagram.at);
            let next_timer = self.endpoint.next_wakeup();
            let next = match (next_inbound, next_timer) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            match next {
                Some(t) if t <= target => {
                    if t > self.clock.now() {
                        self.clock.set(t);
                    }
                    loop {
                        let due = {
                            let mut inbound = self.inbound.borrow_mut();
                            if inbound.first().map_or(false, |datagram| datagram.at <= t) {
                                Some(inbound.remove(0))
                            } else {
                                None
                            }
                        };
                        match due {
                            Some(datagram) => {
                                self.endpoint.handle_datagram(&datagram.bytes, datagram.peer)
                            }
                            None => break,
                        }
                    }
                    self.endpoint.poll();
                }
                _ => break,
            }
        }

        if target > self.clock.now() {
            self.clock.set(target);
        }
        self.endpoint.poll();
    }

    /// Registers a recording listener on the given request handle and
    /// returns the shared event log.
    pub fn record_events(
        &self,
        handle: &RequestHandle<ScriptedSocket>,
    ) -> Rc<RefCell<Vec<Event>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        handle.on_event(move |event| sink.borrow_mut().push(event.clone()));
        log
    }
}

impl std::fmt::Debug for EndpointHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointHarness")
            .field("now", &self.clock.now())
            .field("sent", &self.socket.sent_count())
            .field("inbound_pending", &self.inbound.borrow().len())
            .finish()
    }
}

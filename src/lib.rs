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

//! A deterministic, client-side implementation of the Constrained
//! Application Protocol (CoAP, [RFC 7252]) with block-wise request
//! transfer ([RFC 7959]).
//!
//! The crate is built around three subsystems:
//!
//! * a bit-exact [message codec](message) for CoAP datagrams, including
//!   [Block1/Block2 option values](BlockInfo);
//! * a reliability engine — per-confirmable retransmission with
//!   exponential backoff, acknowledgement matching by `(peer, message id)`,
//!   duplicate suppression, and exchange lifetimes;
//! * a Block1 request driver that segments an oversized payload across
//!   sequential exchanges and follows server-side block size
//!   renegotiation.
//!
//! Everything is driven through capabilities: the network is a
//! [`DatagramSocket`], time is a [`Clock`], and randomness is an injected
//! RNG. Production endpoints use a real socket with [`SteadyClock`];
//! tests script entire sessions against the
//! [`ScriptedSocket`](testing::ScriptedSocket) and [`VirtualClock`],
//! observing retransmission schedules at exact virtual deadlines.
//!
//! ```
//! use dgram_coap::{BlockSize, CoapRequest, ContentFormat, Endpoint, Event, NullSocket};
//!
//! let endpoint = Endpoint::new(NullSocket::new());
//!
//! let request = CoapRequest::put()
//!     .path("/blocks/put")
//!     .content_format(ContentFormat::TEXT_PLAIN_UTF8)
//!     .block_size(BlockSize::new(128).unwrap())
//!     .payload(vec![0u8; 324]);
//!
//! let handle = endpoint
//!     .submit(request, "192.0.2.1:5683".parse().unwrap())
//!     .expect("submit failed");
//!
//! handle.on_event(|event| match event {
//!     Event::BlockSent(ack) => println!("block accepted: {}", ack),
//!     Event::Response(response) => println!("done: {}", response),
//!     event => println!("{:?}", event),
//! });
//! ```
//!
//! [RFC 7252]: https://tools.ietf.org/html/rfc7252
//! [RFC 7959]: https://tools.ietf.org/html/rfc7959

mod block;
mod clock;
pub mod consts;
mod content_format;
pub mod endpoint;
mod error;
pub mod message;
pub mod option;
mod socket;
pub mod testing;
mod trans_params;
mod util;

pub use block::*;
pub use clock::*;
pub use content_format::*;
pub use endpoint::*;
pub use error::*;
pub use message::*;
pub use option::*;
pub use socket::*;
pub use trans_params::*;

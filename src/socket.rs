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

//! The datagram socket capability.
//!
//! The endpoint interacts with the network only through [`DatagramSocket`].
//! Real implementations back this with a UDP socket; tests back it with the
//! programmable [`ScriptedSocket`](crate::testing::ScriptedSocket). Inbound
//! datagrams are pushed into the endpoint by whoever owns the receive side,
//! via [`Endpoint::handle_datagram`](crate::Endpoint::handle_datagram).

use super::*;
use std::hash::Hash;

/// Trait for the transmit half of a datagram socket.
pub trait DatagramSocket {
    /// The type used to identify the remote peer.
    type SocketAddr: Copy + Eq + Hash + std::fmt::Debug + std::fmt::Display;

    /// Sends a single datagram to the given destination.
    fn send_to(&self, buf: &[u8], dest: Self::SocketAddr) -> Result<(), Error>;
}

/// A [`DatagramSocket`] that quietly discards everything sent to it.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullSocket;

impl NullSocket {
    /// Creates a new `NullSocket`.
    pub fn new() -> NullSocket {
        NullSocket
    }
}

impl DatagramSocket for NullSocket {
    type SocketAddr = std::net::SocketAddr;

    fn send_to(&self, _buf: &[u8], _dest: Self::SocketAddr) -> Result<(), Error> {
        Ok(())
    }
}

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

use super::*;

/// The state of a single confirmable datagram on the wire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum TransactionState {
    /// Waiting for an acknowledgement; retransmitting on a schedule.
    Pending,

    /// The peer acknowledged the datagram.
    Acked,

    /// The peer reset the datagram.
    Reset,

    /// The retransmission budget was exhausted without an acknowledgement.
    TimedOut,
}

/// The retransmission state machine for one confirmable datagram.
///
/// The encoded bytes are retained so every retransmission is bit-identical
/// to the first send, message id included. Deadlines are computed from the
/// previous deadline rather than the observed fire time, which keeps the
/// schedule exact even when the dispatch loop runs late.
#[derive(Debug)]
pub(crate) struct Transaction<SA> {
    pub mid: MsgId,
    pub token: MsgToken,
    pub peer: SA,
    pub bytes: Vec<u8>,
    pub retransmit_count: u32,
    pub max_retransmit: u32,
    pub interval: u64,
    pub next_fire_at: u64,
    pub timer_seq: u64,
    pub state: TransactionState,
}

impl<SA> Transaction<SA> {
    pub fn new(
        mid: MsgId,
        token: MsgToken,
        peer: SA,
        bytes: Vec<u8>,
        initial_interval: u64,
        now: u64,
        max_retransmit: u32,
    ) -> Transaction<SA> {
        Transaction {
            mid,
            token,
            peer,
            bytes,
            retransmit_count: 0,
            max_retransmit,
            interval: initial_interval,
            next_fire_at: now + initial_interval,
            timer_seq: 0,
            state: TransactionState::Pending,
        }
    }

    /// True once every retransmission in the budget has been spent.
    pub fn budget_exhausted(&self) -> bool {
        self.retransmit_count >= self.max_retransmit
    }

    /// Accounts for one retransmission fired at `fired_at` and returns the
    /// deadline of the next one. Each interval is double the previous,
    /// giving send times of `{0, T, 3T, 7T, 15T, ...}`.
    pub fn record_retransmit(&mut self, fired_at: u64) -> u64 {
        self.retransmit_count += 1;
        self.interval *= 2;
        self.next_fire_at = fired_at + self.interval;
        self.next_fire_at
    }
}

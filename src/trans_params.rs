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

use rand::RngCore;
use std::time::Duration;

/// CoAP transmission parameters, as defined by
/// [RFC 7252 §4.8](https://tools.ietf.org/html/rfc7252#section-4.8).
///
/// The values here govern the retransmission schedule of confirmable
/// messages and the lifetime of exchanges. The defaults match the RFC;
/// setting `ack_random_factor` to `1.0` removes all jitter and produces
/// the deterministic schedule {2000, 4000, 8000, 16000, 32000} ms.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransmissionParameters {
    /// Initial acknowledgement timeout (`ACK_TIMEOUT`).
    pub ack_timeout: Duration,

    /// Multiplier for the initial timer jitter (`ACK_RANDOM_FACTOR`). Must be ≥ 1.0.
    pub ack_random_factor: f32,

    /// Retransmission budget (`MAX_RETRANSMIT`).
    pub max_retransmit: u32,

    /// Maximum lifetime of a single exchange. When `None`, the value is
    /// derived from the other parameters as in RFC 7252 §4.8.2
    /// (`EXCHANGE_LIFETIME`, 247 seconds with the defaults).
    pub exchange_timeout: Option<Duration>,

    /// Largest datagram this endpoint is willing to put on the wire.
    pub max_outbound_packet_len: usize,
}

/// From RFC7252:
///
/// > `MAX_LATENCY` is the maximum time a datagram is expected to take
/// > from the start of its transmission to the completion of its
/// > reception. We, also arbitrarily, define `MAX_LATENCY` to be 100 seconds.
pub const COAP_MAX_LATENCY: Duration = Duration::from_secs(100);

impl Default for TransmissionParameters {
    fn default() -> Self {
        TransmissionParameters {
            ack_timeout: Duration::from_secs(2),
            ack_random_factor: 1.5,
            max_retransmit: 4,
            exchange_timeout: None,
            max_outbound_packet_len: 1152,
        }
    }
}

impl TransmissionParameters {
    /// From RFC7252:
    ///
    /// > `PROCESSING_DELAY` is the time a node takes to turn around a
    /// > Confirmable message into an acknowledgement. We assume the node
    /// > will attempt to send an ACK before having the sender time out, so as
    /// > a conservative assumption we set it equal to `ACK_TIMEOUT`.
    pub fn processing_delay(&self) -> Duration {
        self.ack_timeout
    }

    /// From RFC7252:
    ///
    /// > `MAX_TRANSMIT_SPAN` is the maximum time from the first transmission
    /// > of a Confirmable message to its last retransmission. For the
    /// > default transmission parameters, the value is (2+4+8+16)*1.5 = 45
    /// > seconds, or more generally:
    /// >
    /// >> `ACK_TIMEOUT * ((2 ** MAX_RETRANSMIT) - 1) * ACK_RANDOM_FACTOR`
    pub fn max_transmit_span(&self) -> Duration {
        let ms = self.ack_timeout.as_millis() as f32
            * ((1u64 << self.max_retransmit) - 1) as f32
            * self.ack_random_factor;
        Duration::from_millis(ms as u64)
    }

    /// From RFC7252:
    ///
    /// > `MAX_TRANSMIT_WAIT` is the maximum time from the first transmission
    /// > of a Confirmable message to the time when the sender gives up on
    /// > receiving an acknowledgement or reset. For the default
    /// > transmission parameters, the value is (2+4+8+16+32)*1.5 = 93
    /// > seconds, or more generally:
    /// >
    /// >> `ACK_TIMEOUT * ((2 ** (MAX_RETRANSMIT + 1)) - 1) * ACK_RANDOM_FACTOR`
    pub fn max_transmit_wait(&self) -> Duration {
        let ms = self.ack_timeout.as_millis() as f32
            * ((1u64 << (self.max_retransmit + 1)) - 1) as f32
            * self.ack_random_factor;
        Duration::from_millis(ms as u64)
    }

    /// The effective exchange lifetime: the configured `exchange_timeout`
    /// when set, otherwise `MAX_TRANSMIT_SPAN + (2 * MAX_LATENCY) +
    /// PROCESSING_DELAY` (247 seconds with the default parameters).
    pub fn exchange_lifetime(&self) -> Duration {
        if let Some(timeout) = self.exchange_timeout {
            return timeout;
        }

        self.max_transmit_span() + 2 * COAP_MAX_LATENCY + self.processing_delay()
    }

    /// Calculates the initial retransmission interval: a uniformly random
    /// duration in `[ACK_TIMEOUT, ACK_TIMEOUT * ACK_RANDOM_FACTOR]`,
    /// in milliseconds. With `ack_random_factor == 1.0` this is exactly
    /// `ACK_TIMEOUT`.
    pub fn initial_retransmit_interval(&self, rng: &mut dyn RngCore) -> u64 {
        let base = self.ack_timeout.as_millis() as u64;

        const JDIV: u64 = 512u64;
        let rmod: u64 = (JDIV as f32 * (self.ack_random_factor - 1.0)) as u64;
        if rmod == 0 {
            return base;
        }
        let jmul = JDIV + rng.next_u64() % rmod;

        base * jmul / JDIV
    }
}

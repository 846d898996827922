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
use log::{debug, warn};

/// One logical request owned by the endpoint, alive until a terminal
/// event fires.
///
/// A block-wise request opens a fresh exchange (fresh message id and
/// deadline) for every block, all under the same stable token.
#[derive(Debug)]
pub(crate) struct Request<SA> {
    pub token: MsgToken,
    pub peer: SA,
    pub msg_type: MsgType,
    pub code: MsgCode,
    pub path: Vec<String>,
    pub content_format: Option<ContentFormat>,
    pub payload: Vec<u8>,
    pub config: RequestConfig,
    pub body: RequestBody,
    pub exchange: Option<ExchangeState>,
    pub shared: Rc<RequestShared>,

    /// A protocol anomaly (unexpected option, forbidden renegotiation)
    /// that left the exchange open. Reported as the terminal error when
    /// the exchange deadline fires.
    pub anomaly: Option<Error>,
}

/// Whether a request goes out whole or segmented.
#[derive(Debug)]
pub(crate) enum RequestBody {
    Simple,
    Blockwise(BlockwiseState),
}

/// The currently open exchange of a request.
#[derive(Debug)]
pub(crate) struct ExchangeState {
    pub mid: MsgId,
    pub deadline: u64,
    pub timer_seq: u64,
}

/// Encodes the wire image of a request, or of one block of it.
pub(crate) fn build_request_message<SA>(
    request: &Request<SA>,
    mid: MsgId,
    block1: Option<BlockInfo>,
    payload_range: std::ops::Range<usize>,
) -> Result<Vec<u8>, Error> {
    let mut encoder = VecMessageEncoder::with_payload_capacity(payload_range.len());
    encoder.set_msg_type(request.msg_type);
    encoder.set_msg_code(request.code);
    encoder.set_msg_id(mid);
    encoder.set_msg_token(request.token);

    for segment in &request.path {
        encoder.insert_option_str(OptionNumber::URI_PATH, segment)?;
    }
    if let Some(content_format) = request.content_format {
        encoder.insert_option_uint(OptionNumber::CONTENT_FORMAT, content_format.0 as u32)?;
    }
    if let Some(block1) = block1 {
        encoder.insert_option_uint(OptionNumber::BLOCK1, block1.0)?;
    }

    encoder.append_payload_bytes(&request.payload[payload_range])?;

    Ok(encoder.into())
}

impl<S: DatagramSocket> Core<S> {
    /// Routes an acknowledgement to the request that owns the acked
    /// transaction.
    pub(crate) fn handle_ack(&mut self, token: MsgToken, ack: OwnedImmutableMessage) {
        let is_blockwise = matches!(
            self.requests[&token].body,
            RequestBody::Blockwise(_)
        );

        if is_blockwise {
            self.handle_block_ack(token, ack);
        } else {
            self.handle_simple_ack(token, ack);
        }
    }

    /// Acknowledgement handling for a non-block-wise request.
    ///
    /// A piggybacked response completes the exchange; an empty ACK leaves
    /// it open for a separate response; a response carrying an unexpected
    /// Block1 option is acknowledged but never completes, so the exchange
    /// deadline eventually reports `Timeout`.
    fn handle_simple_ack(&mut self, token: MsgToken, ack: OwnedImmutableMessage) {
        let shared = self.requests[&token].shared.clone();

        if ack.msg_code().is_empty() {
            debug!("Empty ACK for {}; awaiting separate response", token);
            self.emit(&shared, Event::Acknowledged(ack));
            return;
        }

        if ack.block1().is_some() {
            warn!(
                "Unexpected Block1 option in response for {}; leaving exchange open",
                token
            );
            if let Some(request) = self.requests.get_mut(&token) {
                request.anomaly = Some(Error::UnexpectedOption);
            }
            self.emit(&shared, Event::Acknowledged(ack));
            return;
        }

        self.emit(&shared, Event::Acknowledged(ack.clone()));
        self.emit(&shared, Event::Response(ack));
        self.finish_request(token, None);
    }
}

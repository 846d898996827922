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
use std::time::Duration;

/// Policy for reacting to a server that renegotiates the Block1 size
/// *upward* (RFC 7959 §2.5).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SizeAdoption {
    /// Ignore the growth entirely. The transfer does not advance and the
    /// exchange eventually times out.
    #[default]
    Strict,

    /// Adopt the server's preferred size, clamped to the block size the
    /// request was submitted with.
    Rfc7959,
}

/// Per-request configuration, covering block-wise segmentation and the
/// transmission parameters of RFC 7252 §4.8.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Segment the payload at this granularity. Also acts as the ceiling
    /// for server-requested block-size growth. `None` disables block-wise
    /// transfer.
    pub block_size: Option<BlockSize>,

    /// Reaction to upward block-size renegotiation by the server.
    pub size_adoption: SizeAdoption,

    /// Retransmission and lifetime parameters.
    pub trans_params: TransmissionParameters,
}

/// A CoAP request under construction.
///
/// ```
/// use dgram_coap::{BlockSize, CoapRequest, ContentFormat};
///
/// let request = CoapRequest::put()
///     .path("/blocks/put")
///     .content_format(ContentFormat::TEXT_PLAIN_UTF8)
///     .block_size(BlockSize::new(128).unwrap())
///     .payload(vec![0u8; 324]);
/// ```
#[derive(Debug, Clone)]
pub struct CoapRequest {
    pub(crate) msg_type: MsgType,
    pub(crate) code: MsgCode,
    pub(crate) path: Vec<String>,
    pub(crate) content_format: Option<ContentFormat>,
    pub(crate) payload: Vec<u8>,
    pub(crate) config: RequestConfig,
}

impl CoapRequest {
    fn method(code: MsgCode) -> CoapRequest {
        CoapRequest {
            msg_type: MsgType::Con,
            code,
            path: Vec::new(),
            content_format: None,
            payload: Vec::new(),
            config: RequestConfig::default(),
        }
    }

    /// Creates a new GET request.
    pub fn get() -> CoapRequest {
        Self::method(MsgCode::MethodGet)
    }

    /// Creates a new POST request.
    pub fn post() -> CoapRequest {
        Self::method(MsgCode::MethodPost)
    }

    /// Creates a new PUT request.
    pub fn put() -> CoapRequest {
        Self::method(MsgCode::MethodPut)
    }

    /// Creates a new DELETE request.
    pub fn delete() -> CoapRequest {
        Self::method(MsgCode::MethodDelete)
    }

    /// Sets the resource path. Each `/`-separated segment becomes one
    /// Uri-Path option.
    pub fn path(mut self, path: &str) -> CoapRequest {
        self.path = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect();
        self
    }

    /// Sets the Content-Format option.
    pub fn content_format(mut self, content_format: ContentFormat) -> CoapRequest {
        self.content_format = Some(content_format);
        self
    }

    /// Sets the request payload.
    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> CoapRequest {
        self.payload = payload.into();
        self
    }

    /// Sends the request non-confirmably: no retransmission, no
    /// acknowledgement; only the exchange deadline bounds its lifetime.
    pub fn nonconfirmable(mut self) -> CoapRequest {
        self.msg_type = MsgType::Non;
        self
    }

    /// Segments the payload into blocks of the given size when it does not
    /// fit into a single block. Also caps server-requested growth.
    pub fn block_size(mut self, block_size: BlockSize) -> CoapRequest {
        self.config.block_size = Some(block_size);
        self
    }

    /// Sets the reaction to upward block-size renegotiation.
    pub fn size_adoption(mut self, size_adoption: SizeAdoption) -> CoapRequest {
        self.config.size_adoption = size_adoption;
        self
    }

    /// Overrides the maximum lifetime of each exchange of this request.
    pub fn exchange_timeout(mut self, timeout: Duration) -> CoapRequest {
        self.config.trans_params.exchange_timeout = Some(timeout);
        self
    }

    /// Overrides `ACK_TIMEOUT`, the initial retransmission timer.
    pub fn ack_timeout(mut self, timeout: Duration) -> CoapRequest {
        self.config.trans_params.ack_timeout = timeout;
        self
    }

    /// Overrides `ACK_RANDOM_FACTOR`. A value of `1.0` removes the
    /// retransmission jitter entirely.
    pub fn ack_random_factor(mut self, factor: f32) -> CoapRequest {
        self.config.trans_params.ack_random_factor = factor;
        self
    }

    /// Overrides `MAX_RETRANSMIT`, the retransmission budget.
    pub fn max_retransmit(mut self, max_retransmit: u32) -> CoapRequest {
        self.config.trans_params.max_retransmit = max_retransmit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments() {
        let request = CoapRequest::put().path("/blocks/put");
        assert_eq!(vec!["blocks".to_string(), "put".to_string()], request.path);

        let request = CoapRequest::get().path("");
        assert!(request.path.is_empty());
    }

    #[test]
    fn defaults() {
        let request = CoapRequest::post();
        assert_eq!(MsgType::Con, request.msg_type);
        assert_eq!(MsgCode::MethodPost, request.code);
        assert_eq!(None, request.config.block_size);
        assert_eq!(SizeAdoption::Strict, request.config.size_adoption);
    }
}

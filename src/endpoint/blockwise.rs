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

/// Progress of a Block1-segmented request.
///
/// `acked` counts the payload bytes the server has accepted so far; it is
/// always aligned to the *current* block size, because a size change only
/// ever happens on a block boundary. `num` is the index of the in-flight
/// block in the current geometry.
#[derive(Debug)]
pub(crate) struct BlockwiseState {
    pub szx: u8,
    pub cap_szx: u8,
    pub acked: usize,
    pub num: u32,
    pub in_flight_len: usize,
}

impl BlockwiseState {
    pub fn new(block_size: BlockSize) -> BlockwiseState {
        BlockwiseState {
            szx: block_size.szx(),
            cap_szx: block_size.szx(),
            acked: 0,
            num: 0,
            in_flight_len: 0,
        }
    }

    /// The current block length in bytes.
    pub fn block_len(&self) -> usize {
        1 << (self.szx as usize + 4)
    }

    /// Computes the payload range and Block1 option for the next block,
    /// recording its length as in-flight. Returns `None` if the block
    /// number can no longer be represented.
    pub fn next_block(&mut self, total: usize) -> Option<(std::ops::Range<usize>, BlockInfo)> {
        let start = self.acked;
        let end = total.min(start + self.block_len());
        let more = end < total;
        let info = BlockInfo::new(self.num, more, self.szx)?;
        self.in_flight_len = end - start;
        Some((start..end, info))
    }
}

impl<S: DatagramSocket> Core<S> {
    /// Reacts to an acknowledgement of the in-flight block of a block-wise
    /// request.
    ///
    /// A matching Block1 option advances the transfer (emitting
    /// `Acknowledged` then `BlockSent`), possibly renegotiating the block
    /// size downward first. An absent Block1 option is a protocol error:
    /// only `Acknowledged` is emitted and the exchange is left to its
    /// deadline. A stale block number or a forbidden size growth is
    /// ignored without any event.
    pub(crate) fn handle_block_ack(&mut self, token: MsgToken, ack: OwnedImmutableMessage) {
        let shared = self.requests[&token].shared.clone();

        if ack.msg_code().is_empty() {
            debug!("Empty ACK for block of {}; awaiting separate response", token);
            self.emit(&shared, Event::Acknowledged(ack));
            return;
        }

        let block1 = match ack.block1() {
            Some(block1) => block1,
            None => {
                warn!(
                    "Response for block-wise request {} carries no Block1 option",
                    token
                );
                if let Some(request) = self.requests.get_mut(&token) {
                    request.anomaly = Some(Error::UnexpectedOption);
                }
                self.emit(&shared, Event::Acknowledged(ack));
                return;
            }
        };

        let payload_len = self.requests[&token].payload.len();
        let size_adoption = self.requests[&token].config.size_adoption;

        let (finished, accepted_final) = {
            let request = self.requests.get_mut(&token).expect("request vanished");
            let blockwise = match &mut request.body {
                RequestBody::Blockwise(blockwise) => blockwise,
                RequestBody::Simple => unreachable!("simple request in block path"),
            };

            if block1.num() != blockwise.num {
                debug!(
                    "Stale Block1 ACK {} (in-flight num {}); dropping",
                    block1, blockwise.num
                );
                return;
            }

            let new_szx = if block1.szx() <= blockwise.szx {
                block1.szx()
            } else {
                match size_adoption {
                    SizeAdoption::Strict => {
                        warn!(
                            "Server renegotiated block size up to {} (current {}); ignoring",
                            block1.len(),
                            blockwise.block_len()
                        );
                        request.anomaly = Some(Error::ProtocolViolation);
                        return;
                    }
                    SizeAdoption::Rfc7959 => {
                        // Grow at most to the submitted cap, and only to a
                        // size the next offset is aligned to.
                        let next_offset = blockwise.acked + blockwise.in_flight_len;
                        let mut candidate = block1.szx().min(blockwise.cap_szx);
                        while candidate > blockwise.szx
                            && next_offset % (1usize << (candidate + 4)) != 0
                        {
                            candidate -= 1;
                        }
                        candidate.max(blockwise.szx)
                    }
                }
            };

            if new_szx != blockwise.szx {
                debug!(
                    "Renegotiating block size {} -> {} for {}",
                    blockwise.block_len(),
                    1usize << (new_szx + 4),
                    token
                );
            }

            blockwise.acked += blockwise.in_flight_len;
            blockwise.szx = new_szx;

            let finished = blockwise.acked >= payload_len;
            if !finished {
                // Realign the block number to the (possibly new) geometry,
                // starting at the first unacknowledged byte.
                blockwise.num = (blockwise.acked / blockwise.block_len()) as u32;
            }

            (finished, finished && !block1.more_flag())
        };

        self.emit(&shared, Event::Acknowledged(ack.clone()));
        self.emit(&shared, Event::BlockSent(ack.clone()));

        if finished {
            if accepted_final {
                self.emit(&shared, Event::Response(ack));
                self.finish_request(token, None);
            } else {
                warn!(
                    "Server still expects more blocks after the final block of {}",
                    token
                );
            }
            return;
        }

        if let Err(e) = self.start_exchange(token, false) {
            self.emit(&shared, Event::SendFailed(e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_full_and_partial_blocks() {
        let mut state = BlockwiseState::new(BlockSize::new(128).unwrap());

        let (range, info) = state.next_block(324).unwrap();
        assert_eq!(0..128, range);
        assert_eq!(0, info.num());
        assert!(info.more_flag());
        assert_eq!(128, state.in_flight_len);

        state.acked = 256;
        state.num = 2;
        let (range, info) = state.next_block(324).unwrap();
        assert_eq!(256..324, range);
        assert_eq!(2, info.num());
        assert!(!info.more_flag());
        assert_eq!(68, state.in_flight_len);
    }

    #[test]
    fn realigns_after_shrink() {
        let mut state = BlockwiseState::new(BlockSize::new(128).unwrap());
        state.acked = 128;
        state.szx = 2;
        state.num = (state.acked / state.block_len()) as u32;

        assert_eq!(2, state.num);
        let (range, info) = state.next_block(324).unwrap();
        assert_eq!(128..192, range);
        assert_eq!(2, info.num());
        assert!(info.more_flag());
    }
}

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
use crate::message::codec::{decode_option, OptionDecode};

/// A convenience iterator for parsing options from a byte buffer.
///
/// Iteration stops at the payload marker, if one is present; the remaining
/// bytes (the payload) are available through [`OptionIterator::as_slice`].
#[derive(Debug, Clone)]
pub struct OptionIterator<'a> {
    iter: core::slice::Iter<'a, u8>,
    last_option: OptionNumber,
    reached_payload_marker: bool,
}

impl<'a> Default for OptionIterator<'a> {
    fn default() -> Self {
        OptionIterator::new(&[])
    }
}

impl<'a> OptionIterator<'a> {
    /// Creates a new instance of an `OptionIterator` with the given byte slice.
    pub fn new(buffer: &'a [u8]) -> OptionIterator<'a> {
        OptionIterator {
            iter: buffer.iter(),
            last_option: Default::default(),
            reached_payload_marker: false,
        }
    }

    /// Returns the unread remainder as a byte slice.
    pub fn as_slice(&self) -> &'a [u8] {
        self.iter.as_slice()
    }

    /// Returns true once iteration has consumed the `0xFF` payload marker.
    pub fn reached_payload_marker(&self) -> bool {
        self.reached_payload_marker
    }
}

impl<'a> Iterator for OptionIterator<'a> {
    type Item = Result<(OptionNumber, &'a [u8]), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reached_payload_marker {
            return None;
        }
        match decode_option(&mut self.iter, self.last_option) {
            Ok(OptionDecode::Option(key, value)) => {
                self.last_option = key;
                Some(Ok((key, value)))
            }
            Ok(OptionDecode::PayloadMarker) => {
                self.reached_payload_marker = true;
                None
            }
            Ok(OptionDecode::EndOfMessage) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl AsRef<[u8]> for OptionIterator<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

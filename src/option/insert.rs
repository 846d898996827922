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
use crate::util::encode_u32;

/// Trait for inserting options into a message being encoded.
///
/// Options may be inserted in any order, but inserting them in ascending
/// option-number order is significantly faster.
pub trait OptionInsert {
    /// Inserts an option with the given opaque byte value.
    fn insert_option_with_bytes(&mut self, key: OptionNumber, value: &[u8]) -> Result<(), Error>;

    /// Inserts an option with no value.
    fn insert_option_empty(&mut self, key: OptionNumber) -> Result<(), Error> {
        self.insert_option_with_bytes(key, &[])
    }

    /// Inserts an option with an unsigned integer value, encoded with the
    /// minimum number of bytes.
    fn insert_option_uint(&mut self, key: OptionNumber, value: u32) -> Result<(), Error> {
        let mut buffer = [0u8; 4];
        let value = encode_u32(value, &mut buffer);
        self.insert_option_with_bytes(key, value)
    }

    /// Inserts an option with a UTF8 string value.
    fn insert_option_str(&mut self, key: OptionNumber, value: &str) -> Result<(), Error> {
        self.insert_option_with_bytes(key, value.as_bytes())
    }
}

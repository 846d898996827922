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

/// Type representing a CoAP option number.
#[derive(Copy, Eq, PartialEq, Hash, Clone, Ord, PartialOrd, Default)]
pub struct OptionNumber(pub u16);

impl OptionNumber {
    /// IF_MATCH option.
    pub const IF_MATCH: OptionNumber = OptionNumber(1);

    /// URI_HOST option.
    pub const URI_HOST: OptionNumber = OptionNumber(3);

    /// ETAG option.
    pub const ETAG: OptionNumber = OptionNumber(4);

    /// OBSERVE option.
    pub const OBSERVE: OptionNumber = OptionNumber(6);

    /// URI_PORT option.
    pub const URI_PORT: OptionNumber = OptionNumber(7);

    /// URI_PATH option.
    pub const URI_PATH: OptionNumber = OptionNumber(11);

    /// CONTENT_FORMAT option.
    pub const CONTENT_FORMAT: OptionNumber = OptionNumber(12);

    /// MAX_AGE option.
    pub const MAX_AGE: OptionNumber = OptionNumber(14);

    /// URI_QUERY option.
    pub const URI_QUERY: OptionNumber = OptionNumber(15);

    /// ACCEPT option.
    pub const ACCEPT: OptionNumber = OptionNumber(17);

    /// BLOCK2 option.
    pub const BLOCK2: OptionNumber = OptionNumber(23);

    /// BLOCK1 option.
    pub const BLOCK1: OptionNumber = OptionNumber(27);

    /// SIZE2 option.
    pub const SIZE2: OptionNumber = OptionNumber(28);

    /// SIZE1 option.
    pub const SIZE1: OptionNumber = OptionNumber(60);

    /// Returns true if this option number is critical, false if it is elective.
    pub fn is_critical(self) -> bool {
        const FLAG_CRITICAL: u16 = 1;
        self.0 & FLAG_CRITICAL == FLAG_CRITICAL
    }

    /// Returns true if this option is "un-safe" to forward.
    pub fn is_un_safe(self) -> bool {
        const FLAG_UN_SAFE: u16 = 2;
        self.0 & FLAG_UN_SAFE == FLAG_UN_SAFE
    }

    /// Returns true if multiple instances of this option are allowed, false if
    /// only one instance is allowed.
    pub fn is_repeatable(self) -> bool {
        matches!(
            self,
            OptionNumber::IF_MATCH
                | OptionNumber::ETAG
                | OptionNumber::URI_PATH
                | OptionNumber::URI_QUERY
        )
    }
}

impl core::ops::Sub for OptionNumber {
    type Output = u16;

    fn sub(self, rhs: OptionNumber) -> u16 {
        self.0 - rhs.0
    }
}

impl std::fmt::Display for OptionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            OptionNumber::IF_MATCH => "If-Match",
            OptionNumber::URI_HOST => "Uri-Host",
            OptionNumber::ETAG => "ETag",
            OptionNumber::OBSERVE => "Observe",
            OptionNumber::URI_PORT => "Uri-Port",
            OptionNumber::URI_PATH => "Uri-Path",
            OptionNumber::CONTENT_FORMAT => "Content-Format",
            OptionNumber::MAX_AGE => "Max-Age",
            OptionNumber::URI_QUERY => "Uri-Query",
            OptionNumber::ACCEPT => "Accept",
            OptionNumber::BLOCK2 => "Block2",
            OptionNumber::BLOCK1 => "Block1",
            OptionNumber::SIZE2 => "Size2",
            OptionNumber::SIZE1 => "Size1",
            OptionNumber(x) => return write!(f, "Option({})", x),
        };
        f.write_str(name)
    }
}

impl std::fmt::Debug for OptionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criticality() {
        assert!(OptionNumber::URI_PATH.is_critical());
        assert!(OptionNumber::BLOCK1.is_critical());
        assert!(!OptionNumber::CONTENT_FORMAT.is_critical());
        assert!(!OptionNumber::BLOCK2.is_critical());
    }

    #[test]
    fn repeatability() {
        assert!(OptionNumber::URI_PATH.is_repeatable());
        assert!(!OptionNumber::BLOCK1.is_repeatable());
        assert!(!OptionNumber::CONTENT_FORMAT.is_repeatable());
    }
}

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

use std::convert::From;
use std::fmt::{Debug, Display, Formatter};

/// Type for interpreting `block1` and `block2` option values.
///
/// The value packs the block number (`num`), the more-blocks flag (`m`),
/// and the size exponent (`szx`) into a single unsigned integer, exactly
/// as they appear on the wire (RFC 7959 §2.2).
#[derive(Copy, Clone, Eq, Ord, Hash, PartialOrd, PartialEq)]
pub struct BlockInfo(pub u32);

impl BlockInfo {
    const MORE_FLAG: u32 = 0b1000;

    /// Maximum legal value for `num`.
    pub const NUM_MAX: u32 = (1 << 20) - 1;

    const SZX_RESERVED: u8 = 0b0111;

    /// Maximum legal value for `szx`.
    pub const SZX_MAX: u8 = Self::SZX_RESERVED - 1;

    /// Constructs a new `BlockInfo` from the number, more flag, and size exponent.
    pub fn new(num: u32, m: bool, szx: u8) -> Option<BlockInfo> {
        if num > Self::NUM_MAX || szx > Self::SZX_MAX {
            None
        } else {
            Some(BlockInfo((num << 4) + ((m as u32) << 3) + szx as u32))
        }
    }

    /// Block number value.
    #[inline]
    pub fn num(&self) -> u32 {
        self.0 >> 4
    }

    /// More flag value. If set, there are more blocks to follow.
    #[inline]
    pub fn more_flag(&self) -> bool {
        (self.0 & Self::MORE_FLAG) == Self::MORE_FLAG
    }

    /// Block size exponent field value.
    #[inline]
    pub fn szx(&self) -> u8 {
        self.0 as u8 & 0b111
    }

    /// The offset (in bytes) that this block starts at.
    #[inline]
    pub fn offset(&self) -> usize {
        let val = self.0 as usize;
        (val & !0xF) << (val & 0b0111)
    }

    /// The length of this block, in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        1 << (self.szx() as usize + 4)
    }

    /// Checks the validity of the contained value. `szx` 7 is reserved.
    pub fn is_invalid(&self) -> bool {
        (self.num() > Self::NUM_MAX) || self.szx() == Self::SZX_RESERVED
    }

    /// Checks the contained value for validity and, if valid, returns it in an `Option`.
    pub fn valid(self) -> Option<BlockInfo> {
        if self.is_invalid() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u32> for BlockInfo {
    fn from(x: u32) -> Self {
        BlockInfo(x)
    }
}

impl Display for BlockInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}/{}/{}",
            self.num(),
            self.more_flag() as u8,
            self.len()
        )?;
        if self.is_invalid() {
            f.write_str("(!)")
        } else {
            Ok(())
        }
    }
}

impl Debug for BlockInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "BlockInfo(0x{:06X}/", self.0)?;
        Display::fmt(self, f)?;
        f.write_str(")")
    }
}

/// A validated block-wise transfer granularity: a power of two between
/// 16 and 1024 bytes, as permitted by RFC 7959.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BlockSize(u8);

impl BlockSize {
    /// 16-byte blocks (`szx` 0).
    pub const MIN: BlockSize = BlockSize(0);

    /// 1024-byte blocks (`szx` 6).
    pub const MAX: BlockSize = BlockSize(6);

    /// Creates a `BlockSize` from a byte count, returning `None` unless
    /// the count is one of 16, 32, 64, 128, 256, 512, or 1024.
    pub fn new(bytes: u16) -> Option<BlockSize> {
        match bytes {
            16 => Some(BlockSize(0)),
            32 => Some(BlockSize(1)),
            64 => Some(BlockSize(2)),
            128 => Some(BlockSize(3)),
            256 => Some(BlockSize(4)),
            512 => Some(BlockSize(5)),
            1024 => Some(BlockSize(6)),
            _ => None,
        }
    }

    /// Creates a `BlockSize` directly from a size exponent in `0..=6`.
    pub fn from_szx(szx: u8) -> Option<BlockSize> {
        if szx <= BlockInfo::SZX_MAX {
            Some(BlockSize(szx))
        } else {
            None
        }
    }

    /// The size exponent carried in block options.
    #[inline]
    pub fn szx(self) -> u8 {
        self.0
    }

    /// The block length in bytes, `2^(szx+4)`.
    #[inline]
    pub fn len(self) -> usize {
        1 << (self.0 as usize + 4)
    }
}

impl Display for BlockSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields() {
        let block = BlockInfo::new(0, false, 6).unwrap();
        assert_eq!(false, block.more_flag());
        assert_eq!(6, block.szx());
        assert_eq!(0, block.num());
        assert_eq!(1024, block.len());
        assert_eq!(0, block.offset());
        assert_eq!(false, block.is_invalid());
    }

    #[test]
    fn offsets() {
        let block = BlockInfo::new(2, true, 3).unwrap();
        assert_eq!(true, block.more_flag());
        assert_eq!(128, block.len());
        assert_eq!(256, block.offset());
    }

    #[test]
    fn validity() {
        assert_eq!(None, BlockInfo::new(BlockInfo::NUM_MAX + 1, false, 0));
        assert_eq!(None, BlockInfo::new(0, false, 7));

        let block = BlockInfo(BlockInfo::SZX_RESERVED as u32);
        assert_eq!(true, block.is_invalid());
        assert_eq!(None, block.valid());

        let block = BlockInfo(0);
        assert_eq!(false, block.is_invalid());
        assert_eq!(Some(block), block.valid());
    }

    #[test]
    fn block_sizes() {
        assert_eq!(None, BlockSize::new(48));
        assert_eq!(None, BlockSize::new(2048));

        for (bytes, szx) in [(16u16, 0u8), (32, 1), (64, 2), (128, 3), (256, 4), (512, 5), (1024, 6)] {
            let bs = BlockSize::new(bytes).unwrap();
            assert_eq!(szx, bs.szx());
            assert_eq!(bytes as usize, bs.len());
            assert_eq!(Some(bs), BlockSize::from_szx(szx));
        }

        assert_eq!(None, BlockSize::from_szx(7));
    }
}

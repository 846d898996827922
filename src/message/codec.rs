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

//! Low-level message codec functions.

use super::option::*;
use super::*;

/// Outcome of decoding a single item from the option area of a message.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OptionDecode<'a> {
    /// A well-formed option with its absolute option number and value.
    Option(OptionNumber, &'a [u8]),

    /// The `0xFF` payload marker. Everything after it is payload.
    PayloadMarker,

    /// The buffer ended without a payload marker. The message has no payload.
    EndOfMessage,
}

/// Calculates the encoded size of a CoAP option.
pub fn calc_option_size(prev_key: OptionNumber, key: OptionNumber, mut value_len: usize) -> usize {
    if value_len >= 269 {
        value_len += 2;
    } else if value_len >= 13 {
        value_len += 1;
    }

    let option_delta = key - prev_key;

    if option_delta >= 269 {
        value_len += 3;
    } else if option_delta >= 13 {
        value_len += 2;
    } else {
        value_len += 1;
    }

    value_len
}

/// Decodes one option from a `core::slice::Iter`, which can be obtained from a byte slice.
/// The iterator is then advanced to the next option.
///
/// Returns [`OptionDecode::PayloadMarker`] when it encounters the end-of-options
/// marker (`0xFF`), and [`OptionDecode::EndOfMessage`] when the iterator has been
/// fully consumed. Option values running past the end of the buffer, as well as
/// the reserved delta/length nibble 15, are rejected with [`Error::ParseFailure`].
pub fn decode_option<'a>(
    iter: &mut core::slice::Iter<'a, u8>,
    last_option: OptionNumber,
) -> Result<OptionDecode<'a>, Error> {
    macro_rules! try_next {
        ($iter:expr) => {
            match ($iter).next() {
                Some(x) => *x,
                None => return Err(Error::ParseFailure),
            }
        };
    }

    let header: u8 = match iter.next() {
        Some(x) => *x,
        None => return Ok(OptionDecode::EndOfMessage),
    };

    if header == 0xFF {
        return Ok(OptionDecode::PayloadMarker);
    }

    let key_delta: u16 = match header >> 4 {
        13 => 13u16 + try_next!(iter) as u16,
        14 => {
            let msb = try_next!(iter) as u16;
            269u16
                .checked_add((msb << 8) + try_next!(iter) as u16)
                .ok_or(Error::ParseFailure)?
        }
        15 => return Err(Error::ParseFailure),
        key => key as u16,
    };

    let len = match header & 0xF {
        13 => (13 + try_next!(iter)) as usize,
        14 => {
            let msb = try_next!(iter) as usize;
            269 + (msb << 8) + try_next!(iter) as usize
        }
        15 => return Err(Error::ParseFailure),
        len => len as usize,
    };

    if last_option.0 > u16::MAX - key_delta {
        // Don't let the key wrap.
        return Err(Error::ParseFailure);
    }

    let key = OptionNumber(last_option.0 + key_delta);

    if len == 0 {
        return Ok(OptionDecode::Option(key, &[]));
    }

    if len > iter.as_slice().len() {
        // Option value runs past the end of the datagram.
        return Err(Error::ParseFailure);
    }

    let value: &'a [u8] = &iter.as_slice()[..len];

    iter.nth(len - 1);

    Ok(OptionDecode::Option(key, value))
}

/// Encodes all parts of an option into the given buffer *except* the value. All other parts,
/// including the value length, are encoded. This is typically used directly when inserting
/// options, otherwise [`encode_option`] (which writes the value) is typically a better fit.
pub fn encode_option_without_value(
    buffer: &mut [u8],
    prev_key: OptionNumber,
    key: OptionNumber,
    value_len: usize,
) -> Result<usize, Error> {
    if prev_key > key {
        return Err(Error::InvalidArgument);
    }

    let calc_len = calc_option_size(prev_key, key, value_len);
    if calc_len > buffer.len() {
        log::warn!("calc_len:{}, blen:{}", calc_len, buffer.len());
        return Err(Error::OutOfSpace);
    }

    if value_len > MAX_OPTION_VALUE_SIZE {
        log::warn!("value_len:{}, max:{}", value_len, MAX_OPTION_VALUE_SIZE);
        return Err(Error::InvalidArgument);
    }

    let mut value_offset = 1;
    let mut option_delta = key - prev_key;

    if option_delta >= 269 {
        option_delta -= 269;
        buffer[0] = 14 << 4;
        buffer[1] = (option_delta >> 8) as u8;
        buffer[2] = option_delta as u8;
        value_offset += 2;
    } else if option_delta >= 13 {
        buffer[0] = 13 << 4;
        buffer[1] = (option_delta - 13) as u8;
        value_offset += 1;
    } else {
        buffer[0] = (option_delta << 4) as u8;
    }

    if value_len >= 269 {
        buffer[0] |= 14;
        buffer[value_offset] = ((value_len - 269) >> 8) as u8;
        buffer[value_offset + 1] = (value_len - 269) as u8;
        value_offset += 2;
    } else if value_len >= 13 {
        buffer[0] |= 13;
        buffer[value_offset] = (value_len - 13) as u8;
        value_offset += 1;
    } else {
        buffer[0] |= (value_len & 15) as u8;
    }

    Ok(value_offset + value_len)
}

/// Encodes a complete option, header and value, at the start of `buffer`.
/// Returns the number of bytes written.
pub fn encode_option(
    buffer: &mut [u8],
    prev_key: OptionNumber,
    key: OptionNumber,
    value: &[u8],
) -> Result<usize, Error> {
    let total = encode_option_without_value(buffer, prev_key, key, value.len())?;
    buffer[total - value.len()..total].copy_from_slice(value);
    Ok(total)
}

/// The first already-encoded option that sorts after an out-of-order key,
/// located by [`find_successor`]. Offsets are relative to the option area.
struct Successor {
    /// Where the new option's header must go.
    split: usize,

    /// Option number of the option preceding the split (zero if none).
    prev_key: OptionNumber,

    /// The successor's option number.
    key: OptionNumber,

    /// Start of the successor's value bytes.
    value_start: usize,

    /// Length of the successor's value.
    value_len: usize,

    /// First byte past the successor.
    end: usize,
}

/// Walks an option area until it reaches the first option with a number
/// greater than `key`. The caller guarantees such an option exists; a
/// truncated or corrupt area surfaces as `InvalidArgument`.
fn find_successor(area: &[u8], key: OptionNumber) -> Result<Successor, Error> {
    let mut prev_key = OptionNumber(0);
    let mut iter = area.iter();

    loop {
        let split = area.len() - iter.as_slice().len();
        match decode_option(&mut iter, prev_key)? {
            OptionDecode::Option(next_key, value) => {
                if next_key > key {
                    let end = area.len() - iter.as_slice().len();
                    return Ok(Successor {
                        split,
                        prev_key,
                        key: next_key,
                        value_start: end - value.len(),
                        value_len: value.len(),
                        end,
                    });
                }
                prev_key = next_key;
            }
            _ => return Err(Error::InvalidArgument),
        }
    }
}

/// Places an option into an already-encoded option area, keeping the area
/// in ascending option-number order. `len` is the current encoded length
/// of the area and `last_option` the highest option number in it; the
/// updated pair is returned.
///
/// Appending in ascending order is a single encode at the end. A key below
/// `last_option` is costlier: the option that ends up after the new one
/// needs its delta re-measured from a new predecessor, and the area is
/// reshuffled around it in place.
pub fn insert_option(
    buffer: &mut [u8],
    len: usize,
    last_option: OptionNumber,
    key: OptionNumber,
    value: &[u8],
) -> Result<(usize, OptionNumber), Error> {
    if value.len() > MAX_OPTION_VALUE_SIZE {
        return Err(Error::InvalidArgument);
    }

    if key >= last_option {
        let written = encode_option(&mut buffer[len..], last_option, key, value)?;
        return Ok((len + written, key));
    }

    let succ = find_successor(&buffer[..len], key)?;

    let inserted_size = calc_option_size(succ.prev_key, key, value.len());
    let reheadered_size = calc_option_size(key, succ.key, succ.value_len);
    let succ_dest = succ.split + inserted_size;
    let new_len = succ_dest + reheadered_size + (len - succ.end);

    if new_len > buffer.len() {
        log::warn!("option area overflow: need {}, have {}", new_len, buffer.len());
        return Err(Error::OutOfSpace);
    }

    // The successor's value and every option after it keep their relative
    // layout; they shift as one block by the net size change. Only the two
    // headers in front of that block are re-encoded afterwards.
    let value_dest = succ_dest + reheadered_size - succ.value_len;
    buffer.copy_within(succ.value_start..len, value_dest);
    encode_option_without_value(&mut buffer[succ_dest..], key, succ.key, succ.value_len)?;
    encode_option(&mut buffer[succ.split..], succ.prev_key, key, value)?;

    Ok((new_len, last_option))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_reserved_nibbles() {
        let buffer = [0xF1u8, 0x00];
        let mut iter = buffer.iter();
        assert_eq!(
            Err(Error::ParseFailure),
            decode_option(&mut iter, OptionNumber(0))
        );

        let buffer = [0x1Fu8, 0x00];
        let mut iter = buffer.iter();
        assert_eq!(
            Err(Error::ParseFailure),
            decode_option(&mut iter, OptionNumber(0))
        );
    }

    #[test]
    fn decode_rejects_truncated_value() {
        // Claims a 4-byte value but only carries two.
        let buffer = [0xB4u8, 0xAA, 0xBB];
        let mut iter = buffer.iter();
        assert_eq!(
            Err(Error::ParseFailure),
            decode_option(&mut iter, OptionNumber(0))
        );
    }

    #[test]
    fn decode_payload_marker() {
        let buffer = [0xFFu8, 0x01];
        let mut iter = buffer.iter();
        assert_eq!(
            Ok(OptionDecode::PayloadMarker),
            decode_option(&mut iter, OptionNumber(0))
        );
    }

    #[test]
    fn encode_decode_extended_delta() {
        let mut buffer = [0u8; 64];
        let len = encode_option(
            &mut buffer,
            OptionNumber(0),
            OptionNumber::SIZE1,
            &[0x04, 0x00],
        )
        .unwrap();

        let mut iter = buffer[..len].iter();
        match decode_option(&mut iter, OptionNumber(0)).unwrap() {
            OptionDecode::Option(key, value) => {
                assert_eq!(OptionNumber::SIZE1, key);
                assert_eq!(&[0x04, 0x00], value);
            }
            x => panic!("unexpected decode: {:?}", x),
        }
    }

    #[test]
    fn out_of_order_insert() {
        let mut buffer = [0u8; 128];
        let mut len = 0;
        let mut last = OptionNumber(0);

        let (l, last_opt) =
            insert_option(&mut buffer, len, last, OptionNumber::CONTENT_FORMAT, &[42]).unwrap();
        len = l;
        last = last_opt;

        // Uri-Path (11) arrives after Content-Format (12) was written.
        let (l, _) = insert_option(&mut buffer, len, last, OptionNumber::URI_PATH, b"blocks")
            .unwrap();
        len = l;

        let mut iter = buffer[..len].iter();
        match decode_option(&mut iter, OptionNumber(0)).unwrap() {
            OptionDecode::Option(key, value) => {
                assert_eq!(OptionNumber::URI_PATH, key);
                assert_eq!(b"blocks", value);
            }
            x => panic!("unexpected decode: {:?}", x),
        }
        match decode_option(&mut iter, OptionNumber::URI_PATH).unwrap() {
            OptionDecode::Option(key, value) => {
                assert_eq!(OptionNumber::CONTENT_FORMAT, key);
                assert_eq!(&[42], value);
            }
            x => panic!("unexpected decode: {:?}", x),
        }
    }
}

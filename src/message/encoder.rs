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

use super::codec::*;
use super::*;

/// A class for writing stand-alone messages to a mutable byte slice.
#[derive(Debug)]
pub struct BufferMessageEncoder<'buf> {
    buffer: &'buf mut [u8],
    len: usize,
    option_start: usize,
    payload_start: usize,
    last_option: OptionNumber,
}

impl<'buf> BufferMessageEncoder<'buf> {
    /// The minimum size buffer that can be passed into `new`.
    pub const MIN_MESSAGE_BUFFER_LEN: usize = 12;

    /// Creates a new `BufferMessageEncoder` using the given buffer.
    pub fn new(buffer: &'buf mut [u8]) -> BufferMessageEncoder<'buf> {
        if buffer.len() < BufferMessageEncoder::MIN_MESSAGE_BUFFER_LEN {
            panic!("Buffer too small");
        }

        // Set version on first byte.
        buffer[0] = COAP_MSG_VERSION << COAP_MSG_VER_OFFS;

        BufferMessageEncoder {
            buffer,
            len: 4,
            option_start: 4,
            payload_start: 4,
            last_option: Default::default(),
        }
    }

    /// Returns a byte slice containing the encoded message.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

impl<'buf> std::fmt::Display for BufferMessageEncoder<'buf> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", CoapByteDisplayFormatter(self.as_bytes()))
    }
}

impl<'buf> core::ops::Deref for BufferMessageEncoder<'buf> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl<'buf> MessageWrite for BufferMessageEncoder<'buf> {
    fn set_msg_type(&mut self, tt: MsgType) {
        self.buffer[0] = (self.buffer[0] & !COAP_MSG_T_MASK) | ((tt as u8) << COAP_MSG_T_OFFS);
    }

    fn set_msg_id(&mut self, msg_id: u16) {
        self.buffer[2] = (msg_id >> 8) as u8;
        self.buffer[3] = msg_id as u8;
    }

    fn set_msg_code(&mut self, code: MsgCode) {
        self.buffer[1] = code as u8;
    }

    fn set_msg_token(&mut self, token: MsgToken) {
        if self.option_start != 4 + token.len() {
            self.len = 4 + token.len();
            self.option_start = self.len;
            self.payload_start = self.option_start;

            self.buffer[0] = (self.buffer[0] & !COAP_MSG_TKL_MASK) | token.len() as u8;
        }

        self.buffer[4..4 + token.len()].copy_from_slice(token.as_bytes());
    }

    fn append_payload_bytes(&mut self, body: &[u8]) -> Result<(), Error> {
        if body.is_empty() {
            return Ok(());
        }

        if self.len == self.payload_start {
            if self.payload_start >= self.buffer.len() {
                return Err(Error::OutOfSpace);
            }
            // Append an end-of-options marker.
            self.buffer[self.payload_start] = 0xFF;
            self.len += 1;
        }

        let new_body_end = self.len + body.len();

        if new_body_end > self.buffer.len() {
            return Err(Error::OutOfSpace);
        }

        self.buffer[self.len..new_body_end].copy_from_slice(body);
        self.len = new_body_end;

        Ok(())
    }

    fn clear(&mut self) {
        self.buffer[0] = COAP_MSG_VERSION << COAP_MSG_VER_OFFS;
        self.len = 4;
        self.option_start = 4;
        self.payload_start = 4;
        self.last_option = Default::default();
    }
}

impl<'buf> OptionInsert for BufferMessageEncoder<'buf> {
    fn insert_option_with_bytes(&mut self, key: OptionNumber, value: &[u8]) -> Result<(), Error> {
        let option_start = self.option_start;
        let (mut len, last_option) = insert_option(
            &mut self.buffer[option_start..],
            self.len - option_start,
            self.last_option,
            key,
            value,
        )?;

        len += option_start;
        self.last_option = last_option;
        self.len = len;
        self.payload_start = len;

        Ok(())
    }
}

/// A class for writing stand-alone messages to a heap-allocated [`Vec`].
#[derive(Debug)]
pub struct VecMessageEncoder {
    buffer: Vec<u8>,
    option_start: usize,
    payload_start: usize,
    last_option: OptionNumber,
}

impl VecMessageEncoder {
    /// Creates a new `VecMessageEncoder` instance.
    pub fn new() -> VecMessageEncoder {
        Self::with_payload_capacity(16)
    }

    /// Creates a new `VecMessageEncoder` instance with a specific capacity.
    pub fn with_payload_capacity(capacity: usize) -> VecMessageEncoder {
        let mut buffer = Vec::with_capacity(16 + capacity);

        // Set version on first byte.
        buffer.push(COAP_MSG_VERSION << COAP_MSG_VER_OFFS);
        buffer.resize(4, 0);

        VecMessageEncoder {
            buffer,
            option_start: 4,
            payload_start: 4,
            last_option: Default::default(),
        }
    }

    /// Returns a byte slice containing the encoded message.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

impl std::convert::From<VecMessageEncoder> for Vec<u8> {
    fn from(x: VecMessageEncoder) -> Self {
        x.buffer
    }
}

impl std::convert::From<VecMessageEncoder> for OwnedImmutableMessage {
    fn from(x: VecMessageEncoder) -> Self {
        OwnedImmutableMessage::new(x.buffer).expect("Encoding corrupt")
    }
}

impl Default for VecMessageEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VecMessageEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", CoapByteDisplayFormatter(self.as_bytes()))
    }
}

impl core::ops::Deref for VecMessageEncoder {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl MessageWrite for VecMessageEncoder {
    fn set_msg_type(&mut self, tt: MsgType) {
        self.buffer[0] = (self.buffer[0] & !COAP_MSG_T_MASK) | ((tt as u8) << COAP_MSG_T_OFFS);
    }

    fn set_msg_id(&mut self, msg_id: u16) {
        self.buffer[2] = (msg_id >> 8) as u8;
        self.buffer[3] = msg_id as u8;
    }

    fn set_msg_code(&mut self, code: MsgCode) {
        self.buffer[1] = code as u8;
    }

    fn set_msg_token(&mut self, token: MsgToken) {
        if self.option_start != 4 + token.len() {
            self.buffer.resize(4 + token.len(), 0);
            self.option_start = self.buffer.len();
            self.payload_start = self.option_start;

            self.buffer[0] = (self.buffer[0] & !COAP_MSG_TKL_MASK) | token.len() as u8;
        }
        self.buffer[4..4 + token.len()].copy_from_slice(token.as_bytes());
    }

    fn append_payload_bytes(&mut self, body: &[u8]) -> Result<(), Error> {
        if body.is_empty() {
            return Ok(());
        }

        if self.buffer.len() == self.payload_start {
            // Append an end-of-options marker.
            self.buffer.push(0xFF);
        }

        self.buffer.extend_from_slice(body);

        Ok(())
    }

    fn clear(&mut self) {
        self.buffer.truncate(4);
        self.buffer[0] = COAP_MSG_VERSION << COAP_MSG_VER_OFFS;
        self.buffer[1] = 0;
        self.option_start = 4;
        self.payload_start = 4;
        self.last_option = Default::default();
    }
}

impl OptionInsert for VecMessageEncoder {
    fn insert_option_with_bytes(&mut self, key: OptionNumber, value: &[u8]) -> Result<(), Error> {
        let option_start = self.option_start;
        let old_len = self.buffer.len() - option_start;

        // Reserve the worst-case encoded size up front so `insert_option`
        // always has room to work with.
        let reserve = calc_option_size(OptionNumber(0), key, value.len());
        self.buffer.resize(self.buffer.len() + reserve, 0);

        let (len, last_option) = insert_option(
            &mut self.buffer[option_start..],
            old_len,
            self.last_option,
            key,
            value,
        )?;

        self.buffer.truncate(option_start + len);
        self.last_option = last_option;
        self.payload_start = self.buffer.len();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_has_no_marker() {
        let mut encoder = VecMessageEncoder::new();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        encoder.set_msg_id(0x1234);
        encoder.set_msg_token(MsgToken::EMPTY);
        encoder.append_payload_bytes(&[]).unwrap();

        assert_eq!(&[0x40, 0x01, 0x12, 0x34], encoder.as_bytes());
    }

    #[test]
    fn token_and_options_and_payload() {
        let mut encoder = VecMessageEncoder::new();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodPut);
        encoder.set_msg_id(0x0001);
        encoder.set_msg_token(MsgToken::from(0xC0DEu32));
        encoder
            .insert_option_str(OptionNumber::URI_PATH, "blocks")
            .unwrap();
        encoder
            .insert_option_uint(OptionNumber::CONTENT_FORMAT, 0)
            .unwrap();
        encoder.append_payload_bytes(b"hi").unwrap();

        let msg = OwnedImmutableMessage::new(encoder.into()).unwrap();
        assert_eq!(MsgType::Con, msg.msg_type());
        assert_eq!(MsgCode::MethodPut, msg.msg_code());
        assert_eq!(1, msg.msg_id());
        assert_eq!(2, msg.msg_token().len());
        assert_eq!(Some(ContentFormat(0)), msg.content_format());
        assert_eq!(b"hi", msg.payload());
    }

    #[test]
    fn stack_buffer_encoder_overflow() {
        let mut buffer = [0u8; 12];
        let mut encoder = BufferMessageEncoder::new(&mut buffer);
        encoder.set_msg_type(MsgType::Ack);
        encoder.set_msg_code(MsgCode::Empty);
        encoder.set_msg_id(0xBEEF);

        assert_eq!(
            Err(Error::OutOfSpace),
            encoder.append_payload_bytes(&[0u8; 64])
        );
    }
}

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

//! Types related to parsing and encoding CoAP messages.

use super::*;

/// Type for representing a CoAP message id.
pub type MsgId = u16;

mod read;
pub use read::AckMessage;
pub use read::MessageRead;
pub use read::ResetMessage;

mod write;
pub use write::MessageWrite;

mod msg_code;
pub use msg_code::MsgCode;
pub use msg_code::MsgCodeClass;

mod msg_type;
pub use msg_type::MsgType;

mod display;
pub use display::CoapByteDisplayFormatter;

mod encoder;
pub use encoder::BufferMessageEncoder;
pub use encoder::VecMessageEncoder;

mod parser;
pub use parser::OwnedImmutableMessage;

mod token;
pub use token::*;

pub mod codec;

/// The CoAP protocol version this crate speaks. The codec rejects
/// datagrams carrying any other version.
pub const COAP_MSG_VERSION: u8 = 1;

/// The largest option value that can be expressed by the delta/length
/// encoding of RFC 7252 §3.1 (269 + 0xFFFF).
pub const MAX_OPTION_VALUE_SIZE: usize = 65804;

pub(crate) const COAP_MSG_VER_MASK: u8 = 0b11000000;
pub(crate) const COAP_MSG_VER_OFFS: u8 = 6;
pub(crate) const COAP_MSG_T_MASK: u8 = 0b00110000;
pub(crate) const COAP_MSG_T_OFFS: u8 = 4;
pub(crate) const COAP_MSG_TKL_MASK: u8 = 0b00001111;

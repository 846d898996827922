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

use std::fmt::{Debug, Display, Formatter};

/// Type for errors encountered while encoding, sending, or receiving CoAP
/// messages.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum Error {
    /// One or more of the supplied arguments are not valid for the given operation.
    InvalidArgument,

    /// There is not enough space in the given buffer to complete the operation.
    OutOfSpace,

    /// An error was encountered while attempting to parse the data.
    ParseFailure,

    /// The [message code](crate::message::MsgCode) was not recognized.
    UnknownMessageCode,

    /// The response carried an option that does not match the shape of the
    /// request, such as a Block1 option on a non-block-wise request.
    UnexpectedOption,

    /// The peer violated the protocol, such as renegotiating to a block size
    /// the client cannot accept.
    ProtocolViolation,

    /// A confirmable message exhausted its retransmission budget without
    /// being acknowledged.
    TransactionTimeout,

    /// The exchange exceeded its configured lifetime without completing.
    ExchangeTimeout,

    /// The transaction was reset by the peer.
    Reset,

    /// An I/O error occurred while performing this operation.
    IOError,

    /// This operation has been cancelled.
    Cancelled,

    /// An unspecified error has occurred.
    Unspecified,
}

impl std::convert::From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::IOError
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        <Self as Debug>::fmt(self, f)
    }
}

impl Default for Error {
    fn default() -> Self {
        Error::Unspecified
    }
}

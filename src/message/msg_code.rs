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

/// Enum representing the *class* of a CoAP message code.
#[derive(Debug, Copy, Eq, PartialEq, Clone)]
pub enum MsgCodeClass {
    /// Class for methods
    Method = 0,

    /// Class for successful responses
    Success = 2,

    /// Class for client error responses
    ClientError = 4,

    /// Class for server error responses
    ServerError = 5,
}

impl MsgCodeClass {
    /// Tries to calculate the message code class from the given message code.
    pub fn try_from(x: u8) -> Option<MsgCodeClass> {
        match x {
            0 => Some(MsgCodeClass::Method),
            2 => Some(MsgCodeClass::Success),
            4 => Some(MsgCodeClass::ClientError),
            5 => Some(MsgCodeClass::ServerError),
            _ => None,
        }
    }

    /// Returns true if the given message code is in this message code class.
    pub fn contains(self, code: MsgCode) -> bool {
        let code_u8 = code as u8;

        code_u8 != 0 && (code_u8 >> 5) == self as u8
    }
}

/// Helper function
const fn calc_code(class: u8, detail: u8) -> isize {
    (((class & 0x7) << 5) + detail) as isize
}

/// Enum representing a CoAP message code.
#[derive(Debug, Copy, Eq, PartialEq, Clone)]
pub enum MsgCode {
    /// Empty message code. Only used for ping requests, resets, and empty acknowledgements.
    Empty = 0x00,

    /// CoAP GET method.
    MethodGet = calc_code(0, 1),

    /// CoAP POST method.
    MethodPost = calc_code(0, 2),

    /// CoAP PUT method.
    MethodPut = calc_code(0, 3),

    /// CoAP DELETE method.
    MethodDelete = calc_code(0, 4),

    /// CoAP CREATED success code (2.01).
    SuccessCreated = calc_code(2, 1),

    /// CoAP DELETED success code (2.02).
    SuccessDeleted = calc_code(2, 2),

    /// CoAP VALID success code (2.03).
    SuccessValid = calc_code(2, 3),

    /// CoAP CHANGED success code (2.04).
    SuccessChanged = calc_code(2, 4),

    /// CoAP CONTENT success code (2.05).
    SuccessContent = calc_code(2, 5),

    /// CoAP CONTINUE success code (2.31).
    SuccessContinue = calc_code(2, 31),

    /// CoAP BAD_REQUEST client error (4.00).
    ClientErrorBadRequest = calc_code(4, 0),

    /// CoAP UNAUTHORIZED client error (4.01).
    ClientErrorUnauthorized = calc_code(4, 1),

    /// CoAP BAD_OPTION client error (4.02).
    ClientErrorBadOption = calc_code(4, 2),

    /// CoAP FORBIDDEN client error (4.03).
    ClientErrorForbidden = calc_code(4, 3),

    /// CoAP NOT_FOUND client error (4.04).
    ClientErrorNotFound = calc_code(4, 4),

    /// CoAP METHOD_NOT_ALLOWED client error (4.05).
    ClientErrorMethodNotAllowed = calc_code(4, 5),

    /// CoAP NOT_ACCEPTABLE client error (4.06).
    ClientErrorNotAcceptable = calc_code(4, 6),

    /// CoAP REQUEST_ENTITY_INCOMPLETE client error (4.08).
    ClientErrorRequestEntityIncomplete = calc_code(4, 8),

    /// CoAP PRECONDITION_FAILED client error (4.12).
    ClientErrorPreconditionFailed = calc_code(4, 12),

    /// CoAP REQUEST_ENTITY_TOO_LARGE client error (4.13).
    ClientErrorRequestEntityTooLarge = calc_code(4, 13),

    /// CoAP UNSUPPORTED_CONTENT_FORMAT client error (4.15).
    ClientErrorUnsupportedContentFormat = calc_code(4, 15),

    /// CoAP INTERNAL_SERVER_ERROR server error (5.00).
    ServerErrorInternalServerError = calc_code(5, 0),

    /// CoAP NOT_IMPLEMENTED server error (5.01).
    ServerErrorNotImplemented = calc_code(5, 1),

    /// CoAP BAD_GATEWAY server error (5.02).
    ServerErrorBadGateway = calc_code(5, 2),

    /// CoAP SERVICE_UNAVAILABLE server error (5.03).
    ServerErrorServiceUnavailable = calc_code(5, 3),

    /// CoAP GATEWAY_TIMEOUT server error (5.04).
    ServerErrorGatewayTimeout = calc_code(5, 4),

    /// CoAP PROXYING_NOT_SUPPORTED server error (5.05).
    ServerErrorProxyingNotSupported = calc_code(5, 5),
}

impl MsgCode {
    /// Tries to convert the given `u8` into a `MsgCode`. If the value isn't recognized,
    /// this method returns `None`.
    pub fn try_from(x: u8) -> Option<MsgCode> {
        use MsgCode::*;
        match x as isize {
            0x00 => Some(Empty),

            x if x == calc_code(0, 1) => Some(MethodGet),
            x if x == calc_code(0, 2) => Some(MethodPost),
            x if x == calc_code(0, 3) => Some(MethodPut),
            x if x == calc_code(0, 4) => Some(MethodDelete),

            x if x == calc_code(2, 1) => Some(SuccessCreated),
            x if x == calc_code(2, 2) => Some(SuccessDeleted),
            x if x == calc_code(2, 3) => Some(SuccessValid),
            x if x == calc_code(2, 4) => Some(SuccessChanged),
            x if x == calc_code(2, 5) => Some(SuccessContent),
            x if x == calc_code(2, 31) => Some(SuccessContinue),

            x if x == calc_code(4, 0) => Some(ClientErrorBadRequest),
            x if x == calc_code(4, 1) => Some(ClientErrorUnauthorized),
            x if x == calc_code(4, 2) => Some(ClientErrorBadOption),
            x if x == calc_code(4, 3) => Some(ClientErrorForbidden),
            x if x == calc_code(4, 4) => Some(ClientErrorNotFound),
            x if x == calc_code(4, 5) => Some(ClientErrorMethodNotAllowed),
            x if x == calc_code(4, 6) => Some(ClientErrorNotAcceptable),
            x if x == calc_code(4, 8) => Some(ClientErrorRequestEntityIncomplete),
            x if x == calc_code(4, 12) => Some(ClientErrorPreconditionFailed),
            x if x == calc_code(4, 13) => Some(ClientErrorRequestEntityTooLarge),
            x if x == calc_code(4, 15) => Some(ClientErrorUnsupportedContentFormat),

            x if x == calc_code(5, 0) => Some(ServerErrorInternalServerError),
            x if x == calc_code(5, 1) => Some(ServerErrorNotImplemented),
            x if x == calc_code(5, 2) => Some(ServerErrorBadGateway),
            x if x == calc_code(5, 3) => Some(ServerErrorServiceUnavailable),
            x if x == calc_code(5, 4) => Some(ServerErrorGatewayTimeout),
            x if x == calc_code(5, 5) => Some(ServerErrorProxyingNotSupported),

            _ => None,
        }
    }

    /// The class of this message code.
    pub fn class(self) -> MsgCodeClass {
        MsgCodeClass::try_from(self as u8 >> 5).expect("Malformed message code")
    }

    /// Returns true if this code is the empty code (0.00).
    pub fn is_empty(self) -> bool {
        self == MsgCode::Empty
    }

    /// Returns true if this code is a method code (0.xx, excluding 0.00).
    pub fn is_method(self) -> bool {
        MsgCodeClass::Method.contains(self)
    }

    /// Returns true if this code is a successful response code (2.xx).
    pub fn is_success(self) -> bool {
        MsgCodeClass::Success.contains(self)
    }

    /// Returns true if this code is a client error (4.xx).
    pub fn is_client_error(self) -> bool {
        MsgCodeClass::ClientError.contains(self)
    }

    /// Returns true if this code is a server error (5.xx).
    pub fn is_server_error(self) -> bool {
        MsgCodeClass::ServerError.contains(self)
    }

    /// Returns true if this code is any kind of response code (2.xx, 4.xx, 5.xx).
    pub fn is_response(self) -> bool {
        self.is_success() || self.is_client_error() || self.is_server_error()
    }
}

impl Default for MsgCode {
    fn default() -> Self {
        MsgCode::Empty
    }
}

impl std::fmt::Display for MsgCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let x = *self as u8;
        write!(f, "{}.{:02}", x >> 5, x & 0x1F)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        assert_eq!(0b00000011, MsgCode::MethodPut as u8);
        assert_eq!(0b00000010, MsgCode::MethodPost as u8);
        assert_eq!(0x41, MsgCode::SuccessCreated as u8);
        assert_eq!(0x44, MsgCode::SuccessChanged as u8);
    }

    #[test]
    fn classification() {
        assert!(MsgCode::MethodPut.is_method());
        assert!(!MsgCode::MethodPut.is_response());
        assert!(MsgCode::SuccessChanged.is_response());
        assert!(MsgCode::SuccessChanged.is_success());
        assert!(MsgCode::ClientErrorNotFound.is_response());
        assert!(MsgCode::Empty.is_empty());
        assert!(!MsgCode::Empty.is_method());
    }

    #[test]
    fn round_trip() {
        for x in 0..=255u8 {
            if let Some(code) = MsgCode::try_from(x) {
                assert_eq!(x, code as u8);
            }
        }
    }

    #[test]
    fn display() {
        assert_eq!("0.03", format!("{}", MsgCode::MethodPut));
        assert_eq!("2.04", format!("{}", MsgCode::SuccessChanged));
        assert_eq!("4.13", format!("{}", MsgCode::ClientErrorRequestEntityTooLarge));
    }
}

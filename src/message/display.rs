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

/// Helper for rendering raw CoAP datagrams as hex in log messages.
#[derive(Debug, Copy, Clone)]
pub struct CoapByteDisplayFormatter<'a>(pub &'a [u8]);

impl<'a> std::fmt::Display for CoapByteDisplayFormatter<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.len())?;
        for byte in self.0 {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}

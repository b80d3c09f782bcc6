// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Line-delimited JSON method calls exchanged with the controlling app.
//!
//! One request per line:
//! `{"id": 1, "method": "connectToDevice", "args": {"address": "..."}}`.
//! One response per line, carrying either `result` or `error`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

/// Error code for an unknown method.
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// Error code for a line that is not a valid request.
pub const BAD_REQUEST: &str = "BAD_REQUEST";

/// A bridge operation requested by the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodCall {
    ScanForDevices,
    ConnectToDevice {
        address: Option<String>,
        name: Option<String>,
    },
    SendMessage {
        message: String,
    },
    ReadMessage,
    Disconnect,
    GetStatus,
}

impl MethodCall {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::ScanForDevices => "scanForDevices",
            Self::ConnectToDevice { .. } => "connectToDevice",
            Self::SendMessage { .. } => "sendMessage",
            Self::ReadMessage => "readMessage",
            Self::Disconnect => "disconnect",
            Self::GetStatus => "getStatus",
        }
    }
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(default)]
    id: u64,
    method: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
struct ConnectArgs {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct SendArgs {
    message: String,
}

/// Parse one request line.
///
/// On failure returns the response to send back instead.
pub fn parse_request(line: &str) -> std::result::Result<(u64, MethodCall), Response> {
    let raw: RawRequest = serde_json::from_str(line)
        .map_err(|e| Response::error(0, BAD_REQUEST, format!("Malformed request: {}", e)))?;
    let id = raw.id;

    let args = if raw.args.is_null() {
        Value::Object(Default::default())
    } else {
        raw.args
    };
    let bad_args = |e: serde_json::Error| {
        Response::error(id, BAD_REQUEST, format!("Invalid arguments: {}", e))
    };

    let call = match raw.method.as_str() {
        "scanForDevices" => MethodCall::ScanForDevices,
        "connectToDevice" => {
            let args: ConnectArgs = serde_json::from_value(args).map_err(bad_args)?;
            MethodCall::ConnectToDevice {
                address: args.address,
                name: args.name,
            }
        }
        "sendMessage" => {
            let args: SendArgs = serde_json::from_value(args).map_err(bad_args)?;
            MethodCall::SendMessage {
                message: args.message,
            }
        }
        "readMessage" => MethodCall::ReadMessage,
        "disconnect" => MethodCall::Disconnect,
        "getStatus" => MethodCall::GetStatus,
        other => {
            return Err(Response::error(
                id,
                NOT_IMPLEMENTED,
                format!("Unknown method: {}", other),
            ))
        }
    };

    Ok((id, call))
}

/// Error payload of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Response to a single request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(id: u64, value: Value) -> Self {
        Self {
            id,
            result: Some(value),
            error: None,
        }
    }

    pub fn error(id: u64, code: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn from_error(id: u64, err: &BridgeError) -> Self {
        Self::error(id, err.code(), err.to_string())
    }

    /// Serialize to a newline-terminated JSON line.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

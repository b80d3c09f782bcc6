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

//! Errors surfaced to callers of the bridge.

use thiserror::Error;

/// Failure kinds reported by bridge operations.
///
/// Read failures are intentionally absent: a failed read is reported as
/// "no message available".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No Bluetooth radio exists on this host.
    #[error("Bluetooth not supported")]
    AdapterUnavailable,
    /// The radio exists but is powered off.
    #[error("Bluetooth not enabled")]
    AdapterDisabled,
    /// The address was empty or could not be resolved to a device.
    #[error("invalid device address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    /// Resolution, socket creation or the RFCOMM handshake failed.
    #[error("Failed to connect: {reason}")]
    ConnectionFailed { reason: String },
    /// A connection is already open; disconnect first.
    #[error("already connected to {address}")]
    AlreadyConnected { address: String },
    /// No connection is open.
    #[error("Not connected")]
    NotConnected,
    /// The transport rejected the outgoing bytes.
    #[error("Failed to send: {reason}")]
    SendFailed { reason: String },
    /// At least one resource failed to close. State is Disconnected regardless.
    #[error("Failed to disconnect: {reason}")]
    DisconnectFailed { reason: String },
}

impl BridgeError {
    /// Error code used on the method-call protocol.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AdapterUnavailable | Self::AdapterDisabled => "BLUETOOTH_ERROR",
            Self::InvalidAddress { .. }
            | Self::ConnectionFailed { .. }
            | Self::AlreadyConnected { .. } => "CONNECTION_ERROR",
            Self::NotConnected | Self::SendFailed { .. } => "SEND_ERROR",
            Self::DisconnectFailed { .. } => "DISCONNECT_ERROR",
        }
    }

    /// Build a `ConnectionFailed` from any error, keeping its full cause chain.
    pub fn connection_failed(err: impl std::fmt::Display) -> Self {
        Self::ConnectionFailed {
            reason: err.to_string(),
        }
    }
}

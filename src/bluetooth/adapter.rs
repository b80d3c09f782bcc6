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

//! Local adapter access and the platform seam.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use crate::error::BridgeError;

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Name reported for devices that never told us theirs.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// A remote device known to the local adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    pub address: String,
    pub name: Option<String>,
}

impl Device {
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
        }
    }

    /// Name to show the caller, falling back to "Unknown".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_DEVICE_NAME)
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: self.display_name().to_string(),
            address: self.address.clone(),
        }
    }
}

/// Device entry as returned by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub address: String,
}

/// Closes the socket underneath a pair of stream halves.
#[async_trait]
pub trait SocketHandle: Send {
    async fn close(&mut self) -> io::Result<()>;
}

/// The resources held open by one RFCOMM link.
pub struct Endpoints {
    pub input: Box<dyn AsyncRead + Send + Unpin>,
    pub output: Box<dyn AsyncWrite + Send + Unpin>,
    pub socket: Box<dyn SocketHandle>,
}

/// Access to the platform Bluetooth stack.
#[async_trait]
pub trait Radio: Send + Sync + 'static {
    /// Platform handle for a resolved remote device.
    type Remote: Send + Sync;

    /// Whether a Bluetooth radio exists.
    async fn is_present(&self) -> bool;

    /// Whether the radio is powered on.
    async fn is_powered(&self) -> bool;

    /// Devices bonded at the platform level, in platform order.
    async fn bonded_devices(&self) -> Result<Vec<Device>>;

    /// Resolve an address into a device handle.
    async fn remote_device(&self, address: &str) -> Result<Self::Remote>;

    /// Stop any discovery in progress on the adapter.
    async fn cancel_discovery(&self) -> Result<()>;

    /// Open a reliable channel to the given service on the device.
    async fn open_rfcomm(&self, device: &Self::Remote, service: Uuid) -> Result<Endpoints>;
}

/// Shared handle to the local radio.
///
/// Created once at startup and cloned into every component that needs it.
pub struct AdapterGateway<R: Radio> {
    radio: Arc<R>,
}

impl<R: Radio> Clone for AdapterGateway<R> {
    fn clone(&self) -> Self {
        Self {
            radio: Arc::clone(&self.radio),
        }
    }
}

impl<R: Radio> AdapterGateway<R> {
    pub fn new(radio: R) -> Self {
        Self {
            radio: Arc::new(radio),
        }
    }

    pub async fn is_available(&self) -> bool {
        self.radio.is_present().await
    }

    pub async fn is_enabled(&self) -> bool {
        self.radio.is_present().await && self.radio.is_powered().await
    }

    /// Check both preconditions, reporting which one failed.
    pub async fn ensure_ready(&self) -> Result<(), BridgeError> {
        if !self.is_available().await {
            return Err(BridgeError::AdapterUnavailable);
        }
        if !self.radio.is_powered().await {
            return Err(BridgeError::AdapterDisabled);
        }
        Ok(())
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }
}

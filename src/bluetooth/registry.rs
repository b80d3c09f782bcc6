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

//! Paired device enumeration.

use tracing::{debug, warn};

use super::adapter::{AdapterGateway, Device, Radio};
use crate::error::BridgeError;

/// Lists devices already bonded with the local adapter.
///
/// This is a snapshot of the platform's bond list, not a radio scan.
pub struct DeviceRegistry<R: Radio> {
    gateway: AdapterGateway<R>,
}

impl<R: Radio> DeviceRegistry<R> {
    pub fn new(gateway: AdapterGateway<R>) -> Self {
        Self { gateway }
    }

    /// Get paired devices.
    pub async fn list_paired_devices(&self) -> Result<Vec<Device>, BridgeError> {
        self.gateway.ensure_ready().await?;

        let devices = self.gateway.radio().bonded_devices().await.map_err(|e| {
            // The adapter vanished between the readiness check and the query.
            warn!("Failed to enumerate bonded devices: {:#}", e);
            BridgeError::AdapterUnavailable
        })?;

        debug!("Found {} paired device(s)", devices.len());
        Ok(devices)
    }
}

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

//! Caller-facing bridge operations.

pub mod protocol;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bluetooth::{
    AdapterGateway, ConnectionManager, ConnectionSettings, ConnectionState, DeviceInfo,
    DeviceRegistry, Radio,
};
use crate::error::BridgeError;
use protocol::{MethodCall, Response};

/// Connection snapshot reported by `getStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStatus {
    pub state: ConnectionState,
    pub address: Option<String>,
    pub service: Option<String>,
}

impl BridgeStatus {
    fn to_json(&self) -> Value {
        json!({
            "state": self.state.as_str(),
            "address": self.address,
            "service": self.service,
        })
    }
}

/// Dispatches the bridge operations onto the Bluetooth components.
///
/// All connection operations go through one mutex, so connect, send, read
/// and disconnect never run concurrently.
pub struct BridgeController<R: Radio> {
    registry: DeviceRegistry<R>,
    manager: Mutex<ConnectionManager<R>>,
}

impl<R: Radio> BridgeController<R> {
    pub fn new(gateway: AdapterGateway<R>, settings: ConnectionSettings) -> Self {
        Self {
            registry: DeviceRegistry::new(gateway.clone()),
            manager: Mutex::new(ConnectionManager::new(gateway, settings)),
        }
    }

    /// List paired devices.
    pub async fn scan(&self) -> Result<Vec<DeviceInfo>, BridgeError> {
        let devices = self.registry.list_paired_devices().await?;
        Ok(devices.iter().map(|d| d.info()).collect())
    }

    /// Connect to a device. `name` is only used for logging.
    pub async fn connect(&self, address: &str, name: Option<&str>) -> Result<(), BridgeError> {
        if let Some(name) = name {
            info!("Connect requested for '{}' ({})", name, address);
        }
        self.manager.lock().await.connect(address).await
    }

    /// Send a text message.
    pub async fn send(&self, message: &str) -> Result<(), BridgeError> {
        self.manager.lock().await.send(message).await
    }

    /// Poll for an inbound message.
    pub async fn read(&self) -> Option<String> {
        self.manager.lock().await.read().await
    }

    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        self.manager.lock().await.disconnect().await
    }

    pub async fn state(&self) -> ConnectionState {
        self.manager.lock().await.state()
    }

    /// Address of the connected device, if any.
    pub async fn connected_address(&self) -> Option<String> {
        let manager = self.manager.lock().await;
        manager.connection().map(|conn| conn.address().to_string())
    }

    /// Snapshot of the connection for status queries.
    pub async fn status(&self) -> BridgeStatus {
        let manager = self.manager.lock().await;
        let conn = manager.connection();
        BridgeStatus {
            state: manager.state(),
            address: conn.map(|c| c.address().to_string()),
            service: conn.map(|c| c.service().to_string()),
        }
    }

    /// Execute one protocol request and build its response.
    pub async fn handle(&self, id: u64, call: MethodCall) -> Response {
        debug!("Handling {}", call.method_name());

        let result = match call {
            MethodCall::ScanForDevices => self.scan().await.map(|devices| {
                devices
                    .into_iter()
                    .map(|d| json!({ "name": d.name, "address": d.address }))
                    .collect::<Value>()
            }),
            MethodCall::ConnectToDevice { address, name } => match address {
                Some(address) => self
                    .connect(&address, name.as_deref())
                    .await
                    .map(|()| Value::Bool(true)),
                None => Err(BridgeError::InvalidAddress {
                    address: String::new(),
                    reason: "Device address is null".to_string(),
                }),
            },
            MethodCall::SendMessage { message } => {
                self.send(&message).await.map(|()| Value::Bool(true))
            }
            MethodCall::ReadMessage => Ok(self.read().await.map_or(Value::Null, Value::String)),
            MethodCall::Disconnect => self.disconnect().await.map(|()| Value::Bool(true)),
            MethodCall::GetStatus => Ok(self.status().await.to_json()),
        };

        match result {
            Ok(value) => Response::success(id, value),
            Err(e) => Response::from_error(id, &e),
        }
    }
}

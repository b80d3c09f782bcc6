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

//! Bluetooth communication module.
//!
//! Handles the RFCOMM client link to the embedded peer.

mod adapter;
mod bluez;
mod channel;
mod connection;
mod registry;

pub use adapter::{
    AdapterGateway, Device, DeviceInfo, Endpoints, Radio, SocketHandle, SPP_UUID,
    UNKNOWN_DEVICE_NAME,
};
pub use bluez::BluezRadio;
pub use channel::{SerialChannel, DEFAULT_READ_BUFFER_SIZE};
pub use connection::{
    Connection, ConnectionManager, ConnectionSettings, ConnectionState, DEFAULT_READ_TIMEOUT,
};
pub use registry::DeviceRegistry;

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

//! BlueZ implementation of [`Radio`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bluer::rfcomm::{Profile, ProfileHandle, Role, SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use std::io;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::adapter::{Device, Endpoints, Radio, SocketHandle};

/// Radio backed by the system BlueZ daemon.
pub struct BluezRadio {
    // Kept for profile registration and to hold the D-Bus connection open.
    session: Option<Session>,
    adapter: Option<Adapter>,
    channel: Option<u8>,
}

impl BluezRadio {
    /// Open a BlueZ session and pick an adapter.
    ///
    /// Never fails: if there is no daemon or no adapter, the radio reports
    /// itself as absent.
    pub async fn open(adapter_name: Option<&str>, channel: Option<u8>) -> Self {
        let session = match Session::new().await {
            Ok(session) => session,
            Err(e) => {
                warn!("BlueZ session unavailable: {}", e);
                return Self {
                    session: None,
                    adapter: None,
                    channel,
                };
            }
        };
        debug!("BlueZ session created");

        let adapter = match adapter_name {
            Some(name) => session.adapter(name),
            None => session.default_adapter().await,
        };
        let adapter = match adapter {
            Ok(adapter) => {
                info!("Using Bluetooth adapter: {}", adapter.name());
                Some(adapter)
            }
            Err(e) => {
                warn!("No Bluetooth adapter: {}", e);
                None
            }
        };

        if let Some(channel) = channel {
            info!("Using fixed RFCOMM channel {}", channel);
        }

        Self {
            session: Some(session),
            adapter,
            channel,
        }
    }

    fn adapter(&self) -> Result<&Adapter> {
        self.adapter
            .as_ref()
            .ok_or_else(|| anyhow!("Bluetooth adapter not available"))
    }

    /// Connect through a client-role profile so BlueZ resolves the
    /// service UUID to an RFCOMM channel via SDP.
    async fn connect_profile(
        &self,
        device: &bluer::Device,
        service: Uuid,
    ) -> Result<(Stream, ProfileHandle)> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| anyhow!("BlueZ session not available"))?;

        let profile = Profile {
            uuid: service,
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };
        let mut handle = session
            .register_profile(profile)
            .await
            .context("registering SPP client profile")?;
        debug!("Registered client profile {}", service);

        let target = device.address();
        let connect = async {
            device
                .connect_profile(&service)
                .await
                .context("connect handshake failed")
        };
        let accept = async {
            while let Some(req) = handle.next().await {
                if req.device() != target {
                    debug!("Ignoring profile connection from {}", req.device());
                    continue;
                }
                return req.accept().context("accepting RFCOMM stream");
            }
            Err(anyhow!("profile closed before the link was established"))
        };

        let ((), stream) = tokio::try_join!(connect, accept)?;
        Ok((stream, handle))
    }
}

#[async_trait]
impl Radio for BluezRadio {
    type Remote = bluer::Device;

    async fn is_present(&self) -> bool {
        match self.adapter {
            // A removed adapter fails every property query.
            Some(ref adapter) => adapter.address().await.is_ok(),
            None => false,
        }
    }

    async fn is_powered(&self) -> bool {
        match self.adapter {
            Some(ref adapter) => adapter.is_powered().await.unwrap_or(false),
            None => false,
        }
    }

    async fn bonded_devices(&self) -> Result<Vec<Device>> {
        let adapter = self.adapter()?;
        let mut devices = Vec::new();

        for addr in adapter.device_addresses().await? {
            let device = adapter.device(addr)?;
            if device.is_paired().await? {
                let name = device.name().await.unwrap_or(None);
                devices.push(Device::new(addr.to_string(), name));
            }
        }

        Ok(devices)
    }

    async fn remote_device(&self, address: &str) -> Result<bluer::Device> {
        let addr: Address = address
            .parse()
            .map_err(|_| anyhow!("not a Bluetooth address"))?;
        Ok(self.adapter()?.device(addr)?)
    }

    async fn cancel_discovery(&self) -> Result<()> {
        // BlueZ only lets a client stop discovery it started itself, and
        // this bridge never starts one.
        if self.adapter()?.is_discovering().await? {
            warn!("Adapter is discovering on behalf of another client; connect may be slow");
        }
        Ok(())
    }

    async fn open_rfcomm(&self, device: &bluer::Device, service: Uuid) -> Result<Endpoints> {
        let (stream, profile) = match self.channel {
            Some(channel) => {
                let addr = SocketAddr::new(device.address(), channel);
                let stream = Stream::connect(addr)
                    .await
                    .with_context(|| format!("RFCOMM connect on channel {}", channel))?;
                (stream, None)
            }
            None => {
                let (stream, handle) = self.connect_profile(device, service).await?;
                (stream, Some(handle))
            }
        };

        let (input, output) = stream.into_split();
        Ok(Endpoints {
            input: Box::new(input),
            output: Box::new(output),
            socket: Box::new(BluezSocket { profile }),
        })
    }
}

/// Holds the profile registration for the life of the link.
struct BluezSocket {
    profile: Option<ProfileHandle>,
}

#[async_trait]
impl SocketHandle for BluezSocket {
    async fn close(&mut self) -> io::Result<()> {
        // The kernel socket closes when the last stream half drops.
        if self.profile.take().is_some() {
            debug!("Unregistered SPP client profile");
        }
        Ok(())
    }
}

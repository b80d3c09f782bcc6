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

//! Connection lifecycle: connect, hold and release a single RFCOMM link.

use anyhow::anyhow;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::adapter::{AdapterGateway, Endpoints, Radio, SocketHandle, SPP_UUID};
use super::channel::{SerialChannel, DEFAULT_READ_BUFFER_SIZE};
use crate::error::BridgeError;

/// Default bound on a single read poll.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// State of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link. Initial state, re-entered after every teardown.
    Disconnected,
    /// Only held while a connect call is in progress.
    Connecting,
    /// Stream endpoints acquired.
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

/// Tunables for establishing and using a connection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Bytes decoded per read.
    pub read_buffer_size: usize,
    /// Upper bound on the connect handshake.
    pub connect_timeout: Duration,
    /// Upper bound on a single read. `None` waits for data or EOF and holds
    /// the connection for that long.
    pub read_timeout: Option<Duration>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            connect_timeout: Duration::from_secs(15),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }
}

/// One open RFCOMM session and every resource it holds.
pub struct Connection {
    address: String,
    service: Uuid,
    channel: SerialChannel,
    socket: Box<dyn SocketHandle>,
}

impl Connection {
    fn new(
        address: String,
        service: Uuid,
        endpoints: Endpoints,
        settings: &ConnectionSettings,
    ) -> Self {
        let Endpoints {
            input,
            output,
            socket,
        } = endpoints;
        Self {
            address,
            service,
            channel: SerialChannel::new(
                input,
                output,
                settings.read_buffer_size,
                settings.read_timeout,
            ),
            socket,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Service UUID the link was opened for.
    pub fn service(&self) -> Uuid {
        self.service
    }

    /// Close input, output and socket.
    ///
    /// Every close is attempted even if an earlier one failed. Failures are
    /// collected into a single `DisconnectFailed`.
    async fn release(self) -> Result<(), BridgeError> {
        let Connection {
            address,
            service,
            channel,
            mut socket,
        } = self;
        let (input, mut output) = channel.into_parts();
        let mut failures = Vec::new();

        if let Err(e) = output.shutdown().await {
            failures.push(format!("output stream: {}", e));
        }
        drop(output);
        drop(input);
        if let Err(e) = socket.close().await {
            failures.push(format!("socket: {}", e));
        }

        if failures.is_empty() {
            info!("Released {} connection to {}", service, address);
            Ok(())
        } else {
            let reason = failures.join("; ");
            warn!("Connection to {} released with errors: {}", address, reason);
            Err(BridgeError::DisconnectFailed { reason })
        }
    }
}

/// Owns the single active connection and its state transitions.
///
/// Methods take `&mut self`; callers sharing a manager must wrap it in a
/// mutex so connect and disconnect never overlap.
pub struct ConnectionManager<R: Radio> {
    gateway: AdapterGateway<R>,
    settings: ConnectionSettings,
    state: ConnectionState,
    active: Option<Connection>,
}

impl<R: Radio> ConnectionManager<R> {
    pub fn new(gateway: AdapterGateway<R>, settings: ConnectionSettings) -> Self {
        Self {
            gateway,
            settings,
            state: ConnectionState::Disconnected,
            active: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The connection currently held, if any.
    pub fn connection(&self) -> Option<&Connection> {
        self.active.as_ref()
    }

    /// Open an SPP link to `address`.
    ///
    /// Fails with `AlreadyConnected` while a link is held; the existing link is
    /// left untouched.
    pub async fn connect(&mut self, address: &str) -> Result<(), BridgeError> {
        if let Some(ref conn) = self.active {
            warn!(
                "Connect to {} rejected: already connected to {}",
                address, conn.address
            );
            return Err(BridgeError::AlreadyConnected {
                address: conn.address.clone(),
            });
        }

        let address = address.trim();
        if address.is_empty() {
            return Err(BridgeError::InvalidAddress {
                address: String::new(),
                reason: "Device address is empty".to_string(),
            });
        }

        self.gateway
            .ensure_ready()
            .await
            .map_err(BridgeError::connection_failed)?;

        info!("Connecting to {}...", address);
        self.state = ConnectionState::Connecting;

        let limit = self.settings.connect_timeout;
        let attempt = tokio::time::timeout(limit, self.establish(address)).await;
        let endpoints = match attempt {
            Ok(Ok(endpoints)) => endpoints,
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                warn!("Connection to {} failed: {}", address, e);
                return Err(e);
            }
            Err(_) => {
                // Dropping the timed-out future released whatever it had opened.
                self.state = ConnectionState::Disconnected;
                warn!("Connection to {} timed out", address);
                return Err(BridgeError::connection_failed(anyhow!(
                    "timed out after {:?}",
                    limit
                )));
            }
        };

        self.active = Some(Connection::new(
            address.to_string(),
            SPP_UUID,
            endpoints,
            &self.settings,
        ));
        self.state = ConnectionState::Connected;
        info!("Connected to {} (service {})", address, SPP_UUID);
        Ok(())
    }

    async fn establish(&self, address: &str) -> Result<Endpoints, BridgeError> {
        let radio = self.gateway.radio();

        let device = radio
            .remote_device(address)
            .await
            .map_err(|e| BridgeError::InvalidAddress {
                address: address.to_string(),
                reason: format!("{:#}", e),
            })?;

        // Discovery and connection setup compete for the radio.
        if let Err(e) = radio.cancel_discovery().await {
            warn!("Failed to cancel discovery: {:#}", e);
        }

        radio
            .open_rfcomm(&device, SPP_UUID)
            .await
            .map_err(|e| BridgeError::connection_failed(format!("{:#}", e)))
    }

    /// Send UTF-8 text to the peer.
    ///
    /// A transport failure drops the connection; the caller must reconnect.
    pub async fn send(&mut self, message: &str) -> Result<(), BridgeError> {
        let conn = self.active.as_mut().ok_or(BridgeError::NotConnected)?;
        let Err(e) = conn.channel.write(message.as_bytes()).await else {
            return Ok(());
        };

        let reason = e.to_string();
        if let Some(conn) = self.active.take() {
            warn!("Send to {} failed, dropping connection: {}", conn.address, reason);
            if let Err(release_err) = conn.release().await {
                debug!("Ignoring teardown error after send failure: {}", release_err);
            }
        }
        self.state = ConnectionState::Disconnected;
        Err(BridgeError::SendFailed { reason })
    }

    /// Poll for inbound text. Never fails; see [`SerialChannel::try_read`].
    pub async fn read(&mut self) -> Option<String> {
        match self.active.as_mut() {
            Some(conn) => conn.channel.try_read().await,
            None => None,
        }
    }

    /// Release the connection if one is held.
    ///
    /// Succeeds trivially when already disconnected. The state is Disconnected
    /// afterwards even when some resource failed to close.
    pub async fn disconnect(&mut self) -> Result<(), BridgeError> {
        let Some(conn) = self.active.take() else {
            debug!("Disconnect requested with no active connection");
            self.state = ConnectionState::Disconnected;
            return Ok(());
        };

        info!("Disconnecting from {}...", conn.address);
        let result = conn.release().await;
        self.state = ConnectionState::Disconnected;
        result
    }
}

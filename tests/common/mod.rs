//! In-memory radio for driving the bridge without Bluetooth hardware.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{duplex, AsyncWrite, DuplexStream, WriteHalf};
use uuid::Uuid;

use spp_bridge::bluetooth::{Device, Endpoints, Radio, SocketHandle, SPP_UUID};

pub const ESP32_A: &str = "AA:BB:CC:DD:EE:01";
pub const ESP32_B: &str = "AA:BB:CC:DD:EE:02";

#[derive(Default)]
struct FakeState {
    absent: AtomicBool,
    powered_off: AtomicBool,
    bonded: Mutex<Vec<Device>>,
    reachable: Mutex<HashSet<String>>,
    peers: Mutex<Vec<DuplexStream>>,
    open_links: AtomicUsize,
    max_open_links: AtomicUsize,
    discovery_cancels: AtomicUsize,
    fail_socket_close: AtomicBool,
    fail_output_shutdown: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
}

/// Radio whose peers are the far ends of in-memory duplex pipes.
#[derive(Clone, Default)]
pub struct FakeRadio {
    state: Arc<FakeState>,
}

impl FakeRadio {
    /// Two bonded, reachable ESP32 boards.
    pub fn with_two_boards() -> Self {
        let radio = Self::default();
        radio.bond(ESP32_A, Some("ESP32-A"));
        radio.bond(ESP32_B, Some("ESP32-B"));
        radio
    }

    pub fn bond(&self, address: &str, name: Option<&str>) {
        self.state
            .bonded
            .lock()
            .unwrap()
            .push(Device::new(address, name.map(str::to_string)));
        self.state
            .reachable
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub fn set_present(&self, present: bool) {
        self.state.absent.store(!present, Ordering::SeqCst);
    }

    pub fn set_powered(&self, powered: bool) {
        self.state.powered_off.store(!powered, Ordering::SeqCst);
    }

    pub fn set_unreachable(&self, address: &str) {
        self.state.reachable.lock().unwrap().remove(address);
    }

    pub fn fail_socket_close(&self, fail: bool) {
        self.state.fail_socket_close.store(fail, Ordering::SeqCst);
    }

    pub fn fail_output_shutdown(&self, fail: bool) {
        self.state.fail_output_shutdown.store(fail, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock().unwrap() = Some(delay);
    }

    /// Far end of the most recently opened link.
    pub fn take_peer(&self) -> DuplexStream {
        self.state
            .peers
            .lock()
            .unwrap()
            .pop()
            .expect("no link was opened")
    }

    pub fn open_links(&self) -> usize {
        self.state.open_links.load(Ordering::SeqCst)
    }

    pub fn max_open_links(&self) -> usize {
        self.state.max_open_links.load(Ordering::SeqCst)
    }

    pub fn discovery_cancels(&self) -> usize {
        self.state.discovery_cancels.load(Ordering::SeqCst)
    }
}

fn is_address(address: &str) -> bool {
    let octets: Vec<&str> = address.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

#[async_trait]
impl Radio for FakeRadio {
    type Remote = String;

    async fn is_present(&self) -> bool {
        !self.state.absent.load(Ordering::SeqCst)
    }

    async fn is_powered(&self) -> bool {
        !self.state.powered_off.load(Ordering::SeqCst)
    }

    async fn bonded_devices(&self) -> Result<Vec<Device>> {
        Ok(self.state.bonded.lock().unwrap().clone())
    }

    async fn remote_device(&self, address: &str) -> Result<String> {
        if !is_address(address) {
            bail!("not a Bluetooth address");
        }
        Ok(address.to_uppercase())
    }

    async fn cancel_discovery(&self) -> Result<()> {
        self.state.discovery_cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open_rfcomm(&self, device: &String, service: Uuid) -> Result<Endpoints> {
        assert_eq!(service, SPP_UUID);

        let delay = *self.state.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if !self.state.reachable.lock().unwrap().contains(device) {
            return Err(anyhow!("host is down"));
        }

        let (local, peer) = duplex(8192);
        self.state.peers.lock().unwrap().push(peer);
        let open = self.state.open_links.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_open_links.fetch_max(open, Ordering::SeqCst);

        let (input, output) = tokio::io::split(local);
        Ok(Endpoints {
            input: Box::new(input),
            output: Box::new(FakeOutput {
                inner: output,
                state: Arc::clone(&self.state),
            }),
            socket: Box::new(FakeSocket {
                state: Arc::clone(&self.state),
            }),
        })
    }
}

struct FakeSocket {
    state: Arc<FakeState>,
}

#[async_trait]
impl SocketHandle for FakeSocket {
    async fn close(&mut self) -> io::Result<()> {
        self.state.open_links.fetch_sub(1, Ordering::SeqCst);
        if self.state.fail_socket_close.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "socket close failed"));
        }
        Ok(())
    }
}

/// Write half whose shutdown can be made to fail.
struct FakeOutput {
    inner: WriteHalf<DuplexStream>,
    state: Arc<FakeState>,
}

impl AsyncWrite for FakeOutput {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.state.fail_output_shutdown.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Other,
                "output shutdown failed",
            )));
        }
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

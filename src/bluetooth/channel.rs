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

//! Byte stream over an established RFCOMM link.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Default read buffer capacity.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Write and poll-read access to one open link.
pub struct SerialChannel {
    input: Box<dyn AsyncRead + Send + Unpin>,
    output: Box<dyn AsyncWrite + Send + Unpin>,
    buffer_size: usize,
    read_timeout: Option<Duration>,
}

impl SerialChannel {
    pub fn new(
        input: Box<dyn AsyncRead + Send + Unpin>,
        output: Box<dyn AsyncWrite + Send + Unpin>,
        buffer_size: usize,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            input,
            output,
            buffer_size: buffer_size.max(1),
            read_timeout,
        }
    }

    /// Write all bytes to the outbound stream and flush.
    pub async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.write_all(bytes).await?;
        self.output.flush().await?;
        debug!("Sent {} bytes", bytes.len());
        Ok(())
    }

    /// Read up to the buffer capacity and decode it as UTF-8 text.
    ///
    /// Returns `None` for an empty read, a timed-out read or any read error.
    /// This is the only place read errors are discarded.
    pub async fn try_read(&mut self) -> Option<String> {
        let mut buf = vec![0u8; self.buffer_size];

        let result = match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.input.read(&mut buf)).await {
                Ok(result) => result,
                Err(_) => return None,
            },
            None => self.input.read(&mut buf).await,
        };

        match result {
            Ok(0) => None,
            Ok(n) => {
                debug!("Received {} bytes", n);
                Some(String::from_utf8_lossy(&buf[..n]).into_owned())
            }
            Err(e) => {
                debug!("Read error treated as no message: {}", e);
                None
            }
        }
    }

    /// Split back into the two stream halves for teardown.
    pub(crate) fn into_parts(
        self,
    ) -> (
        Box<dyn AsyncRead + Send + Unpin>,
        Box<dyn AsyncWrite + Send + Unpin>,
    ) {
        (self.input, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn channel_over(
        stream: tokio::io::DuplexStream,
        buffer_size: usize,
        read_timeout: Option<Duration>,
    ) -> SerialChannel {
        let (input, output) = tokio::io::split(stream);
        SerialChannel::new(Box::new(input), Box::new(output), buffer_size, read_timeout)
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (local, mut peer) = duplex(64);
        let mut channel = channel_over(local, DEFAULT_READ_BUFFER_SIZE, None);

        channel.write("LED_ON\n".as_bytes()).await.unwrap();

        let mut buf = [0u8; 7];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"LED_ON\n");
    }

    #[tokio::test]
    async fn test_read_caps_at_buffer_size() {
        let (local, mut peer) = duplex(64);
        let mut channel = channel_over(local, 4, None);

        peer.write_all(b"abcdefghij").await.unwrap();

        assert_eq!(channel.try_read().await.as_deref(), Some("abcd"));
        assert_eq!(channel.try_read().await.as_deref(), Some("efgh"));
        assert_eq!(channel.try_read().await.as_deref(), Some("ij"));
    }

    #[tokio::test]
    async fn test_read_after_peer_closed_is_none() {
        let (local, peer) = duplex(64);
        let mut channel = channel_over(local, DEFAULT_READ_BUFFER_SIZE, None);
        drop(peer);

        assert_eq!(channel.try_read().await, None);
    }

    #[tokio::test]
    async fn test_read_timeout_is_none() {
        let (local, _peer) = duplex(64);
        let mut channel =
            channel_over(local, DEFAULT_READ_BUFFER_SIZE, Some(Duration::from_millis(20)));

        assert_eq!(channel.try_read().await, None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let (local, mut peer) = duplex(64);
        let mut channel = channel_over(local, DEFAULT_READ_BUFFER_SIZE, None);

        peer.write_all(&[b'o', b'k', 0xFF]).await.unwrap();

        assert_eq!(channel.try_read().await.as_deref(), Some("ok\u{FFFD}"));
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_fails() {
        let (local, peer) = duplex(64);
        let mut channel = channel_over(local, DEFAULT_READ_BUFFER_SIZE, None);
        drop(peer);

        assert!(channel.write(b"ping").await.is_err());
    }
}

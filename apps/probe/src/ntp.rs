//! Minimal SNTP client used as the host check.
//!
//! Sends a single client request and decodes the server's transmit
//! timestamp. Nothing is adjusted on the local clock.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use host_try::HostCheck;
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tracing::info;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_EPOCH_OFFSET: i64 = 2_208_988_800;

/// Size of an NTP packet without extension fields.
pub const NTP_PACKET_LEN: usize = 48;

/// LI = 0, VN = 3, Mode = 3 (client).
const CLIENT_REQUEST_HEADER: u8 = 0x1B;

/// Mode field value of a server reply.
const MODE_SERVER: u8 = 4;

#[derive(Error, Debug)]
pub enum NtpError {
    #[error("Failed to resolve {target}: {source}")]
    Resolve { target: String, source: io::Error },

    #[error("{target} resolved to no address")]
    NoAddress { target: String },

    #[error("{addr} NTP server failed to connect: {source}")]
    Connect { addr: SocketAddr, source: io::Error },

    #[error("Failed to send request to {addr}: {source}")]
    Send { addr: SocketAddr, source: io::Error },

    #[error("Failed to read server response from {addr}: {source}")]
    Receive { addr: SocketAddr, source: io::Error },

    #[error("No response from {target} within {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    #[error("Short response: {len} bytes")]
    ShortPacket { len: usize },

    #[error("Unexpected NTP mode {0} in response")]
    UnexpectedMode(u8),

    #[error("Transmit timestamp out of range")]
    InvalidTimestamp,
}

/// Builds a client request packet.
pub fn client_request() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = CLIENT_REQUEST_HEADER;
    packet
}

/// Decodes the transmit timestamp of a server reply.
pub fn decode_transmit_time(packet: &[u8]) -> Result<DateTime<Utc>, NtpError> {
    if packet.len() < NTP_PACKET_LEN {
        return Err(NtpError::ShortPacket { len: packet.len() });
    }

    let mode = packet[0] & 0x07;
    if mode != MODE_SERVER {
        return Err(NtpError::UnexpectedMode(mode));
    }

    let secs = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]);
    let frac = u32::from_be_bytes([packet[44], packet[45], packet[46], packet[47]]);

    let unix_secs = i64::from(secs) - NTP_EPOCH_OFFSET;
    let nanos = ((u64::from(frac) * 1_000_000_000) >> 32) as u32;

    DateTime::from_timestamp(unix_secs, nanos).ok_or(NtpError::InvalidTimestamp)
}

/// Queries an NTP server and treats any valid reply as success.
pub struct NtpCheck {
    port: u16,
    timeout: Duration,
}

impl NtpCheck {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Ask `host` for the current time.
    ///
    /// `host` may carry its own port (`10.0.0.1:1123`, `[::1]:1123`),
    /// otherwise the configured port is used.
    pub async fn query(&self, host: &str) -> Result<DateTime<Utc>, NtpError> {
        let target = self.target_for(host);
        let result = tokio::time::timeout(self.timeout, exchange(&target)).await;
        match result {
            Ok(reply) => reply,
            Err(_) => Err(NtpError::Timeout {
                target,
                timeout: self.timeout,
            }),
        }
    }

    /// Socket address string to resolve for `host`. Bare IPv6 literals are
    /// bracketed before the port is appended.
    fn target_for(&self, host: &str) -> String {
        if let Ok(addr) = host.parse::<SocketAddr>() {
            return addr.to_string();
        }
        match host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", host, self.port),
        }
    }
}

async fn exchange(target: &str) -> Result<DateTime<Utc>, NtpError> {
    let addr = lookup_host(target)
        .await
        .map_err(|source| NtpError::Resolve {
            target: target.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| NtpError::NoAddress {
            target: target.to_string(),
        })?;

    let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(local)
        .await
        .map_err(|source| NtpError::Connect { addr, source })?;
    socket
        .connect(addr)
        .await
        .map_err(|source| NtpError::Connect { addr, source })?;

    socket
        .send(&client_request())
        .await
        .map_err(|source| NtpError::Send { addr, source })?;

    let mut buf = [0u8; 512];
    let len = socket
        .recv(&mut buf)
        .await
        .map_err(|source| NtpError::Receive { addr, source })?;

    decode_transmit_time(&buf[..len])
}

#[async_trait]
impl HostCheck for NtpCheck {
    type Error = NtpError;

    async fn check(&self, host: &str) -> Result<(), NtpError> {
        let time = self.query(host).await?;
        info!(host, server_time = %time.format("%Y-%m-%d %H:%M:%S"), "NTP server responded");
        Ok(())
    }
}

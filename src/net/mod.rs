//! # Network Module
//!
//! UDP socket plumbing shared by the services.
//!
//! This module handles:
//! - Binding listener and broadcast sockets with service-tagged errors
//! - The driver sink abstraction and its UDP implementation

pub mod sink;

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Largest datagram any listener accepts.
pub const MAX_DATAGRAM_SIZE: usize = 8192;

/// Bind a UDP socket for `service`
///
/// # Errors
///
/// Returns `Bind` naming the service and address if the socket cannot be
/// bound (typically because the port is in use).
pub async fn bind_udp(service: &'static str, addr: SocketAddr) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind { service, addr, source })?;
    debug!("{} bound to {}", service, addr);
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let socket = bind_udp("test", "127.0.0.1:0".parse().unwrap()).await.unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_port_in_use() {
        let first = bind_udp("first", "127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr().unwrap();

        match bind_udp("second", taken).await {
            Err(BridgeError::Bind { service, addr, .. }) => {
                assert_eq!(service, "second");
                assert_eq!(addr, taken);
            }
            other => panic!("Expected Bind error, got: {:?}", other),
        }
    }
}

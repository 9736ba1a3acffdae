//! Telemetry listener. Never replies; every rejected datagram is dropped
//! the same way, so a sender cannot tell a bad token from a bad packet.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::Result;
use crate::net::{bind_udp, MAX_DATAGRAM_SIZE};
use crate::protocol::decoder::decode_telemetry;
use crate::session::SessionRegistry;

/// Decode, authorize and store one telemetry datagram
///
/// Returns the slot that accepted the sample, or `None` if it was dropped.
pub fn ingest(registry: &SessionRegistry, datagram: &[u8], source: SocketAddr) -> Option<usize> {
    let telemetry = match decode_telemetry(datagram) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            trace!("Dropping telemetry from {}: {}", source, e);
            return None;
        }
    };

    let slot = registry.ingest(&telemetry.device_id, &telemetry.token, telemetry.sample, source);
    if slot.is_none() {
        trace!("Dropping telemetry from {}: not authorized", source);
    }
    slot
}

/// Listener for device telemetry.
#[derive(Debug)]
pub struct TelemetryIngestor {
    socket: UdpSocket,
    registry: Arc<SessionRegistry>,
}

impl TelemetryIngestor {
    /// # Errors
    ///
    /// Returns `Bind` if `addr` cannot be bound.
    pub async fn bind(addr: SocketAddr, registry: Arc<SessionRegistry>) -> Result<Self> {
        let socket = bind_udp("telemetry", addr).await?;
        Ok(Self { socket, registry })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(self, shutdown: CancellationToken) {
        if let Ok(addr) = self.socket.local_addr() {
            info!("Telemetry listening on {}", addr);
        }

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, source)) => {
                        ingest(&self.registry, &buf[..len], source);
                    }
                    Err(e) => debug!("Telemetry receive failed: {}", e),
                },
                _ = shutdown.cancelled() => break,
            }
        }

        debug!("Telemetry stopped");
    }
}

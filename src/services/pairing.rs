//! # Pairing Service
//!
//! Answers pairing requests with an accept carrying the slot, the session
//! token and the telemetry port, or a deny when every slot is taken.
//!
//! Malformed requests get no reply. Retries are the device's business.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{BridgeError, Result};
use crate::net::{bind_udp, MAX_DATAGRAM_SIZE};
use crate::protocol::decoder::decode_pair_request;
use crate::protocol::encoder::encode_message;
use crate::protocol::messages::{DenyReason, ServerMessage};
use crate::session::SessionRegistry;

/// Build the reply to one pairing datagram from `source`
///
/// Returns `None` when the datagram must be dropped without reply.
pub fn respond(
    registry: &SessionRegistry,
    datagram: &[u8],
    source: SocketAddr,
    data_port: u16,
) -> Option<ServerMessage> {
    let request = match decode_pair_request(datagram) {
        Ok(request) => request,
        Err(e) => {
            trace!("Dropping pairing datagram from {}: {}", source, e);
            return None;
        }
    };

    match registry.allocate_or_refresh(&request.device_id, &request.display_name, source) {
        Ok(pairing) => {
            let action = if pairing.created { "paired" } else { "refreshed" };
            info!(
                "Slot {} {}: {} ({}) from {}",
                pairing.slot, action, request.display_name, request.device_id, source
            );
            Some(ServerMessage::PairAccept {
                slot: pairing.slot,
                token: pairing.token,
                data_port,
            })
        }
        Err(BridgeError::NoFreeSlots) => {
            info!(
                "Denied pairing for {} ({}): no free slots",
                request.display_name, request.device_id
            );
            Some(ServerMessage::PairDeny {
                reason: DenyReason::NoFreeSlots,
            })
        }
        Err(e) => {
            warn!("Pairing failed for {}: {}", request.device_id, e);
            None
        }
    }
}

/// Listener for pairing requests.
#[derive(Debug)]
pub struct PairingService {
    socket: UdpSocket,
    registry: Arc<SessionRegistry>,
    data_port: u16,
}

impl PairingService {
    /// # Errors
    ///
    /// Returns `Bind` if `addr` cannot be bound.
    pub async fn bind(addr: SocketAddr, registry: Arc<SessionRegistry>, data_port: u16) -> Result<Self> {
        let socket = bind_udp("pairing", addr).await?;
        Ok(Self {
            socket,
            registry,
            data_port,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(self, shutdown: CancellationToken) {
        if let Ok(addr) = self.socket.local_addr() {
            info!("Pairing service listening on {}", addr);
        }

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, source) = tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        debug!("Pairing receive failed: {}", e);
                        continue;
                    }
                },
                _ = shutdown.cancelled() => break,
            };

            let Some(reply) = respond(&self.registry, &buf[..len], source, self.data_port) else {
                continue;
            };

            match encode_message(&reply) {
                Ok(bytes) => {
                    if let Err(e) = self.socket.send_to(&bytes, source).await {
                        debug!("Pairing reply to {} failed: {}", source, e);
                    }
                }
                Err(e) => warn!("Failed to encode pairing reply: {}", e),
            }
        }

        debug!("Pairing service stopped");
    }
}

//! Periodic discovery announcements so devices can find the server.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Result;
use crate::net::bind_udp;
use crate::protocol::encoder::encode_message;
use crate::protocol::messages::ServerMessage;

/// Broadcasts a `DISCOVERY` datagram at a fixed interval.
#[derive(Debug)]
pub struct DiscoveryBroadcaster {
    socket: UdpSocket,
    target: SocketAddr,
    period: Duration,
    payload: Vec<u8>,
}

impl DiscoveryBroadcaster {
    /// Bind a broadcast-enabled socket announcing `pair_port` and `data_port`
    ///
    /// The announcement is encoded once; the ports never change while the
    /// server runs.
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be bound or broadcast cannot be
    /// enabled on it.
    pub async fn bind(
        target: SocketAddr,
        period: Duration,
        pair_port: u16,
        data_port: u16,
    ) -> Result<Self> {
        let socket = bind_udp("discovery", SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.set_broadcast(true)?;

        let payload = encode_message(&ServerMessage::Discovery { pair_port, data_port })?;

        Ok(Self {
            socket,
            target,
            period,
            payload,
        })
    }

    /// The encoded announcement.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Discovery broadcasting to {} every {:?}",
            self.target, self.period
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.socket.send_to(&self.payload, self.target).await {
                        debug!("Discovery broadcast failed: {}", e);
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        debug!("Discovery stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_payload_shape() {
        let target = SocketAddr::from((Ipv4Addr::LOCALHOST, 5006));
        let broadcaster = DiscoveryBroadcaster::bind(target, Duration::from_secs(1), 5007, 5005)
            .await
            .unwrap();

        let value: Value = serde_json::from_slice(broadcaster.payload()).unwrap();
        assert_eq!(value["type"], "DISCOVERY");
        assert_eq!(value["pair_port"], 5007);
        assert_eq!(value["data_port"], 5005);
    }

    #[tokio::test]
    async fn test_announces_until_cancelled() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let broadcaster = DiscoveryBroadcaster::bind(
            listener.local_addr().unwrap(),
            Duration::from_millis(20),
            6007,
            6005,
        )
        .await
        .unwrap();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(broadcaster.run(shutdown.clone()));

        let mut buf = [0u8; 256];
        for _ in 0..2 {
            let (len, _) = tokio::time::timeout(Duration::from_secs(2), listener.recv_from(&mut buf))
                .await
                .expect("no announcement received")
                .unwrap();
            let message: ServerMessage = serde_json::from_slice(&buf[..len]).unwrap();
            assert_eq!(message, ServerMessage::Discovery { pair_port: 6007, data_port: 6005 });
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("discovery did not stop")
            .unwrap();
    }
}

//! Trait abstraction for the driver sink to enable testing

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::trace;

use super::bind_udp;
use crate::error::Result;

/// Destination for driver control lines.
///
/// Delivery is best effort: implementations never block and never surface a
/// failure to the caller.
#[cfg_attr(test, mockall::automock)]
pub trait ControlSink: Send + Sync {
    fn dispatch(&self, line: &str);
}

/// Sends each control line as one UDP datagram.
#[derive(Debug)]
pub struct UdpControlSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpControlSink {
    /// Bind an ephemeral local socket for sending to `target`
    ///
    /// # Errors
    ///
    /// Returns error if the local socket cannot be bound.
    pub async fn bind(target: SocketAddr) -> Result<Self> {
        let local = if target.ip().is_loopback() {
            SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
        } else {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        };
        let socket = bind_udp("driver sink", local).await?;
        // try_send_to reports WouldBlock until the reactor has seen the
        // socket writable once
        socket.writable().await?;
        Ok(Self { socket, target })
    }

    #[must_use]
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl ControlSink for UdpControlSink {
    fn dispatch(&self, line: &str) {
        // A full buffer or an absent driver only costs this one frame
        if let Err(e) = self.socket.try_send_to(line.as_bytes(), self.target) {
            trace!("Control line not delivered to {}: {}", self.target, e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_udp_sink_delivers_first_line() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = UdpControlSink::bind(receiver.local_addr().unwrap()).await.unwrap();

        sink.dispatch("A=1,RX=0,RY=0");

        let mut buf = [0u8; 256];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("no datagram received")
            .unwrap();
        assert_eq!(&buf[..len], b"A=1,RX=0,RY=0");
    }

    #[tokio::test]
    async fn test_udp_sink_without_listener_is_silent() {
        // Reserve a port, then free it so nothing is listening there
        let target = {
            let placeholder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            placeholder.local_addr().unwrap()
        };
        let sink = UdpControlSink::bind(target).await.unwrap();

        for _ in 0..10 {
            sink.dispatch("A=0,RX=0,RY=0");
        }
        assert_eq!(sink.target(), target);
    }

    #[test]
    fn test_mock_sink_expectations() {
        let mut sink = MockControlSink::new();
        sink.expect_dispatch()
            .withf(|line: &str| line.contains("GUIDE=1"))
            .times(1)
            .return_const(());

        sink.dispatch("A=0,GUIDE=1,RX=0,RY=0");
    }
}

//! UDP publishing of decoded samples.
//!
//! Samples go out as fixed 320-byte datagrams of packed `f32` pairs (see
//! [`RawCodec`]), the layout the desktop polar viewer listens for on port
//! 6969.

use std::net::SocketAddr;

use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::codec::RawCodec;
use crate::decoder::Sample;
use crate::error::Result;

/// Port the viewer listens on.
pub const DEFAULT_PORT: u16 = 6969;

/// Sends sample batches to one UDP peer.
pub struct SamplePublisher {
    socket: UdpSocket,
}

impl SamplePublisher {
    /// Wrap a socket that is already connected to its peer.
    pub fn new(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Bind an ephemeral local port and connect it to `target`.
    pub async fn connect<A: ToSocketAddrs>(target: A) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(target).await?;
        Ok(Self { socket })
    }

    /// Publish to the viewer on this machine.
    pub async fn localhost() -> Result<Self> {
        Self::connect(("127.0.0.1", DEFAULT_PORT)).await
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.peer_addr()?)
    }

    /// Send `samples`; returns the number of datagrams written.
    pub async fn publish(&self, samples: &[Sample]) -> Result<usize> {
        let datagrams = RawCodec::encode_datagrams(samples);
        for datagram in &datagrams {
            self.socket.send(datagram).await?;
        }
        tracing::trace!(
            "Published {} samples in {} datagrams",
            samples.len(),
            datagrams.len()
        );
        Ok(datagrams.len())
    }
}

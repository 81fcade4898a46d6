//! ---
//! kabuki_section: "02-messaging-transport"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Framed TCP connection and single-peer listener."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::debug;

use crate::connection::{FrameHandler, FramedLink};
use crate::Result;

/// Listener accepting one framed peer at a time.
///
/// The protocol is strictly single-connection; accepting a second peer
/// requires a second `accept` call once the first link has closed.
#[derive(Debug)]
pub struct FramedListener {
    inner: TcpListener,
}

impl FramedListener {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        Ok(Self { inner })
    }

    /// Local address, useful when bound to an ephemeral port.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Accept one peer and start a link over the accepted stream.
    pub async fn accept<H: FrameHandler>(&self, handler: H) -> Result<FramedLink> {
        let (stream, peer) = self.inner.accept().await?;
        debug!(peer = %peer, "peer accepted");
        Ok(FramedLink::start(stream, peer, handler))
    }
}

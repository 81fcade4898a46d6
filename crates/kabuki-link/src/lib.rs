//! ---
//! kabuki_section: "02-messaging-transport"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Framed TCP connection and single-peer listener."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
//! Framed TCP link shared by both Kabuki-Link peers.
//!
//! A [`FramedLink`] owns one TCP stream and runs two tasks: a reader that
//! decodes length-prefixed frames into a [`FrameHandler`], and a writer
//! that drains a FIFO outbound queue one frame at a time. Cross-thread
//! `write`/`close` calls are messages posted to the writer task, never
//! lock acquisitions, so every piece of socket state has exactly one
//! owner. The channel is fire-and-forget: any I/O error closes the link
//! and drops whatever was still queued.

mod connection;
mod listener;

pub use connection::{FrameHandler, FramedLink, LinkHandle};
pub use listener::FramedListener;

/// Shared result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors surfaced while establishing a link.
///
/// Mid-stream failures never surface as values to application code; they
/// close the link and are observable only through [`LinkHandle::closed`].
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Underlying socket failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Peer sent bytes that do not decode as a frame.
    #[error(transparent)]
    Protocol(#[from] kabuki_proto::ProtocolError),
}

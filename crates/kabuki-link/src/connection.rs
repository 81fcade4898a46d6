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

use kabuki_proto::{decode_header, Frame, HEADER_LEN, MAX_BODY_LEN};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::Result;

/// Callback invoked synchronously from the read loop for every complete
/// frame, in stream order.
///
/// The handle parameter lets a handler queue replies without blocking the
/// loop. Implemented for closures for test ergonomics.
pub trait FrameHandler: Send + 'static {
    /// Consume one decoded frame.
    fn on_frame(&mut self, frame: Frame, link: &LinkHandle);
}

impl<F> FrameHandler for F
where
    F: FnMut(Frame, &LinkHandle) + Send + 'static,
{
    fn on_frame(&mut self, frame: Frame, link: &LinkHandle) {
        self(frame, link)
    }
}

enum LinkOp {
    Send(Frame),
    Close,
}

/// Cheap cloneable handle used to queue writes and request shutdown from
/// any task or thread.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    ops: mpsc::UnboundedSender<LinkOp>,
}

impl LinkHandle {
    /// Queue a frame for transmission and return immediately.
    ///
    /// Frames are sent in submission order with at most one socket write
    /// in flight. Once the link has closed this is a silent no-op:
    /// delivery is never guaranteed, only ordered submission.
    pub fn write(&self, frame: Frame) {
        if self.ops.send(LinkOp::Send(frame)).is_err() {
            trace!("write after close dropped");
        }
    }

    /// Request shutdown of the link. Idempotent; safe from any thread.
    pub fn close(&self) {
        if self.ops.send(LinkOp::Close).is_err() {
            trace!("close on already-closed link ignored");
        }
    }

    /// Wait until the link has fully closed, whether by [`close`], peer
    /// disconnect, or transport error.
    ///
    /// [`close`]: LinkHandle::close
    pub async fn closed(&self) {
        self.ops.closed().await;
    }

    /// Handle not backed by any link: every write is dropped.
    ///
    /// Lets frame handlers be exercised without a socket.
    pub fn detached() -> Self {
        let (ops, _) = mpsc::unbounded_channel();
        Self { ops }
    }
}

/// One framed TCP connection.
///
/// Created by [`FramedLink::connect`] or [`FramedListener::accept`];
/// destroyed on explicit close or the first unrecoverable I/O error.
/// There is no reconnect: a failed link must be discarded and the
/// surrounding application decides restart policy.
///
/// [`FramedListener::accept`]: crate::FramedListener::accept
#[derive(Debug)]
pub struct FramedLink {
    handle: LinkHandle,
    peer: SocketAddr,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl FramedLink {
    /// Connect to a peer and start the link tasks.
    ///
    /// A connect failure is surfaced to the caller and the link never
    /// starts; there is no retry.
    pub async fn connect<H: FrameHandler>(addr: SocketAddr, handler: H) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::start(stream, addr, handler))
    }

    pub(crate) fn start<H: FrameHandler>(stream: TcpStream, peer: SocketAddr, handler: H) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(4);
        let handle = LinkHandle { ops: ops_tx };

        let reader = tokio::spawn(read_loop(
            read_half,
            handler,
            handle.clone(),
            shutdown_tx.clone(),
            shutdown_tx.subscribe(),
        ));
        let writer = tokio::spawn(write_loop(
            write_half,
            ops_rx,
            shutdown_tx.clone(),
            shutdown_tx.subscribe(),
        ));
        debug!(peer = %peer, "link established");

        Self {
            handle,
            peer,
            reader,
            writer,
        }
    }

    /// Handle for queueing writes from other tasks.
    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Queue a frame for transmission. See [`LinkHandle::write`].
    pub fn write(&self, frame: Frame) {
        self.handle.write(frame);
    }

    /// Request shutdown. See [`LinkHandle::close`].
    pub fn close(&self) {
        self.handle.close();
    }

    /// Wait until the link has fully closed. See [`LinkHandle::closed`].
    pub async fn closed(&self) {
        self.handle.closed().await;
    }

    /// Await both link tasks. Call after [`close`] for an orderly exit.
    ///
    /// [`close`]: FramedLink::close
    pub async fn join(self) {
        let _ = self.reader.await;
        let _ = self.writer.await;
    }
}

async fn read_loop<H: FrameHandler>(
    mut stream: OwnedReadHalf,
    mut handler: H,
    link: LinkHandle,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    // Reusable receive buffer; only the frame currently being decoded is
    // ever held.
    let mut header = [0u8; HEADER_LEN];
    let mut body = vec![0u8; MAX_BODY_LEN];
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            next = read_frame(&mut stream, &mut header, &mut body) => match next {
                Ok(frame) => handler.on_frame(frame, &link),
                Err(err) => {
                    debug!(error = %err, "read loop terminating");
                    break;
                }
            }
        }
    }
    let _ = shutdown_tx.send(());
}

async fn read_frame(
    stream: &mut OwnedReadHalf,
    header: &mut [u8; HEADER_LEN],
    body: &mut [u8],
) -> Result<Frame> {
    stream.read_exact(header).await?;
    let length = decode_header(header)?;
    let body = &mut body[..length];
    stream.read_exact(body).await?;
    Ok(Frame::new(&body[..])?)
}

async fn write_loop(
    mut stream: OwnedWriteHalf,
    mut ops: mpsc::UnboundedReceiver<LinkOp>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            op = ops.recv() => match op {
                Some(LinkOp::Send(frame)) => {
                    // One frame in flight at a time; the queue preserves
                    // submission order.
                    if let Err(err) = stream.write_all(&frame.encode()).await {
                        warn!(error = %err, "write failed; dropping queued frames");
                        break;
                    }
                }
                Some(LinkOp::Close) | None => break,
            }
        }
    }
    let _ = stream.shutdown().await;
    let _ = shutdown_tx.send(());
    // Dropping the receiver here turns later writes into no-ops.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detached_handle_is_immediately_closed() {
        let handle = LinkHandle::detached();
        handle.closed().await;
    }

    #[tokio::test]
    async fn writes_and_closes_on_a_dead_handle_are_noops() {
        let handle = LinkHandle::detached();
        let frame = Frame::from_text("[kinect] stop").expect("short body");
        handle.write(frame.clone());
        handle.write(frame);
        handle.close();
        handle.close();
    }

    #[test]
    fn closures_satisfy_the_handler_seam() {
        fn assert_handler<H: FrameHandler>(_handler: H) {}
        assert_handler(|_frame: Frame, _link: &LinkHandle| {});
    }
}

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::core::GeneralSettings;
use crate::protocol::{LineCodec, Message};
use crate::station::{Interface, Registry};

use super::router::{HandlerCx, Router};

/// Maximum number of bytes of a frame shown in debug traces
const MAX_TRACE_BYTES: usize = 200;

/// Identifier for one accepted connection
pub type ConnId = u64;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a connection's ordered outbound queue.
///
/// Clones are cheap; the queue is drained by a single writer task, so
/// enqueue order is emission order and two messages never interleave on
/// the wire. Sends to a dead connection are silently discarded.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnId,
    outbound: mpsc::UnboundedSender<Vec<Message>>,
}

impl ConnectionHandle {
    fn new(outbound: mpsc::UnboundedSender<Vec<Message>>) -> Self {
        ConnectionHandle {
            id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            outbound,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Enqueues one message; returns false if the peer is gone
    pub fn send(&self, message: Message) -> bool {
        self.outbound.send(vec![message]).is_ok()
    }

    /// Enqueues messages that must leave in a single write
    pub fn send_batch(&self, batch: Vec<Message>) -> bool {
        self.outbound.send(batch).is_ok()
    }

    #[cfg(test)]
    pub fn test_pair() -> (ConnectionHandle, mpsc::UnboundedReceiver<Vec<Message>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(tx), rx)
    }
}

/// Starts the reader and writer tasks for an accepted socket
pub fn spawn(
    stream: TcpStream,
    peer: SocketAddr,
    interface: Arc<Interface>,
    settings: GeneralSettings,
    registry: Arc<Registry>,
    router: Arc<Router>,
    jobs: TaskTracker,
) {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = ConnectionHandle::new(tx);

    interface.attach(conn.clone());

    tokio::spawn(write_loop(write_half, rx, interface.clone(), conn.id(), peer));

    let cx = HandlerCx {
        settings,
        registry,
        interface,
        conn,
        jobs,
    };
    tokio::spawn(read_loop(read_half, router, cx, peer));
}

async fn read_loop(
    read_half: OwnedReadHalf,
    router: Arc<Router>,
    cx: HandlerCx,
    peer: SocketAddr,
) {
    let mut frames = FramedRead::new(read_half, LineCodec::new());

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(message) => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    debug!("RX <- {} {}", cx.interface.name(), trace_frame(&message));
                }
                router.dispatch(&cx, message);
            }
            Err(e) => {
                warn!("{}: read from {} failed: {}", cx.interface.name(), peer, e);
                break;
            }
        }
    }

    cx.interface.detach(cx.conn.id());
    info!("{} disconnected {}", cx.interface.name(), peer);
}

async fn write_loop(
    write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Vec<Message>>,
    interface: Arc<Interface>,
    id: ConnId,
    peer: SocketAddr,
) {
    let mut sink = FramedWrite::new(write_half, LineCodec::new());

    while let Some(batch) = outbound.recv().await {
        for message in batch {
            if tracing::enabled!(tracing::Level::DEBUG) {
                debug!("TX -> {} {}", interface.name(), trace_frame(&message));
            }
            if let Err(e) = sink.feed(message).await {
                warn!("{}: write to {} failed: {}", interface.name(), peer, e);
                interface.detach(id);
                return;
            }
        }
        if let Err(e) = sink.flush().await {
            warn!("{}: write to {} failed: {}", interface.name(), peer, e);
            interface.detach(id);
            return;
        }
    }
}

fn trace_frame(message: &Message) -> String {
    let mut line = serde_json::to_string(message)
        .unwrap_or_else(|_| String::from("<unserializable>"));
    if line.len() > MAX_TRACE_BYTES {
        let cut = (0..=MAX_TRACE_BYTES)
            .rev()
            .find(|i| line.is_char_boundary(*i))
            .unwrap_or(0);
        line.truncate(cut);
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_queue_preserves_order() {
        let (conn, mut rx) = ConnectionHandle::test_pair();

        assert!(conn.send(Message::rig_ptt(true, 1)));
        assert!(conn.send_batch(vec![
            Message::rig_ptt(false, 2),
            Message::rig_ptt(true, 3),
        ]));

        assert_eq!(rx.try_recv().unwrap().len(), 1);
        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].value, "off");
        assert_eq!(batch[1].value, "on");
    }

    #[test]
    fn test_send_to_closed_queue_reports_failure() {
        let (conn, rx) = ConnectionHandle::test_pair();
        drop(rx);
        assert!(!conn.send(Message::rig_ptt(true, 1)));
    }

    #[test]
    fn test_handles_get_distinct_ids() {
        let (a, _rx_a) = ConnectionHandle::test_pair();
        let (b, _rx_b) = ConnectionHandle::test_pair();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_trace_frame_truncates_long_payloads() {
        let message = Message::rx_activity(&"X".repeat(500), 3578000, 700, 0, 0.0, 0);
        let trace = trace_frame(&message);
        assert!(trace.len() <= MAX_TRACE_BYTES + 3);
        assert!(trace.ends_with("..."));
    }
}

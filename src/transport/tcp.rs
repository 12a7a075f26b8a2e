//! Point-to-point channel over raw TCP.
//!
//! Carries `[tag: u64 LE][len: u64 LE][payload]` frames. A background task
//! reads frames and routes them into per-tag channels, so multiple
//! collectives for different parameters can be in flight on one connection
//! without stealing each other's messages. Within one (peer, tag) pair,
//! frames arrive in send order (TCP ordering + FIFO channels), which is what
//! multi-round ring algorithms rely on.

use crate::error::{GradixError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

type TagReceiverMap = HashMap<u64, Arc<Mutex<mpsc::Receiver<Vec<u8>>>>>;

/// Shared state between the recv loop and the channel.
///
/// When a frame arrives before a receiver has been registered for its tag,
/// the payload is buffered in `pending`. When a receiver registers, pending
/// payloads are flushed into the new channel first.
struct RecvState {
    senders: HashMap<u64, mpsc::Sender<Vec<u8>>>,
    pending: HashMap<u64, Vec<Vec<u8>>>,
}

/// One directional pair of framed streams to a single peer.
pub struct TcpChannel {
    writer: Mutex<tokio::io::WriteHalf<TcpStream>>,
    /// Shared state with the recv loop (senders + pending buffer).
    state: Arc<Mutex<RecvState>>,
    /// Per-tag receivers, each independently lockable so concurrent tags
    /// don't block each other.
    receivers: Mutex<TagReceiverMap>,
    /// Background recv task; aborted on drop.
    recv_handle: tokio::task::JoinHandle<()>,
}

/// Maximum frame size (4 GiB). A frame larger than this indicates a corrupt
/// or hostile peer; the connection is closed.
const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024 * 1024;

impl TcpChannel {
    /// Create a channel from an already-connected `TcpStream`.
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        let state = Arc::new(Mutex::new(RecvState {
            senders: HashMap::new(),
            pending: HashMap::new(),
        }));

        let recv_state = Arc::clone(&state);
        let recv_handle = tokio::spawn(async move {
            recv_loop(reader, recv_state).await;
        });

        Self {
            writer: Mutex::new(writer),
            state,
            receivers: Mutex::new(HashMap::new()),
            recv_handle,
        }
    }

    /// Send one tagged frame: `[tag: u64 LE][len: u64 LE][payload]`.
    pub async fn send(&self, tag: u64, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&tag.to_le_bytes())
            .await
            .map_err(|e| GradixError::transport(format!("write tag: {e}")))?;
        writer
            .write_all(&(data.len() as u64).to_le_bytes())
            .await
            .map_err(|e| GradixError::transport(format!("write len: {e}")))?;
        writer
            .write_all(data)
            .await
            .map_err(|e| GradixError::transport(format!("write payload: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| GradixError::transport(format!("flush: {e}")))?;
        Ok(())
    }

    /// Receive the next frame for a specific tag.
    pub async fn recv(&self, tag: u64) -> Result<Vec<u8>> {
        let rx_arc = self.tag_receiver(tag).await;
        let mut rx = rx_arc.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| GradixError::transport("connection closed"))
    }

    /// Get or create a per-tag receiver. Returns an `Arc<Mutex<Receiver>>`
    /// that can be locked independently of other tags.
    async fn tag_receiver(&self, tag: u64) -> Arc<Mutex<mpsc::Receiver<Vec<u8>>>> {
        // Fast path: already registered.
        {
            let map = self.receivers.lock().await;
            if let Some(rx) = map.get(&tag) {
                return Arc::clone(rx);
            }
        }
        // Slow path: create channel, register sender, flush any pending
        // frames outside the state lock.
        let (tx, rx) = mpsc::channel(64);
        let flush_tx = tx.clone();
        let pending = {
            let mut st = self.state.lock().await;
            let pending = st.pending.remove(&tag);
            st.senders.insert(tag, tx);
            pending
        };
        if let Some(frames) = pending {
            for frame in frames {
                let _ = flush_tx.send(frame).await;
            }
        }
        let rx_arc = Arc::new(Mutex::new(rx));
        self.receivers.lock().await.insert(tag, Arc::clone(&rx_arc));
        rx_arc
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.recv_handle.abort();
    }
}

/// Background loop: read frames and route to the appropriate tag channel.
async fn recv_loop(mut reader: tokio::io::ReadHalf<TcpStream>, state: Arc<Mutex<RecvState>>) {
    let mut tag_buf = [0u8; 8];
    let mut len_buf = [0u8; 8];
    loop {
        if let Err(e) = reader.read_exact(&mut tag_buf).await {
            tracing::debug!("recv loop ended: {e}");
            return;
        }
        if let Err(e) = reader.read_exact(&mut len_buf).await {
            tracing::debug!("recv loop ended reading len: {e}");
            return;
        }
        let tag = u64::from_le_bytes(tag_buf);
        let len = u64::from_le_bytes(len_buf) as usize;

        if len > MAX_FRAME_SIZE {
            tracing::warn!(len, "frame too large, closing connection");
            return;
        }

        let mut payload = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut payload).await {
            tracing::debug!("recv loop ended reading payload: {e}");
            return;
        }

        // Clone the sender outside the lock so the channel send doesn't
        // hold it across an await point.
        let tx = {
            let st = state.lock().await;
            st.senders.get(&tag).cloned()
        };
        if let Some(tx) = tx {
            if tx.send(payload).await.is_err() {
                return;
            }
        } else {
            let mut st = state.lock().await;
            st.pending.entry(tag).or_default().push(payload);
        }
    }
}

/// Bind a listener and return it with its resolved local address.
pub async fn tcp_listen(addr: std::net::SocketAddr) -> Result<(TcpListener, std::net::SocketAddr)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GradixError::transport(format!("listen: {e}")))?;
    let local = listener
        .local_addr()
        .map_err(|e| GradixError::transport(format!("local_addr: {e}")))?;
    Ok((listener, local))
}

/// Connect to a peer's listener and create the channel.
pub async fn tcp_connect(addr: std::net::SocketAddr) -> Result<TcpChannel> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| GradixError::transport(format!("connect: {e}")))?;
    stream
        .set_nodelay(true)
        .map_err(|e| GradixError::transport(format!("set_nodelay: {e}")))?;
    Ok(TcpChannel::from_stream(stream))
}

/// Accept one connection from a listener.
pub async fn tcp_accept(listener: &TcpListener) -> Result<TcpChannel> {
    let (stream, _addr) = listener
        .accept()
        .await
        .map_err(|e| GradixError::transport(format!("accept: {e}")))?;
    stream
        .set_nodelay(true)
        .map_err(|e| GradixError::transport(format!("set_nodelay: {e}")))?;
    Ok(TcpChannel::from_stream(stream))
}

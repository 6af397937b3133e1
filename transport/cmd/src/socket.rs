//! Unix-socket plumbing between the async edge and the core loop.
//!
//! Packet sockets carry raw MCTP packets as 16-bit length-prefixed
//! frames; every frame read is forwarded into the core loop, and every
//! packet the core transmits is fanned out to all connected peers. The
//! application socket carries completed messages to demux clients: a
//! client registers by sending a single message-type byte, then
//! receives `[src eid][payload]` frames and may send
//! `[dest eid][message]` frames for transmission.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::{CoreMsg, Side};
use mctp_core::{Binding, TxError};
use mctp_wire::PacketBuffer;

/// Read one length-prefixed frame. `None` on clean EOF.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 2];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }

    let len = u16::from_be_bytes(len_buf) as usize;
    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame).await?;
    Ok(Some(frame))
}

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> io::Result<()> {
    let len = u16::try_from(frame.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Binding that hands transmitted packets to a socket hub.
///
/// `tx` pushes into an unbounded channel and never blocks the core
/// loop; the hub task drains it onto the connected peers.
pub struct SocketBinding {
    name: String,
    pkt_size: usize,
    out: UnboundedSender<Vec<u8>>,
}

impl SocketBinding {
    pub fn new(name: impl Into<String>, pkt_size: usize, out: UnboundedSender<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            pkt_size,
            out,
        }
    }
}

impl Binding for SocketBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn pkt_size(&self) -> usize {
        self.pkt_size
    }

    fn tx(&mut self, pkt: &PacketBuffer) -> Result<(), TxError> {
        self.out
            .send(pkt.wire_bytes().to_vec())
            .map_err(|_| TxError::Failed("packet hub gone".to_string()))
    }
}

/// Bind a packet socket: frames read from peers go into the core loop
/// tagged with `side`, frames from `out_rx` go to every peer.
pub fn serve_packet_socket(
    path: &Path,
    label: String,
    side: Side,
    core_tx: std::sync::mpsc::Sender<CoreMsg>,
    mut out_rx: UnboundedReceiver<Vec<u8>>,
) -> anyhow::Result<()> {
    let listener = bind_unix(path)?;
    let (peer_tx, mut peer_rx) = unbounded_channel::<OwnedWriteHalf>();

    // Fan-out hub: one writer list, peers dropped on write failure.
    let hub_label = label.clone();
    tokio::spawn(async move {
        let mut peers: Vec<OwnedWriteHalf> = Vec::new();
        loop {
            tokio::select! {
                Some(writer) = peer_rx.recv() => peers.push(writer),
                frame = out_rx.recv() => match frame {
                    Some(frame) => {
                        let mut alive = Vec::with_capacity(peers.len());
                        for mut writer in peers.drain(..) {
                            if write_frame(&mut writer, &frame).await.is_ok() {
                                alive.push(writer);
                            }
                        }
                        peers = alive;
                    }
                    None => break,
                },
            }
        }
        debug!(component = %hub_label, "packet hub stopped");
    });

    tokio::spawn(async move {
        info!(component = %label, path = %listener_path(&listener), "packet socket listening");
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(component = %label, %err, "accept failed");
                    break;
                }
            };

            debug!(component = %label, "packet peer connected");
            let (mut reader, writer) = stream.into_split();
            if peer_tx.send(writer).is_err() {
                break;
            }

            let core_tx = core_tx.clone();
            let peer_label = label.clone();
            tokio::spawn(async move {
                while let Ok(Some(frame)) = read_frame(&mut reader).await {
                    if core_tx.send(CoreMsg::Rx { side, raw: frame }).is_err() {
                        break;
                    }
                }
                debug!(component = %peer_label, "packet peer disconnected");
            });
        }
    });

    Ok(())
}

/// Bind the application socket and demultiplex completed messages to
/// registered clients by message type.
pub fn serve_app_socket(
    path: &Path,
    core_tx: std::sync::mpsc::Sender<CoreMsg>,
    mut deliver_rx: UnboundedReceiver<(u8, u8, Vec<u8>)>,
) -> anyhow::Result<()> {
    let listener = bind_unix(path)?;
    let registry: Arc<Mutex<HashMap<u8, Vec<UnboundedSender<Vec<u8>>>>>> =
        Arc::new(Mutex::new(HashMap::new()));

    // Delivery fan-out keyed by message type.
    let delivery_registry = registry.clone();
    tokio::spawn(async move {
        while let Some((msg_type, src, payload)) = deliver_rx.recv().await {
            let mut frame = Vec::with_capacity(1 + payload.len());
            frame.push(src);
            frame.extend_from_slice(&payload);

            let mut registry = delivery_registry.lock().expect("registry poisoned");
            if let Some(clients) = registry.get_mut(&msg_type) {
                clients.retain(|client| client.send(frame.clone()).is_ok());
            }
        }
    });

    tokio::spawn(async move {
        info!(component = "app", path = %listener_path(&listener), "app socket listening");
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(component = "app", %err, "accept failed");
                    break;
                }
            };

            let core_tx = core_tx.clone();
            let registry = registry.clone();
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.into_split();

                // Registration: the first byte names the message type
                // this client wants to receive.
                let mut reg = [0u8; 1];
                if reader.read_exact(&mut reg).await.is_err() {
                    return;
                }
                let msg_type = reg[0] & 0x7F;
                let (client_tx, mut client_rx) = unbounded_channel::<Vec<u8>>();
                registry
                    .lock()
                    .expect("registry poisoned")
                    .entry(msg_type)
                    .or_default()
                    .push(client_tx);
                info!(component = "app", msg_type, "client registered");

                let write_task = tokio::spawn(async move {
                    while let Some(frame) = client_rx.recv().await {
                        if write_frame(&mut writer, &frame).await.is_err() {
                            break;
                        }
                    }
                });

                // Inbound frames: [dest eid][message bytes].
                while let Ok(Some(frame)) = read_frame(&mut reader).await {
                    if frame.len() < 2 {
                        debug!(component = "app", "short app frame ignored");
                        continue;
                    }
                    let dest = frame[0];
                    let message = frame[1..].to_vec();
                    if core_tx.send(CoreMsg::Tx { dest, message }).is_err() {
                        break;
                    }
                }

                write_task.abort();
                debug!(component = "app", msg_type, "client disconnected");
            });
        }
    });

    Ok(())
}

/// Bind a Unix listener, clearing any stale socket file first.
fn bind_unix(path: &Path) -> anyhow::Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating socket directory {parent:?}"))?;
    }
    let _ = std::fs::remove_file(path);
    UnixListener::bind(path).with_context(|| format!("binding unix socket {path:?}"))
}

fn listener_path(listener: &UnixListener) -> String {
    listener
        .local_addr()
        .ok()
        .and_then(|addr| addr.as_pathname().map(|p| p.display().to_string()))
        .unwrap_or_else(|| "<unnamed>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(256);

        write_frame(&mut client, b"\x08\x09\xC0payload").await.unwrap();
        let frame = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(frame, b"\x08\x09\xC0payload");
    }

    #[tokio::test]
    async fn test_frame_clean_eof() {
        let (client, mut server) = tokio::io::duplex(16);
        drop(client);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let (mut client, mut server) = tokio::io::duplex(16);
        write_frame(&mut client, b"").await.unwrap();
        let frame = read_frame(&mut server).await.unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_socket_binding_tx() {
        let (out_tx, mut out_rx) = unbounded_channel();
        let mut binding = SocketBinding::new("pkt", 64, out_tx);

        let pkt = PacketBuffer::from_wire(0, &[8, 9, 0xC0, 1, 2, 3]).unwrap();
        binding.tx(&pkt).unwrap();

        assert_eq!(out_rx.try_recv().unwrap(), vec![8, 9, 0xC0, 1, 2, 3]);
    }

    #[test]
    fn test_socket_binding_tx_hub_gone() {
        let (out_tx, out_rx) = unbounded_channel();
        drop(out_rx);
        let mut binding = SocketBinding::new("pkt", 64, out_tx);

        let pkt = PacketBuffer::from_wire(0, &[8, 9, 0xC0]).unwrap();
        assert!(matches!(binding.tx(&pkt), Err(TxError::Failed(_))));
    }
}

// WebSocket server for the board feed pushed by the browser-side script.

use futures_util::stream::Stream;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::protocol::BoardMessage;

/// Events emitted by the board-feed server to the position source.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A board script has connected.
    Connected { addr: String },
    /// The current board script has disconnected.
    Disconnected,
    /// A well-formed frame from the board script.
    Message(BoardMessage),
}

/// Bind the board-feed listener on `127.0.0.1:{port}`.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("Board feed listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept board scripts one at a time, forwarding their frames through `tx`.
///
/// Runs until the receiving side is dropped or accepting fails.
pub async fn run(listener: TcpListener, tx: mpsc::Sender<FeedEvent>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        info!("Accepted TCP connection from {addr_str}");

        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {addr_str}: {e}");
                continue;
            }
        };

        if tx
            .send(FeedEvent::Connected {
                addr: addr_str.clone(),
            })
            .await
            .is_err()
        {
            break;
        }

        let (_write, read) = ws_stream.split();
        if process_message_stream(read, &tx, &addr_str).await.is_err() {
            break;
        }

        if tx.send(FeedEvent::Disconnected).await.is_err() {
            break;
        }
    }

    Ok(())
}

/// Decode text frames from `stream` into [`BoardMessage`]s and forward them.
///
/// Malformed frames are logged and skipped, as are heartbeats that arrive
/// while the queue is full. A close frame or transport error
/// ends the connection normally. Returns `Err(())` once the receiver is gone.
pub async fn process_message_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<FeedEvent>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<BoardMessage>(text.as_str()) {
                // Heartbeats never wait for queue space, so they cannot hold
                // back the board states behind them.
                Ok(msg @ BoardMessage::Heartbeat { .. }) => {
                    match tx.try_send(FeedEvent::Message(msg)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!("Feed queue full, dropping heartbeat from {addr}");
                        }
                        Err(TrySendError::Closed(_)) => return Err(()),
                    }
                }
                Ok(msg) => {
                    debug!(?msg, "board frame");
                    if tx.send(FeedEvent::Message(msg)).await.is_err() {
                        return Err(());
                    }
                }
                Err(e) => {
                    warn!("Dropping malformed frame from {addr}: {e}");
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            // Binary, Ping, Pong and raw frames carry nothing for us.
            _ => {}
        }
    }
    Ok(())
}

// Position source backed by the board-feed WebSocket.
//
// The server task pushes `FeedEvent`s into a channel as the board script
// reports them; each read drains whatever has arrived since the last read
// and answers with the most recent board state.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info};

use movewatch_core::capability::{PositionSource, SourceError};
use movewatch_core::protocol::BoardMessage;
use movewatch_core::types::Position;
use movewatch_core::ws_server::FeedEvent;

pub struct WsPositionSource {
    rx: mpsc::Receiver<FeedEvent>,
    latest: Option<Position>,
    video: Option<PathBuf>,
    /// Set once the server side of the channel has gone away.
    closed: bool,
}

impl WsPositionSource {
    pub fn new(rx: mpsc::Receiver<FeedEvent>) -> Self {
        Self {
            rx,
            latest: None,
            video: None,
            closed: false,
        }
    }

    /// Apply every event queued so far without waiting for more.
    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }

    fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connected { addr } => {
                info!("Board script connected from {addr}");
            }
            FeedEvent::Disconnected => {
                info!("Board script disconnected");
                self.latest = None;
            }
            FeedEvent::Message(BoardMessage::BoardState { fen, .. }) => {
                self.latest = fen.as_deref().and_then(Position::parse);
            }
            FeedEvent::Message(BoardMessage::VideoReady { path }) => {
                info!("Session video reported at {path}");
                self.video = Some(PathBuf::from(path));
            }
            FeedEvent::Message(BoardMessage::Heartbeat { .. }) => {
                debug!("board script heartbeat");
            }
        }
    }
}

#[async_trait]
impl PositionSource for WsPositionSource {
    async fn read_current_position(&mut self) -> Result<Option<Position>, SourceError> {
        self.drain();
        if self.closed {
            return Err(SourceError::FeedClosed);
        }
        Ok(self.latest.clone())
    }

    async fn video_artifact(&mut self) -> Result<Option<PathBuf>, SourceError> {
        self.drain();
        Ok(self.video.clone())
    }
}

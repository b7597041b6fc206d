// Collaborator capabilities consumed by the monitor loop.
//
// The browser, the evaluator service and the chat channel are all reached
// through these traits so the loop can be driven by in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Position, Score};

/// Filename every uploaded session video is tagged with.
pub const VIDEO_FILE_NAME: &str = "debug_video.webm";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal failure of the position source. Ends the monitoring session.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("board feed closed")]
    FeedClosed,

    #[error("position source failed: {0}")]
    Other(String),
}

/// Failure delivering a message to the chat channel. Never fatal.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("chat request failed: {0}")]
    Transport(String),

    #[error("chat channel returned status {0}")]
    Status(u16),

    #[error("failed to read attachment: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Read access to the board of the game being watched.
#[async_trait]
pub trait PositionSource: Send {
    /// Current position, or `None` while the board is not observable.
    async fn read_current_position(&mut self) -> Result<Option<Position>, SourceError>;

    /// Local path of the recorded session video, once the browser has one.
    async fn video_artifact(&mut self) -> Result<Option<PathBuf>, SourceError>;
}

/// Position scoring. `None` means no score is available for any reason.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, position: &Position) -> Option<Score>;
}

/// Outbound chat channel.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn post_text(&self, text: &str) -> Result<(), PublishError>;

    async fn post_file(&self, caption: &str, path: &Path) -> Result<(), PublishError>;
}

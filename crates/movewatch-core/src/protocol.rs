// Message types exchanged with the browser-side board script.
//
// The script reads the `data-fen` attribute of the board container and
// pushes JSON frames over the board-feed WebSocket. Frames are tagged on
// `type`:
//
//   {"type":"BOARD_STATE","fen":"rnbqkbnr/... w KQkq - 0 1","timestamp":1700000000}
//   {"type":"VIDEO_READY","path":"/tmp/session/debug_video.webm"}
//   {"type":"HEARTBEAT","timestamp":1700000000}

use serde::{Deserialize, Serialize};

/// A frame sent by the board script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardMessage {
    /// Current value of the board's `data-fen` attribute. `fen` is null or
    /// empty while the page is still loading.
    BoardState {
        #[serde(default)]
        fen: Option<String>,
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// The browser finished writing the session recording to `path`.
    VideoReady { path: String },
    Heartbeat {
        #[serde(default)]
        timestamp: Option<u64>,
    },
}

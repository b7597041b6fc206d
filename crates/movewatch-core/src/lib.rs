// Library root: shared domain types, the move classifier, collaborator
// capabilities, configuration and the board-feed WebSocket server.

pub mod capability;
pub mod classify;
pub mod config;
pub mod protocol;
pub mod types;
pub mod ws_server;

// Library root: the monitor loop and the concrete collaborators the binary
// wires into it. Re-exported so integration tests can reach them.

pub mod board_feed;
pub mod monitor;
pub mod publisher;

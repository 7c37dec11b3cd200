//! Error types for the server crate.

use std::io;

use thiserror::Error;

/// Ways a client session can end early
///
/// Neither variant affects other sessions or the aggregation store.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The connection dropped or a write failed
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// The selected genre index was outside the menu
    #[error("Invalid genre index {index} (menu has {menu_len} genres)")]
    InvalidSelection { index: i64, menu_len: usize },
}

/// Errors raised by the protocol client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// The server closed the connection before sending an expected line
    #[error("Server closed the connection while waiting for {expected}")]
    UnexpectedEof { expected: &'static str },

    /// The server sent something other than the expected line
    #[error("Expected {expected}, got {line:?}")]
    UnexpectedLine { expected: &'static str, line: String },
}

//! Error types for the session layer.

use thiserror::Error;

/// Errors that can occur while running a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Wire(#[from] chorus_wire::WireError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

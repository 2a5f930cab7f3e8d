//! Error types of the server.
//!
//! Only [`ServerError`] can end the process. Connection level failures end
//! the affected handler, and rejected intents never touch session state.

use shared::{CodecError, InvalidDirection, PlayerId};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Why a player intent was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntentRejected {
    #[error(transparent)]
    InvalidDirection(#[from] InvalidDirection),

    #[error("move intent without a direction")]
    MissingDirection,

    #[error("cannot reverse onto own body")]
    Reversal,

    #[error("game is over, only restart is accepted")]
    GameOver,

    #[error("restart is only accepted once the game is over")]
    GameInProgress,

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
}

/// Ends a single connection handler.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("server is full")]
    ServerFull,
}

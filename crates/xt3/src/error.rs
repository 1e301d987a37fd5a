//! Error types for the XtremeT3 client.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

use std::io;
use thiserror::Error;

/// Client errors.
///
/// `SessionFull` and `VersionMismatch` are fatal: retrying the connection
/// cannot fix them, so the client stops instead of backing off.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to reach the authority.
    #[error("Failed to connect to authority: {0}")]
    Connection(String),

    /// Protocol version mismatch with the authority.
    #[error("Protocol version mismatch (client: {client_version}, authority: {authority_version})")]
    VersionMismatch {
        client_version: String,
        authority_version: String,
    },

    /// The authority turned the connection away.
    #[error("Connection rejected by authority: {0}")]
    Rejected(String),

    /// Both seats are taken.
    #[error("There are already two players")]
    SessionFull,

    /// An unexpected message during the handshake.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse message: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ClientError {
    /// True if reconnecting cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionFull | Self::VersionMismatch { .. })
    }
}

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_full_message_matches_player_prompt() {
        assert_eq!(
            ClientError::SessionFull.to_string(),
            "There are already two players"
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ClientError::SessionFull.is_fatal());
        assert!(ClientError::VersionMismatch {
            client_version: "1.0".into(),
            authority_version: "2.0".into(),
        }
        .is_fatal());

        assert!(!ClientError::Rejected("Too many connections (max: 8)".into()).is_fatal());
        assert!(!ClientError::Connection("refused".into()).is_fatal());
        assert!(!ClientError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_fatal());
    }
}

//! Participant identity tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity issued to a participant at registration.
///
/// Wraps a random 128-bit UUID. The nil UUID is reserved as the invalid
/// token: it is what a refused registration hands back and it is never
/// issued to an admitted participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerToken(Uuid);

impl PlayerToken {
    /// The reserved invalid token.
    pub const INVALID: PlayerToken = PlayerToken(Uuid::nil());

    /// Generates a fresh random token.
    ///
    /// A v4 UUID is never nil, so the result is always valid.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns true if this is the reserved invalid token.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns a shortened display form (first 8 hex characters).
    pub fn short(&self) -> String {
        self.0.simple().to_string().chars().take(8).collect()
    }
}

impl Default for PlayerToken {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for PlayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PlayerToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_tokens_are_valid_and_distinct() {
        let tokens: HashSet<PlayerToken> = (0..64).map(|_| PlayerToken::generate()).collect();
        assert_eq!(tokens.len(), 64);
        assert!(tokens.iter().all(|t| !t.is_invalid()));
    }

    #[test]
    fn test_invalid_token_is_default() {
        assert!(PlayerToken::default().is_invalid());
        assert_eq!(PlayerToken::default(), PlayerToken::INVALID);
    }

    #[test]
    fn test_token_serializes_as_plain_uuid() {
        let token = PlayerToken::generate();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{token}\""));

        let parsed: PlayerToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_token_short() {
        let token = PlayerToken::generate();
        assert_eq!(token.short().len(), 8);
    }
}

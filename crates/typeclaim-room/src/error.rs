//! Error types for the room layer.
//!
//! The `Display` text of admission errors is shown to players verbatim,
//! so it is written for people, not logs.

use typeclaim_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code. Holds the code as the user typed it.
    #[error("Game not found")]
    NotFound(String),

    /// The room already has its maximum number of players.
    #[error("Game is full")]
    RoomFull(RoomCode),

    /// Someone in the room already uses this name (ignoring case).
    #[error("Name \"{0}\" is already taken in this game")]
    NameTaken(String),

    /// The name is empty or too long after trimming.
    #[error("Name must be between 1 and {max} characters")]
    InvalidName { max: usize },

    /// The room has already started or finished.
    #[error("Game has already started")]
    NotWaiting(RoomCode),

    /// The player is already a member of this room.
    #[error("You are already in game {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// The player is not a member of this room.
    #[error("player {0} not in game {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// The room's actor has stopped or its command channel is full.
    #[error("Game {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// Returns `true` for refusals of a create, join or match request.
    /// Their text is meant for the requesting player.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::RoomFull(_)
                | Self::NameTaken(_)
                | Self::InvalidName { .. }
                | Self::NotWaiting(_)
                | Self::AlreadyInRoom(..)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_errors_read_as_sentences() {
        assert_eq!(RoomError::NotFound("zzz".into()).to_string(), "Game not found");
        assert_eq!(
            RoomError::NameTaken("alice".into()).to_string(),
            "Name \"alice\" is already taken in this game"
        );
        assert_eq!(
            RoomError::InvalidName { max: 15 }.to_string(),
            "Name must be between 1 and 15 characters"
        );
        let code = RoomCode::parse("ABCDEF").unwrap();
        assert_eq!(
            RoomError::AlreadyInRoom(PlayerId(3), code).to_string(),
            "You are already in game ABCDEF"
        );
    }

    #[test]
    fn test_is_admission_classifies_variants() {
        let code = RoomCode::parse("ABCDEF").unwrap();
        assert!(RoomError::RoomFull(code.clone()).is_admission());
        assert!(RoomError::NotWaiting(code.clone()).is_admission());
        assert!(RoomError::AlreadyInRoom(PlayerId(1), code.clone()).is_admission());
        assert!(!RoomError::Unavailable(code.clone()).is_admission());
        assert!(!RoomError::NotInRoom(PlayerId(1), code).is_admission());
    }
}

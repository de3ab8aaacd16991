use std::fmt;

#[derive(Debug)]
pub enum MahjongError {
    /// An action referenced a seat outside 0..4 or a tile the player does not hold.
    InvalidAction { message: String },
    /// A transition was requested that the current game state does not permit.
    InvalidState { message: String },
    /// The wall ran out while a draw was required.
    WallExhausted,
}

impl fmt::Display for MahjongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MahjongError::InvalidAction { message } => {
                write!(f, "Invalid action: {}", message)
            }
            MahjongError::InvalidState { message } => {
                write!(f, "Invalid state: {}", message)
            }
            MahjongError::WallExhausted => write!(f, "Wall exhausted"),
        }
    }
}

impl std::error::Error for MahjongError {}

pub type EngineResult<T> = Result<T, MahjongError>;

impl MahjongError {
    pub fn invalid_action(message: impl Into<String>) -> Self {
        MahjongError::InvalidAction {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        MahjongError::InvalidState {
            message: message.into(),
        }
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the AlphaZero system
#[derive(Error, Debug)]
pub enum ZeroError {
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The evaluator put zero mass on every legal action.
    ///
    /// Search recovers from this locally with a uniform prior.
    #[error("Evaluator assigned zero probability to all {legal} legal actions")]
    DegenerateMask { legal: usize },

    /// A game ran past the ply cap. Self-play and the arena score it as a draw.
    #[error("Game did not terminate within {max_ply} plies")]
    NonTerminatingGame { max_ply: usize },

    /// Selection produced an action outside the legal mask. Never recovered.
    #[error("Action {action} is not legal at ply {ply}")]
    InvalidAction { action: usize, ply: usize },

    #[error("Cannot search from a terminal state")]
    TerminalState,

    #[error("No legal actions available")]
    NoLegalActions,

    #[error("Evaluator failed: {0}")]
    Evaluator(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Replay buffer is empty")]
    EmptyReplayBuffer,

    #[error("Checkpoint {path:?}: {message}")]
    Checkpoint { path: PathBuf, message: String },
}

impl ZeroError {
    /// Build a checkpoint error from any displayable cause.
    pub fn checkpoint(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        ZeroError::Checkpoint {
            path: path.into(),
            message: cause.to_string(),
        }
    }
}

/// Convenience Result type for AlphaZero operations
pub type Result<T> = std::result::Result<T, ZeroError>;

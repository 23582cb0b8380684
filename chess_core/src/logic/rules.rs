use thiserror::Error;

/// Why a move request was turned down. Rejection never changes the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Unknown square: {0}")]
    InvalidSquare(String),
    #[error("Malformed move: {0}")]
    MalformedMove(String),
    #[error("Illegal move.")]
    IllegalMove,
    /// The side to move has nothing legal left: the game is already decided.
    #[error("No legal move is available.")]
    NoLegalMoves,
}

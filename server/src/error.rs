use thiserror::Error;

/// Rejection reasons for client intents.
///
/// The `Display` text is sent verbatim to the originating connection as an
/// `ErrorMessage`, so it is written for players rather than operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Room not found.")]
    RoomNotFound,

    #[error("Player not in room.")]
    PlayerNotFound,

    #[error("Not allowed: {0}")]
    Unauthorized(&'static str),

    #[error("Game has already started. Cannot join.")]
    GameAlreadyStarted,

    #[error("Need at least 2 players to start.")]
    NotEnoughPlayers,

    #[error("Room is full (max {0} players).")]
    RoomFull(usize),

    #[error("Player name already taken in this room.")]
    DuplicateName,

    #[error("Invalid bid amount.")]
    InvalidBid,

    #[error("No active auction.")]
    NoActiveAuction,

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(&'static str),

    #[error("Invalid trade: {0}")]
    InvalidTradeState(&'static str),

    #[error("{0}")]
    PreconditionNotMet(&'static str),
}

pub type GameResult<T> = Result<T, GameError>;

use teloxide::types::ChatId;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum GameError {
    #[error("a game is already running in chat {0}")]
    AlreadyRunning(ChatId),
}

/// Failures while fetching the content of a game.
#[derive(Debug, Error)]
pub(crate) enum ContentError {
    /// The content source refused the request, the message is meant for
    /// the players.
    #[error("{0}")]
    Rejected(String),
    #[error("malformed content: {0}")]
    Malformed(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

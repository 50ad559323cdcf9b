use thiserror::Error;

/// Rejections raised when committing a subtitle edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} time \"{value}\" is not in MM:SS format")]
    InvalidFormat { field: &'static str, value: String },

    #[error("start time {start} must be before end time {end}")]
    StartNotBeforeEnd { start: String, end: String },

    #[error("no subtitle at row {0}")]
    NoSuchRow(usize),

    #[error("subtitle at row {0} is not being edited")]
    NotEditing(usize),
}

/// Failures reported by a media element. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("playback was not allowed to start: {0}")]
    Autoplay(String),

    #[error("media could not be decoded: {0}")]
    Decode(String),

    #[error("unsupported media: {0}")]
    Unsupported(String),

    #[error("no media loaded")]
    NotLoaded,
}

/// Errors talking to the rendering backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected the request: {0}")]
    Rejected(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

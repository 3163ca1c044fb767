use thiserror::Error;

/// Errors surfaced by the remote operations client.
///
/// Validation errors never reach this type; they are caught before any
/// network call. Backend-reported failures are not errors either: they come
/// back as a normal `ApiOutcome` with `success == false`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing access token. Please log in again.")]
    MissingToken,

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Log stream error: {0}")]
    LogStream(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

use thiserror::Error;

/// Failure of a single decoding strategy, or of all of them.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is blank")]
    Blank,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid literal at byte {offset}: {message}")]
    Literal { offset: usize, message: String },

    #[error("no decoder accepted the payload (json: {json}; literal: {literal})")]
    Exhausted { json: String, literal: String },
}

impl DecodeError {
    pub fn literal(offset: usize, message: impl Into<String>) -> Self {
        Self::Literal {
            offset,
            message: message.into(),
        }
    }
}

/// Why a match record contributed no rows to the flattened table.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("players payload is missing")]
    MissingPayload,

    #[error(transparent)]
    Undecodable(#[from] DecodeError),

    #[error("decoded payload has unexpected shape: {0}")]
    UnexpectedShape(&'static str),
}

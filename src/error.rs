use thiserror::Error;

/// Failures while turning a timestamp token into display text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// The token grammar matched but its fields could not be read back.
    #[error("malformed timestamp token `{0}`")]
    MalformedToken(String),

    #[error("unsupported timestamp style flag `{0}`")]
    UnsupportedStyle(char),

    /// The epoch does not fit in a calendar date chrono can represent.
    #[error("timestamp {0} is outside the representable range")]
    OutOfRange(i64),
}

pub type TimestampResult<T> = Result<T, TimestampError>;

pub type DotResult<T> = Result<T, DotError>;

#[derive(thiserror::Error, Debug)]
pub enum DotError {
    /// The supplied source is not the expected media type (e.g. bytes that
    /// do not sniff as an image). Recovered at the acquisition boundary.
    #[error("input rejected: {0}")]
    InputRejected(String),

    /// The media decoder failed after the source was accepted.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DotError {
    pub fn input_rejected(msg: impl Into<String>) -> Self {
        Self::InputRejected(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

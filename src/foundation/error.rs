pub type HatfitResult<T> = Result<T, HatfitError>;

#[derive(thiserror::Error, Debug)]
pub enum HatfitError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HatfitError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Decode failures are terminal for the request that produced the bytes.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

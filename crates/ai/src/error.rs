use thiserror::Error;

/// Classified failure of a text-generation call.
///
/// `Clone` so a single in-flight failure can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The remote explicitly asked us to slow down (HTTP 429).
    #[error("generation throttled (status {status}): {message}")]
    Throttled { status: u16, message: String },

    /// Any other non-success answer (auth, 4xx, 5xx).
    #[error("generation failed (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// The request never produced an HTTP answer (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl GenerationError {
    pub fn throttled(status: u16, message: impl Into<String>) -> Self {
        Self::Throttled {
            status,
            message: message.into(),
        }
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, GenerationError::Throttled { .. })
    }

    /// HTTP status reported by the remote, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GenerationError::Throttled { status, .. } | GenerationError::Remote { status, .. } => {
                Some(*status)
            }
            GenerationError::Transport(_) | GenerationError::Decode(_) => None,
        }
    }
}

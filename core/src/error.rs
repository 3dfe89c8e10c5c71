use sonar_protocols::dns::EncodeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The caller cancelled before any network work started.
    #[error("resolution was cancelled")]
    Cancelled,

    #[error("invalid resolve options: {0}")]
    InvalidOptions(String),

    #[error("failed to build query: {0}")]
    Query(#[from] EncodeError),

    /// Socket or adapter failure raised by the transport.
    #[error("transport failure: {0:#}")]
    Transport(#[source] anyhow::Error),
}

impl ResolveError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::Cancelled)
    }
}

use thiserror::Error;

/// Errors surfaced by the remote media host.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The referenced object does not exist on the media host.
    #[error("media object not found: {0}")]
    NotFound(String),
    /// The payload was rejected before upload (wrong content type, empty body).
    #[error("unsupported media payload: {0}")]
    Unsupported(String),
    /// Transport-level failure talking to the media host.
    #[error("media host request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The media host answered with something we could not interpret.
    #[error("unexpected media host response: {0}")]
    Protocol(String),
}

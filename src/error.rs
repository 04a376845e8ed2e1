use thiserror::Error;

/// Fatal conditions that abort the process.
///
/// Everything else — categorized handshake failures, benign read/send
/// errors — is handled entirely within the component that expects it and
/// never becomes a `ProberError`.
#[derive(Debug, Error)]
pub enum ProberError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("packet capture error: {0}")]
    Capture(String),

    #[error("fatal error: {0}")]
    Fatal(String),
}

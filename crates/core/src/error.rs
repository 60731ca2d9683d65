use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data collection error: {0}")]
    DataCollection(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("io error: {0}")]
    Io(String),
}

impl BridgeError {
    /// Errors that only invalidate the document being processed. Everything
    /// else aborts the run.
    pub fn is_document_scoped(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::UnsupportedFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

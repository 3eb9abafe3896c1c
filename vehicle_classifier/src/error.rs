use thiserror::Error;

/// Failure of a single acquisition or classification attempt.
///
/// `Display` yields the message surfaced to the user, so `Backend` renders the
/// backend's own message verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("Failed to load example image: {0}")]
    AcquisitionFetch(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("Failed to decode prediction response: {0}")]
    Decoding(String),
}

impl ClassifyError {
    /// Message used when a non-2xx response carries no usable `detail`.
    pub fn from_status(status: u16) -> Self {
        ClassifyError::Backend {
            status,
            message: format!("HTTP error! status: {}", status),
        }
    }
}

impl From<reqwest::Error> for ClassifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassifyError::Network(format!("request timed out: {}", err))
        } else {
            ClassifyError::Network(err.to_string())
        }
    }
}

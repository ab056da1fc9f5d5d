use crate::rates::RateError;

/// Failure while retrieving raw observations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Bad status code: {status}")]
    BadStatus { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid observation in response: {0}")]
    InvalidObservation(#[from] RateError),

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Server-side failures, throttling and transport errors are worth
    /// another attempt. Other client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::BadStatus { status, .. } => *status >= 500 || *status == 429,
            FetchError::Transport(_) => true,
            _ => false,
        }
    }
}

//! Text generation backend errors

use thiserror::Error;

/// Errors that can occur while talking to a text generation backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Non-success HTTP status
    #[error("API error ({status_code}): {message}")]
    ApiError { message: String, status_code: u16 },

    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    /// The body was not a `{response, done}` object
    #[error("Invalid response from model: {message}")]
    InvalidResponse { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request cancelled")]
    Cancelled,

    /// Every enrichment call failed; carries the last failure
    #[error("All {attempted} enrichment calls failed, last error: {last}")]
    AllFailed { attempted: usize, last: String },
}

impl BackendError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BackendError::ApiError {
            message: "model not found".to_string(),
            status_code: 404,
        };
        assert_eq!(err.to_string(), "API error (404): model not found");
        assert_eq!(
            BackendError::TimeoutError { seconds: 120 }.to_string(),
            "Request timed out after 120 seconds"
        );
    }
}

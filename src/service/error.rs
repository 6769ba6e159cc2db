//! Error taxonomy for the `Convert` operation.

use thiserror::Error;

/// Failure returned by any [`Handler`](super::Handler) in the chain.
///
/// Decorators hand these back unchanged; only the core handler and the
/// transport adapters create them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request payload is empty, malformed or failed decoding.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Well-formed input that could not be rendered.
    #[error("conversion failed: {0}")]
    ConversionFailure(String),

    /// The caller cancelled the call before the core handler finished.
    #[error("call cancelled")]
    Cancelled,

    /// The call's deadline passed before the core handler finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Stable, label-friendly classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    ConversionFailure,
    Cancelled,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ConversionFailure => "conversion_failure",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        ServiceError::ConversionFailure(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidInput(_) => ErrorKind::InvalidInput,
            ServiceError::ConversionFailure(_) => ErrorKind::ConversionFailure,
            ServiceError::Cancelled => ErrorKind::Cancelled,
            ServiceError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    /// True for failures caused by the call context rather than the document.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ServiceError::Cancelled | ServiceError::DeadlineExceeded)
    }

    /// True when the caller is at fault and should not expect a retry to help.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(ServiceError::invalid_input("x").kind().as_str(), "invalid_input");
        assert_eq!(ServiceError::conversion("x").kind().as_str(), "conversion_failure");
        assert_eq!(ServiceError::Cancelled.kind().as_str(), "cancelled");
        assert_eq!(ServiceError::DeadlineExceeded.kind().to_string(), "deadline_exceeded");
    }

    #[test]
    fn test_classification() {
        assert!(ServiceError::Cancelled.is_cancellation());
        assert!(ServiceError::DeadlineExceeded.is_cancellation());
        assert!(!ServiceError::conversion("bad").is_cancellation());
        assert!(ServiceError::invalid_input("empty").is_client_error());
        assert!(!ServiceError::conversion("bad").is_client_error());
    }
}

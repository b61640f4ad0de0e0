//! Error kinds for tinyagent operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to tell a model that misbehaved apart from a
/// backend that is down or a tool that refused its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Generation errors
    // =========================================================================
    /// The generation service returned an error or an unusable response
    InferenceFailed,

    /// The backend is not ready (e.g. the hosted model is still loading)
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    /// Token missing or rejected
    AuthenticationFailed,

    /// Transport-level failure talking to the backend
    NetworkFailed,

    // =========================================================================
    // Tool loop errors
    // =========================================================================
    /// Generated text contained a tool call that could not be parsed
    ParseFailed,

    /// Invalid argument passed to a function or tool
    InvalidArgument,

    /// The model asked for a tool that is not registered
    ToolUnknown,

    /// A registered tool failed while executing
    ToolFailed,

    /// The loop ran out of iterations without reaching a final answer
    IterationLimitExceeded,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // Generation
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",

            // Tool loop
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::ToolUnknown => "ToolUnknown",
            ErrorKind::ToolFailed => "ToolFailed",
            ErrorKind::IterationLimitExceeded => "IterationLimitExceeded",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailed | ErrorKind::RateLimited | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::ToolUnknown.to_string(), "ToolUnknown");
        assert_eq!(ErrorKind::InferenceFailed.to_string(), "InferenceFailed");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::ProviderUnavailable.is_retryable());
        assert!(!ErrorKind::ParseFailed.is_retryable());
        assert!(!ErrorKind::ToolUnknown.is_retryable());
        assert!(!ErrorKind::IterationLimitExceeded.is_retryable());
    }
}

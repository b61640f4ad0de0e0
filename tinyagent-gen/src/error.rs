//! Generation error helpers
//!
//! Re-exports tinyagent-error and maps backend failures onto it.

pub use tinyagent_error::{Error, ErrorKind, ErrorStatus, Result};

/// Map a non-success HTTP status onto an error kind.
///
/// 503 is what the hosted endpoint answers while a cold model is loading,
/// so it is reported as temporarily unavailable rather than a failure.
/// Gateway errors in front of the backend are failures, but retryable.
pub fn http_status(operation: &'static str, status: u16, body: impl Into<String>) -> Error {
    let body = body.into();
    let kind = match status {
        401 | 403 => ErrorKind::AuthenticationFailed,
        429 => ErrorKind::RateLimited,
        503 => ErrorKind::ProviderUnavailable,
        _ => ErrorKind::InferenceFailed,
    };
    let message = if body.is_empty() {
        format!("backend returned HTTP {}", status)
    } else {
        body
    };
    let err = Error::new(kind, message)
        .with_operation(operation)
        .with_context("status", status.to_string());
    match status {
        502 | 504 => err.temporary(),
        _ => err,
    }
}

/// Wrap a transport error
pub fn network(operation: &'static str, err: reqwest::Error) -> Error {
    Error::new(ErrorKind::NetworkFailed, err.to_string())
        .with_operation(operation)
        .set_source(err)
}

/// Wrap a response body that could not be decoded
pub fn decode(operation: &'static str, err: reqwest::Error) -> Error {
    Error::new(ErrorKind::ParseFailed, format!("undecodable response: {}", err))
        .with_operation(operation)
        .set_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(http_status("op", 401, "").kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(http_status("op", 403, "").kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(http_status("op", 429, "").kind(), ErrorKind::RateLimited);
        assert_eq!(http_status("op", 500, "boom").kind(), ErrorKind::InferenceFailed);
        assert!(!http_status("op", 500, "boom").is_retryable());

        let err = http_status("hf_inference::generate", 503, "Model gpt2 is currently loading");
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(err.is_retryable());
        assert_eq!(err.message(), "Model gpt2 is currently loading");
    }

    #[test]
    fn test_http_status_empty_body() {
        let err = http_status("completions::generate", 502, "");
        assert_eq!(err.message(), "backend returned HTTP 502");
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert_eq!(err.status(), ErrorStatus::Temporary);
        assert_eq!(err.context()[0], ("status", "502".to_string()));
    }
}

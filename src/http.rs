//! Shared HTTP plumbing for the source clients (blocking `ureq`).

use serde::de::DeserializeOwned;
use std::io;
use std::time::Duration;

use crate::error::FetchError;
use crate::normalize::abbreviate;

pub const USER_AGENT: &str = concat!("music-enrich/", env!("CARGO_PKG_VERSION"));

/// Agent whose every request is bounded by `timeout`.
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Map a `ureq` failure to the per-unit taxonomy: HTTP status and transport
/// errors are `Load`, except transport timeouts.
pub fn classify_error(err: ureq::Error, timeout: Duration) -> FetchError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            FetchError::Load(format!("HTTP {}: {}", code, abbreviate(body.trim(), 200)))
        }
        ureq::Error::Transport(transport) => {
            let from_io = std::error::Error::source(&transport)
                .and_then(|e| e.downcast_ref::<io::Error>())
                .map(is_io_timeout)
                .unwrap_or(false);
            if from_io || transport.to_string().to_ascii_lowercase().contains("timed out") {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Load(transport.to_string())
            }
        }
    }
}

pub fn is_io_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

/// Decode a JSON body. A read that stalls past the deadline is a timeout;
/// anything else is a malformed payload.
pub fn decode_json<T: DeserializeOwned>(
    response: ureq::Response,
    timeout: Duration,
) -> Result<T, FetchError> {
    response.into_json::<T>().map_err(|e| {
        if is_io_timeout(&e) {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Parse(e.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureTag;

    #[test]
    fn test_status_error_is_load_error() {
        let response = ureq::Response::new(503, "Service Unavailable", "try later").unwrap();
        let err = classify_error(ureq::Error::Status(503, response), Duration::from_secs(1));
        assert_eq!(err.tag(), FailureTag::LoadError);
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_decode_json_malformed_is_parse_error() {
        let response = ureq::Response::new(200, "OK", "<html>not json</html>").unwrap();
        let result: Result<serde_json::Value, _> = decode_json(response, Duration::from_secs(1));
        assert_eq!(result.unwrap_err().tag(), FailureTag::ParseError);
    }

    #[test]
    fn test_io_timeout_kinds() {
        assert!(is_io_timeout(&io::Error::new(io::ErrorKind::TimedOut, "t")));
        assert!(is_io_timeout(&io::Error::new(io::ErrorKind::WouldBlock, "t")));
        assert!(!is_io_timeout(&io::Error::new(io::ErrorKind::ConnectionReset, "r")));
    }
}

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::ClientError;

/// Uniform outcome of a client operation: either the payload or an error
/// message, never both and never neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult<T> {
    Success(T),
    Failure(String),
}

impl<T> ApiResult<T> {
    /// Collapses an internal outcome into the caller-facing shape.
    pub fn build(operation: &str, outcome: Result<T, ClientError>) -> Self {
        match outcome {
            Ok(payload) => ApiResult::Success(payload),
            Err(err) => {
                debug!(operation, error = %err, "sweetistics operation failed");
                ApiResult::Failure(err.to_string())
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            ApiResult::Success(payload) => Some(payload),
            ApiResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResult::Success(_) => None,
            ApiResult::Failure(message) => Some(message),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ApiResult::Success(payload) => Ok(payload),
            ApiResult::Failure(message) => Err(message),
        }
    }
}

#[derive(Serialize)]
struct SuccessRepr<'a, T> {
    success: bool,
    #[serde(flatten)]
    payload: &'a T,
}

#[derive(Serialize)]
struct FailureRepr<'a> {
    success: bool,
    error: &'a str,
}

impl<T: Serialize> Serialize for ApiResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ApiResult::Success(payload) => SuccessRepr {
                success: true,
                payload,
            }
            .serialize(serializer),
            ApiResult::Failure(error) => FailureRepr {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tweet::{Posted, Timeline};

    #[test]
    fn test_success_serializes_payload_without_error() {
        let result = ApiResult::build(
            "tweet",
            Ok(Posted {
                tweet_id: Some("9".to_string()),
            }),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "tweetId": "9"}));
    }

    #[test]
    fn test_failure_serializes_error_without_payload() {
        let result: ApiResult<Timeline> = ApiResult::build("thread", Err(ClientError::Http(500)));
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("HTTP 500"));
        assert!(result.payload().is_none());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "HTTP 500"})
        );
    }

    #[test]
    fn test_failure_is_not_logged_at_warn() {
        let logged = crate::logging::capture_warnings(|| {
            let result: ApiResult<Timeline> =
                ApiResult::build("search", Err(ClientError::Http(429)));
            assert_eq!(result.error(), Some("HTTP 429"));
        });
        assert_eq!(logged, "");
    }

    #[test]
    fn test_into_result() {
        let ok: ApiResult<u8> = ApiResult::Success(1);
        assert_eq!(ok.into_result(), Ok(1));
        let err: ApiResult<u8> = ApiResult::Failure("nope".to_string());
        assert_eq!(err.into_result(), Err("nope".to_string()));
    }
}

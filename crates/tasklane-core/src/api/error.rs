use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::transport::TransportError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication required but no token available")]
    AuthenticationRequired,

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &[u8]) -> String {
        let text = String::from_utf8_lossy(body);
        if text.len() <= MAX_ERROR_BODY_LENGTH {
            text.into_owned()
        } else {
            let cut: String = text.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, body.len())
        }
    }

    /// Build a rejection from a non-2xx response: the body's `detail` if it
    /// has one, otherwise the status line.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let message = detail_message(body).unwrap_or_else(|| status.to_string());
        ApiError::Rejected { status, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

/// Extract the `detail` field from a JSON error body.
///
/// A string detail is used as-is. A list (validation errors) is joined by
/// each entry's `msg`.
pub(crate) fn detail_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .map(|item| match item.get("msg").and_then(Value::as_str) {
                    Some(msg) => msg.to_string(),
                    None => item.to_string(),
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let body = br#"{"detail":"Task not found"}"#;
        assert_eq!(detail_message(body).as_deref(), Some("Task not found"));
    }

    #[test]
    fn test_detail_validation_list() {
        let body = br#"{"detail":[{"loc":["body","title"],"msg":"field required"},{"msg":"too long"}]}"#;
        assert_eq!(
            detail_message(body).as_deref(),
            Some("field required; too long")
        );
    }

    #[test]
    fn test_detail_absent_or_not_json() {
        assert_eq!(detail_message(br#"{"message":"nope"}"#), None);
        assert_eq!(detail_message(b"<html>502</html>"), None);
        assert_eq!(detail_message(b""), None);
    }

    #[test]
    fn test_from_status_falls_back_to_status_line() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, b"<html></html>");
        assert_eq!(err.to_string(), "502 Bad Gateway");
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn test_unauthorized_is_detected() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, br#"{"detail":"Token has expired"}"#);
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Token has expired");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(long.as_bytes());
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
        assert_eq!(ApiError::truncate_body(b"short"), "short");
    }
}

//! Classification of non-2xx API responses
//!
//! The API is a FastAPI service: errors carry a `detail` field that is a
//! plain string, an object with a `message` (plan limit errors), or a list
//! of validation errors each with a `msg`.

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::FailureKind;

/// Classify a non-2xx status code.
pub fn classify_status(status: u16) -> FailureKind {
    match status {
        400 | 422 => FailureKind::BadRequest,
        401 | 403 => FailureKind::AuthRequired,
        402 => FailureKind::QuotaExceeded,
        404 => FailureKind::NotFound,
        413 => FailureKind::PayloadTooLarge,
        429 => FailureKind::RateLimited,
        408 | 500..=599 => FailureKind::ServerError,
        _ => FailureKind::Other,
    }
}

/// Pull the human-readable detail out of an error body.
///
/// Returns `None` for empty or non-JSON bodies rather than echoing HTML
/// error pages from a proxy.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail").or_else(|| value.get("error"))?;
    match detail {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_owned),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

/// `Retry-After` in seconds, when sent as a delay.
pub fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn classify_quota_and_rate_limit_apart() {
        assert_eq!(classify_status(402), FailureKind::QuotaExceeded);
        assert_eq!(classify_status(429), FailureKind::RateLimited);
    }

    #[test]
    fn classify_auth_statuses() {
        assert_eq!(classify_status(401), FailureKind::AuthRequired);
        assert_eq!(classify_status(403), FailureKind::AuthRequired);
    }

    #[test]
    fn classify_client_errors() {
        assert_eq!(classify_status(400), FailureKind::BadRequest);
        assert_eq!(classify_status(422), FailureKind::BadRequest);
        assert_eq!(classify_status(404), FailureKind::NotFound);
        assert_eq!(classify_status(413), FailureKind::PayloadTooLarge);
    }

    #[test]
    fn classify_server_errors() {
        for status in [408, 500, 502, 503, 504] {
            assert_eq!(classify_status(status), FailureKind::ServerError, "{status}");
        }
    }

    #[test]
    fn classify_unknown_is_other() {
        assert_eq!(classify_status(418), FailureKind::Other);
    }

    #[test]
    fn detail_string() {
        let body = r#"{"detail":"Unsupported file type '.webm'. Allowed: mp4, mov, avi, mkv"}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("Unsupported file type '.webm'. Allowed: mp4, mov, avi, mkv")
        );
    }

    #[test]
    fn detail_object_uses_message() {
        let body = r#"{"detail":{"error":"plan_limit_exceeded","message":"You have used 99.0 of your 100 monthly minutes.","plan_tier":"free"}}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("You have used 99.0 of your 100 monthly minutes.")
        );
    }

    #[test]
    fn detail_validation_list_is_joined() {
        let body = r#"{"detail":[{"loc":["query","segment_duration"],"msg":"ensure this value is less than or equal to 3600"},{"loc":["body","file"],"msg":"field required"}]}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("ensure this value is less than or equal to 3600; field required")
        );
    }

    #[test]
    fn detail_missing_or_not_json() {
        assert_eq!(extract_detail(""), None);
        assert_eq!(extract_detail("<html>502 Bad Gateway</html>"), None);
        assert_eq!(extract_detail(r#"{"status":"error"}"#), None);
    }

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        assert_eq!(retry_after(&headers), Some(60));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }
}

//! Error types for gateway requests

use std::fmt;

/// What a non-2xx status means to the caller.
///
/// Uploads need to tell quota exhaustion, rate limiting and auth problems
/// apart to show the right message; the status code alone decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 400, 422: the server refused the input
    BadRequest,
    /// 401, 403: not signed in or not allowed
    AuthRequired,
    /// 402: monthly plan minutes exhausted
    QuotaExceeded,
    /// 404
    NotFound,
    /// 413
    PayloadTooLarge,
    /// 429: per-minute request limit for the plan
    RateLimited,
    /// 408, 5xx
    ServerError,
    Other,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::BadRequest => "bad_request",
            FailureKind::AuthRequired => "auth_required",
            FailureKind::QuotaExceeded => "quota_exceeded",
            FailureKind::NotFound => "not_found",
            FailureKind::PayloadTooLarge => "payload_too_large",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ServerError => "server_error",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors from gateway requests.
///
/// Payloads are owned strings so the error is `Clone`: the upload pipeline
/// keeps it as the failure reason of an item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No response at all (connect refused, DNS, timeout, reset).
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The server answered with a non-2xx status other than a recoverable 401.
    #[error("request failed with status {status} ({kind}){}", detail_suffix(.detail))]
    RequestFailed {
        status: u16,
        kind: FailureKind,
        detail: Option<String>,
        /// Seconds from `Retry-After`, when the server sent one
        retry_after: Option<u64>,
    },

    /// 401 with no session to recover, or 401 again after the replay.
    #[error("authentication expired")]
    AuthExpired,

    /// The refresh credential was rejected; the session has been cleared.
    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    /// The refresh endpoint could not be reached; the session was kept.
    #[error("session refresh unavailable: {0}")]
    RefreshUnavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    /// A file part could not be opened for sending.
    #[error("could not read payload: {0}")]
    Payload(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

impl Error {
    /// HTTP status for server-reported failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            Error::AuthExpired => Some(401),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Error::RequestFailed { kind, .. } => Some(*kind),
            Error::AuthExpired => Some(FailureKind::AuthRequired),
            _ => None,
        }
    }

    /// Whether the user has to sign in again before anything will work.
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::AuthExpired | Error::RefreshFailed(_))
    }

    /// Whether the failure is about connectivity rather than the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Error::TransportUnavailable(_) | Error::RefreshUnavailable(_)
        )
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

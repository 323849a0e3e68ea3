//! API routes used by the session layer
//!
//! Paths are relative to the configured API base URL.

/// Base URL used when neither config nor environment provide one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Exchanges a refresh token for a new credential pair.
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Returns the authenticated user's profile.
pub const PROFILE_PATH: &str = "/api/v1/auth/me";

/// Join a base URL and an absolute API path without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), path)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("http://localhost:8000/", REFRESH_PATH),
            "http://localhost:8000/api/v1/auth/refresh"
        );
    }

    #[test]
    fn endpoint_inserts_missing_slash() {
        assert_eq!(
            endpoint("https://api.videosplit.app", "api/v1/split"),
            "https://api.videosplit.app/api/v1/split"
        );
    }
}

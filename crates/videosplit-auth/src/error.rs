//! Error types for session credential operations

/// Errors from credential storage and token refresh.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response from the auth server (DNS, connect, timeout).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The refresh endpoint answered but the exchange could not complete.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The refresh credential was rejected; the session cannot be recovered.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The auth server is overloaded or down (408, 429, 5xx).
    #[error("auth server unavailable: {0}")]
    Unavailable(String),

    #[error("session file parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Unavailable(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

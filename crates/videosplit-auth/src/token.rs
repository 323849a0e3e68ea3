//! Refresh endpoint client
//!
//! Trades a refresh token for a new credential pair. The server may rotate
//! the refresh token or hand the same one back; either way the caller stores
//! the returned pair as a whole.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::CredentialPair;
use crate::endpoints::{REFRESH_PATH, endpoint};
use crate::error::{Error, Result};

/// Response from the refresh endpoint.
///
/// `expires_in` is the access token lifetime in seconds.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "bearer".into()
}

impl TokenResponse {
    pub fn into_pair(self) -> CredentialPair {
        CredentialPair::new(self.access_token, self.refresh_token)
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Refresh an access token using a refresh token.
///
/// 400/401/403 mean the refresh token is invalid, expired or belongs to a
/// deactivated user. 408/429/5xx mean the auth server could not answer right
/// now and the same refresh token may still work later.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
) -> Result<TokenResponse> {
    let url = endpoint(base_url, REFRESH_PATH);
    debug!(%url, "requesting token refresh");

    let response = client
        .post(&url)
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        return Err(match status.as_u16() {
            400 | 401 | 403 => {
                Error::InvalidCredentials(format!("refresh token rejected ({status}): {body}"))
            }
            408 | 429 | 500..=599 => {
                Error::Unavailable(format!("token refresh returned {status}: {body}"))
            }
            _ => Error::TokenExchange(format!("token refresh returned {status}: {body}")),
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
}

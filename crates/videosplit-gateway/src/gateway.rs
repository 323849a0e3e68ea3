//! Authenticated requests with coordinated session recovery
//!
//! The gateway owns the refresh flight. Only its refresh routine writes the
//! credential pair; everything else reads it through the store.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use videosplit_auth::{CredentialStore, DEFAULT_BASE_URL, PROFILE_PATH, Profile, endpoint};

use crate::classify::{classify_status, extract_detail, retry_after};
use crate::error::{Error, Result};
use crate::flight::SingleFlight;
use crate::logout::LogoutHook;
use crate::request::{RequestBody, RequestOptions};

/// Detail recorded when an error response body could not be read.
pub const NO_BODY: &str = "<no body>";

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Attempts against the refresh endpoint when it is unreachable
    pub refresh_attempts: u32,
    /// Fixed pause between refresh attempts
    pub refresh_backoff: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            refresh_attempts: 3,
            refresh_backoff: Duration::from_millis(250),
        }
    }
}

/// Result of one refresh flight, shared by every request waiting on it.
#[derive(Debug, Clone)]
enum RefreshOutcome {
    Refreshed(Secret<String>),
    /// Refresh credential rejected; session cleared and logout fired
    Rejected(String),
    /// Refresh endpoint unreachable; session kept
    Unavailable(String),
}

impl RefreshOutcome {
    fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Refreshed(_) => "refreshed",
            RefreshOutcome::Rejected(_) => "rejected",
            RefreshOutcome::Unavailable(_) => "unavailable",
        }
    }
}

struct Inner {
    client: reqwest::Client,
    config: GatewayConfig,
    store: Arc<CredentialStore>,
    refresh: SingleFlight<RefreshOutcome>,
    logout: Arc<dyn LogoutHook>,
}

/// Session-aware HTTP client. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct SessionGateway {
    inner: Arc<Inner>,
}

impl SessionGateway {
    pub fn new(
        client: reqwest::Client,
        config: GatewayConfig,
        store: Arc<CredentialStore>,
        logout: Arc<dyn LogoutHook>,
    ) -> Self {
        info!(base_url = %config.base_url, "session gateway initialized");
        Self {
            inner: Arc::new(Inner {
                client,
                config,
                store,
                refresh: SingleFlight::new(),
                logout,
            }),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// Whether a session refresh is currently running.
    pub fn refresh_in_flight(&self) -> bool {
        self.inner.refresh.is_in_flight()
    }

    /// Send an authenticated request and return the raw response.
    ///
    /// Any status other than 401 is returned as-is. A 401 with a session is
    /// recovered through the shared refresh and replayed exactly once.
    #[instrument(skip_all, fields(method = %options.method, path = %path))]
    pub async fn request(&self, path: &str, options: &RequestOptions) -> Result<reqwest::Response> {
        let url = self.url(path, options)?;

        // Epoch before token: a refresh that lands in between is seen as new
        let epoch = self.inner.refresh.epoch();
        let token = self.inner.store.access_token().await;

        let response = self.send(url.clone(), options, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if token.is_none() {
            debug!("401 without a session, nothing to refresh");
            return Err(Error::AuthExpired);
        }

        let access = self.recover(epoch).await?;
        let replay = self.send(url, options, Some(&access)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!("replayed request rejected again, not refreshing twice");
            return Err(Error::AuthExpired);
        }
        Ok(replay)
    }

    /// Send an authenticated request and decode a 2xx JSON body.
    ///
    /// Non-2xx statuses become `Error::RequestFailed` with the server's detail.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let response = self.request(path, options).await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let kind = classify_status(status.as_u16());
            let detail = match response.text().await {
                Ok(body) => extract_detail(&body),
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e, "failed to read error body");
                    Some(NO_BODY.to_owned())
                }
            };
            metrics::counter!("videosplit_request_failures_total", "kind" => kind.label())
                .increment(1);
            debug!(status = status.as_u16(), %kind, "request failed");
            return Err(Error::RequestFailed {
                status: status.as_u16(),
                kind,
                detail,
                retry_after,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::TransportUnavailable(format!("reading response body: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Fetch the signed-in user's profile and cache it in the store.
    pub async fn fetch_profile(&self) -> Result<Profile> {
        let profile: Profile = self
            .request_json(PROFILE_PATH, &RequestOptions::get())
            .await?;
        if let Err(e) = self.inner.store.set_profile(profile.clone()).await {
            warn!(error = %e, "failed to cache profile");
        }
        Ok(profile)
    }

    fn url(&self, path: &str, options: &RequestOptions) -> Result<Url> {
        let raw = endpoint(&self.inner.config.base_url, path);
        let mut url =
            Url::parse(&raw).map_err(|e| Error::InvalidRequest(format!("bad url '{raw}': {e}")))?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                options
                    .query
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            );
        }
        Ok(url)
    }

    async fn send(
        &self,
        url: Url,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        debug!(binary = options.is_binary(), authenticated = token.is_some(), "sending request");
        let mut builder = self.inner.client.request(options.method.clone(), url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &options.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            // No explicit Content-Type: reqwest adds the boundary
            RequestBody::Multipart(body) => builder.multipart(body.to_form().await?),
        };
        builder
            .send()
            .await
            .map_err(|e| Error::TransportUnavailable(e.to_string()))
    }

    /// Wait for (or lead) the session refresh and return the new access token.
    async fn recover(&self, seen_epoch: u64) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let flight = self
            .inner
            .refresh
            .join(seen_epoch, move || refresh_session(inner));
        debug!(role = flight.role(), "access token expired, awaiting refresh");

        match flight.outcome().await {
            RefreshOutcome::Refreshed(access) => Ok(access.expose().clone()),
            RefreshOutcome::Rejected(reason) => Err(Error::RefreshFailed(reason)),
            RefreshOutcome::Unavailable(reason) => Err(Error::RefreshUnavailable(reason)),
        }
    }
}

/// The refresh flight body. Runs once per flight no matter how many wait.
///
/// Transient failures are retried with a fixed backoff; the session is kept
/// if the endpoint never answers. A rejected refresh credential clears the
/// store and fires the logout hook.
async fn refresh_session(inner: Arc<Inner>) -> RefreshOutcome {
    let outcome = run_refresh(&inner).await;
    metrics::counter!("videosplit_session_refresh_total", "outcome" => outcome.label())
        .increment(1);
    outcome
}

async fn run_refresh(inner: &Inner) -> RefreshOutcome {
    let Some(refresh) = inner.store.refresh_token().await else {
        return RefreshOutcome::Rejected("no refresh credential".into());
    };

    let attempts = inner.config.refresh_attempts.max(1);
    let mut attempt = 1;
    loop {
        match videosplit_auth::refresh_token(&inner.client, &inner.config.base_url, &refresh).await
        {
            Ok(token) => {
                let pair = token.into_pair();
                let access = Secret::new(pair.access().to_owned());
                if let Err(e) = inner.store.set_credentials(pair).await {
                    warn!(error = %e, "failed to persist refreshed credentials");
                }
                info!(attempt, "session refreshed");
                return RefreshOutcome::Refreshed(access);
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(attempt, error = %e, "session refresh failed (transient), retrying");
                tokio::time::sleep(inner.config.refresh_backoff).await;
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                warn!(attempts, error = %e, "refresh endpoint unavailable, keeping session");
                return RefreshOutcome::Unavailable(e.to_string());
            }
            Err(e) => {
                warn!(error = %e, "refresh credential rejected, signing out");
                if let Err(clear_err) = inner.store.clear().await {
                    warn!(error = %clear_err, "failed to clear session file");
                }
                let reason = e.to_string();
                inner.logout.on_logout(&reason);
                return RefreshOutcome::Rejected(reason);
            }
        }
    }
}

//! Session storage for the credential pair and cached profile
//!
//! Manages a JSON session file holding the access/refresh pair and the
//! last-known profile. All writes use atomic temp-file + rename to prevent
//! corruption on crash. A tokio Mutex serializes writers; readers take the
//! lock briefly to clone what they need.
//!
//! The pair is stored whole or not at all: `CredentialPair` can only be
//! built from both tokens, and `clear()` drops the pair and profile together.

use std::path::{Path, PathBuf};

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::profile::Profile;

/// Access and refresh token, always present together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access: Secret<String>,
    refresh: Secret<String>,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access.into()),
            refresh: Secret::new(refresh.into()),
        }
    }

    /// Bearer token for API calls.
    pub fn access(&self) -> &str {
        self.access.expose()
    }

    /// Token accepted by the refresh endpoint.
    pub fn refresh(&self) -> &str {
        self.refresh.expose()
    }
}

/// On-disk layout of the session file.
#[derive(Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    credentials: Option<StoredPair>,
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Serialize, Deserialize)]
struct StoredPair {
    access: String,
    refresh: String,
}

#[derive(Default)]
struct SessionState {
    credentials: Option<CredentialPair>,
    profile: Option<Profile>,
}

impl SessionState {
    fn from_file(file: SessionFile) -> Self {
        Self {
            credentials: file
                .credentials
                .map(|pair| CredentialPair::new(pair.access, pair.refresh)),
            profile: file.profile,
        }
    }

    fn to_file(&self) -> SessionFile {
        SessionFile {
            credentials: self.credentials.as_ref().map(|pair| StoredPair {
                access: pair.access().to_owned(),
                refresh: pair.refresh().to_owned(),
            }),
            profile: self.profile.clone(),
        }
    }
}

/// Process-wide session state backed by a file.
pub struct CredentialStore {
    path: PathBuf,
    state: Mutex<SessionState>,
}

impl CredentialStore {
    /// Load the session from the given file path.
    ///
    /// If the file doesn't exist, creates it (and its parent directory) as an
    /// empty session. Callers are then unauthenticated until a login flow
    /// stores a pair.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let file: SessionFile = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            let state = SessionState::from_file(file);
            info!(
                path = %path.display(),
                authenticated = state.credentials.is_some(),
                "loaded session"
            );
            state
        } else {
            info!(path = %path.display(), "session file not found, starting signed out");
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;
            }
            let state = SessionState::default();
            write_atomic(&path, &state.to_file()).await?;
            state
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the backing session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clone of the current credential pair.
    pub async fn credentials(&self) -> Option<CredentialPair> {
        self.state.lock().await.credentials.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.credentials.as_ref().map(|c| c.access().to_owned())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.credentials.as_ref().map(|c| c.refresh().to_owned())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.credentials.is_some()
    }

    /// Replace the credential pair and persist.
    pub async fn set_credentials(&self, pair: CredentialPair) -> Result<()> {
        let mut state = self.state.lock().await;
        state.credentials = Some(pair);
        debug!("stored credential pair");
        write_atomic(&self.path, &state.to_file()).await
    }

    /// Clone of the cached profile, if one was ever fetched.
    pub async fn profile(&self) -> Option<Profile> {
        self.state.lock().await.profile.clone()
    }

    /// Replace the cached profile and persist.
    pub async fn set_profile(&self, profile: Profile) -> Result<()> {
        let mut state = self.state.lock().await;
        debug!(user_id = profile.id, plan = profile.plan_tier.label(), "cached profile");
        state.profile = Some(profile);
        write_atomic(&self.path, &state.to_file()).await
    }

    /// Tear down the session: drops the pair and the cached profile.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = SessionState::default();
        info!("session cleared");
        write_atomic(&self.path, &state.to_file()).await
    }
}

/// Write the session file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains bearer tokens.
async fn write_atomic(path: &Path, data: &SessionFile) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}

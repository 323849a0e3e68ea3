//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! A missing file at the default location means "all defaults"; a missing
//! file that was asked for explicitly is an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use videosplit_auth::DEFAULT_BASE_URL;
use videosplit_upload::{AspectRatio, CropPosition, SplitOptions};

pub const DEFAULT_CONFIG_FILE: &str = "videosplit.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub upload: UploadConfig,
}

/// API server settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Whole-request timeout; uploads of large files need minutes
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 600,
        }
    }
}

/// Persisted session and refresh policy
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `~/` is expanded against `HOME`
    pub credentials_path: String,
    pub refresh_attempts: u32,
    pub refresh_backoff_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_path: "~/.config/videosplit/session.json".into(),
            refresh_attempts: 3,
            refresh_backoff_ms: 250,
        }
    }
}

/// Split parameters and pacing
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub segment_duration: u32,
    pub aspect_ratio: Option<String>,
    pub crop_position: String,
    pub custom_width: Option<u32>,
    pub custom_height: Option<u32>,
    pub item_delay_ms: u64,
    /// Send files to object storage by presigned URL instead of through the API
    pub direct: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            segment_duration: 60,
            aspect_ratio: None,
            crop_position: "center".into(),
            custom_width: None,
            custom_height: None,
            item_delay_ms: 500,
            direct: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like `load`, but a missing default file yields the defaults.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path == Path::new(DEFAULT_CONFIG_FILE) && !path.exists() {
            return Config::default().finish();
        }
        Config::load(path)
    }

    fn finish(mut self) -> common::Result<Self> {
        if let Ok(url) = std::env::var("VIDEOSPLIT_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var("VIDEOSPLIT_SESSION") {
            self.session.credentials_path = path;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.session.refresh_attempts == 0 {
            return Err(common::Error::Config(
                "refresh_attempts must be at least 1".into(),
            ));
        }

        self.split_options()?;
        Ok(())
    }

    /// Split options described by the `[upload]` section.
    pub fn split_options(&self) -> common::Result<SplitOptions> {
        let upload = &self.upload;
        let aspect_ratio = upload
            .aspect_ratio
            .as_deref()
            .map(|name| AspectRatio::from_parts(name, upload.custom_width, upload.custom_height))
            .transpose()
            .map_err(|e| common::Error::Config(e.to_string()))?;
        let crop_position: CropPosition = upload
            .crop_position
            .parse()
            .map_err(|e: videosplit_upload::UploadError| common::Error::Config(e.to_string()))?;

        let options = SplitOptions {
            segment_duration: upload.segment_duration,
            aspect_ratio,
            crop_position,
        };
        options
            .validate()
            .map_err(|e| common::Error::Config(e.to_string()))?;
        Ok(options)
    }

    pub fn credentials_path(&self) -> PathBuf {
        expand_home(&self.session.credentials_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn refresh_backoff(&self) -> Duration {
        Duration::from_millis(self.session.refresh_backoff_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.upload.item_delay_ms)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

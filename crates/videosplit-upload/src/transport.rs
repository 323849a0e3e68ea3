//! Upload transport
//!
//! The pipeline only needs "send this file, get a split result or a reason".
//! `GatewayTransport` does that through the session gateway, so uploads get
//! the same bearer handling and 401 recovery as every other request.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;
use videosplit_gateway::{MultipartBody, RequestOptions, SessionGateway};

use crate::error::UploadError;
use crate::options::SplitOptions;
use crate::source::SourceFile;

pub const SPLIT_PATH: &str = "/api/v1/split";

/// One produced segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub filename: String,
    /// Seconds
    pub duration: f64,
    pub size_bytes: u64,
    pub download_url: String,
}

/// Successful split job returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
    pub job_id: String,
    pub status: String,
    pub segments_count: u32,
    #[serde(default)]
    pub segments: Vec<SegmentInfo>,
    pub original_filename: String,
    /// Seconds
    pub total_duration: f64,
}

/// Sends one file and resolves to its split result.
pub trait UploadTransport: Send + Sync {
    fn upload<'a>(&'a self, file: &'a SourceFile) -> BoxFuture<'a, Result<SplitResult, UploadError>>;
}

/// Uploads through the authenticated gateway as a multipart form.
#[derive(Clone)]
pub struct GatewayTransport {
    gateway: SessionGateway,
    options: SplitOptions,
}

impl GatewayTransport {
    pub fn new(gateway: SessionGateway, options: SplitOptions) -> Self {
        Self { gateway, options }
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    fn request(&self, file: &SourceFile) -> RequestOptions {
        let body = self
            .options
            .form_fields()
            .into_iter()
            .fold(MultipartBody::new(), |body, (name, value)| body.text(name, value))
            .file(file.to_part("file"));
        RequestOptions::post()
            .query("segment_duration", self.options.segment_duration)
            .multipart(body)
    }
}

impl UploadTransport for GatewayTransport {
    fn upload<'a>(&'a self, file: &'a SourceFile) -> BoxFuture<'a, Result<SplitResult, UploadError>> {
        Box::pin(async move {
            self.options.validate()?;
            debug!(file = file.name(), size = file.len(), "uploading for split");
            let result: SplitResult = self
                .gateway
                .request_json(SPLIT_PATH, &self.request(file))
                .await?;
            Ok(result)
        })
    }
}

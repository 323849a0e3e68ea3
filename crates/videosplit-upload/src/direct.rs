//! Direct upload into object storage
//!
//! Three steps: ask the API for a presigned PUT URL, send the file straight to
//! storage, then ask the API to split the stored object. The first and last
//! steps go through the session gateway. The storage PUT carries no bearer
//! token; the presigned URL is its own credential.

use futures_util::future::BoxFuture;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use videosplit_gateway::classify::{classify_status, retry_after};
use videosplit_gateway::{Error as GatewayError, RequestOptions, SessionGateway};

use crate::error::UploadError;
use crate::options::{AspectRatio, SplitOptions};
use crate::source::SourceFile;
use crate::transport::{SplitResult, UploadTransport};

pub const INIT_UPLOAD_PATH: &str = "/api/v1/upload/init";
pub const PROCESS_UPLOAD_PATH: &str = "/api/v1/upload/process";

/// Reply to the init step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct InitUpload {
    job_id: String,
    /// Presigned PUT target
    upload_url: String,
    /// Storage key the object will live under
    r2_key: String,
}

#[derive(Debug, Serialize)]
struct ProcessUpload<'a> {
    job_id: &'a str,
    segment_duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'static str>,
    crop_position: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_height: Option<u32>,
}

impl<'a> ProcessUpload<'a> {
    fn new(job_id: &'a str, options: &SplitOptions) -> Self {
        let (custom_width, custom_height) = match options.aspect_ratio {
            Some(AspectRatio::Custom { width, height }) => (Some(width), Some(height)),
            _ => (None, None),
        };
        Self {
            job_id,
            segment_duration: options.segment_duration,
            aspect_ratio: options.aspect_ratio.map(|ratio| ratio.as_str()),
            crop_position: options.crop_position.as_str(),
            custom_width,
            custom_height,
        }
    }
}

/// Uploads by presigned URL instead of through the API server.
///
/// `client` is used for the storage PUT only and should not carry default
/// auth headers.
#[derive(Clone)]
pub struct DirectUploadTransport {
    gateway: SessionGateway,
    client: reqwest::Client,
    options: SplitOptions,
}

impl DirectUploadTransport {
    pub fn new(gateway: SessionGateway, client: reqwest::Client, options: SplitOptions) -> Self {
        Self {
            gateway,
            client,
            options,
        }
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    async fn init(&self, file: &SourceFile) -> Result<InitUpload, UploadError> {
        let body = serde_json::json!({ "filename": file.name() });
        let init = self
            .gateway
            .request_json(INIT_UPLOAD_PATH, &RequestOptions::post().json(body))
            .await?;
        Ok(init)
    }

    async fn put_object(&self, init: &InitUpload, file: &SourceFile) -> Result<(), UploadError> {
        let body = file
            .body()
            .await
            .map_err(|e| GatewayError::Payload(format!("{}: {e}", file.name())))?;
        let response = self
            .client
            .put(&init.upload_url)
            .header(CONTENT_TYPE, file.mime())
            .header(CONTENT_LENGTH, file.len())
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::TransportUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), key = %init.r2_key, "storage rejected upload");
            return Err(GatewayError::RequestFailed {
                status: status.as_u16(),
                kind: classify_status(status.as_u16()),
                detail: Some(format!("storage upload of {} failed", init.r2_key)),
                retry_after: retry_after(response.headers()),
            }
            .into());
        }
        Ok(())
    }

    async fn process(&self, job_id: &str) -> Result<SplitResult, UploadError> {
        let body = serde_json::to_value(ProcessUpload::new(job_id, &self.options))
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let result = self
            .gateway
            .request_json(PROCESS_UPLOAD_PATH, &RequestOptions::post().json(body))
            .await?;
        Ok(result)
    }
}

impl UploadTransport for DirectUploadTransport {
    fn upload<'a>(&'a self, file: &'a SourceFile) -> BoxFuture<'a, Result<SplitResult, UploadError>> {
        Box::pin(async move {
            self.options.validate()?;
            let init = self.init(file).await?;
            debug!(file = file.name(), job_id = %init.job_id, key = %init.r2_key, "sending to storage");
            self.put_object(&init, file).await?;
            self.process(&init.job_id).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CropPosition;
    use axum::Json;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{post, put};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use videosplit_auth::{CredentialPair, CredentialStore, REFRESH_PATH};
    use videosplit_gateway::{FailureKind, GatewayConfig, LogoutHook, TracingLogout};

    #[derive(Default)]
    struct Seen {
        base_url: String,
        init_filename: String,
        put_authorization: Option<String>,
        put_content_type: String,
        put_content_length: String,
        put_body: Vec<u8>,
        process: serde_json::Value,
        process_calls: usize,
    }

    type Shared = Arc<Mutex<Seen>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some("Bearer at_live")
    }

    async fn init(
        State(seen): State<Shared>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"detail": "expired"})))
                .into_response();
        }
        let filename = body["filename"].as_str().unwrap_or("").to_string();
        if filename.starts_with("nostorage") {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"detail": "Direct upload requires R2 storage to be configured"})),
            )
                .into_response();
        }
        let mut seen = seen.lock().unwrap();
        seen.init_filename = filename.clone();
        let key = format!("uploads/job-77/{filename}");
        Json(serde_json::json!({
            "job_id": "job-77",
            "upload_url": format!("{}/storage/{}", seen.base_url, filename),
            "r2_key": key,
        }))
        .into_response()
    }

    async fn storage(
        State(seen): State<Shared>,
        Path(name): Path<String>,
        headers: HeaderMap,
        body: axum::body::Bytes,
    ) -> StatusCode {
        let header_value = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        let mut seen = seen.lock().unwrap();
        seen.put_authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        seen.put_content_type = header_value(header::CONTENT_TYPE);
        seen.put_content_length = header_value(header::CONTENT_LENGTH);
        seen.put_body = body.to_vec();
        if name.starts_with("expired") {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::OK
        }
    }

    async fn process(
        State(seen): State<Shared>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"detail": "expired"})))
                .into_response();
        }
        let mut seen = seen.lock().unwrap();
        seen.process_calls += 1;
        seen.process = body;
        Json(serde_json::json!({
            "job_id": "job-77",
            "status": "completed",
            "segments_count": 1,
            "segments": [
                {"filename": "segment_000.mp4", "duration": 20.0, "size_bytes": 2048,
                 "download_url": "/api/v1/download/job-77/segment_000.mp4"}
            ],
            "original_filename": seen.init_filename,
            "total_duration": 20.0
        }))
        .into_response()
    }

    async fn refresh() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "access_token": "at_live",
            "refresh_token": "rt_live",
            "token_type": "bearer",
            "expires_in": 1800
        }))
    }

    async fn start_api() -> (String, Shared) {
        let seen = Shared::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        seen.lock().unwrap().base_url = base_url.clone();
        let app = axum::Router::new()
            .route(INIT_UPLOAD_PATH, post(init))
            .route(PROCESS_UPLOAD_PATH, post(process))
            .route("/storage/{name}", put(storage))
            .route(REFRESH_PATH, post(refresh))
            .with_state(Arc::clone(&seen));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (base_url, seen)
    }

    async fn transport(
        base_url: String,
        access: &str,
        options: SplitOptions,
        dir: &tempfile::TempDir,
    ) -> DirectUploadTransport {
        let store = Arc::new(
            CredentialStore::load(dir.path().join("session.json"))
                .await
                .unwrap(),
        );
        store
            .set_credentials(CredentialPair::new(access, "rt_old"))
            .await
            .unwrap();
        let logout: Arc<dyn LogoutHook> = Arc::new(TracingLogout);
        let client = reqwest::Client::new();
        let gateway = SessionGateway::new(
            client.clone(),
            GatewayConfig {
                base_url,
                refresh_attempts: 1,
                refresh_backoff: Duration::ZERO,
            },
            store,
            logout,
        );
        DirectUploadTransport::new(gateway, client, options)
    }

    #[tokio::test]
    async fn uploads_to_storage_without_bearer_then_processes() {
        let (base_url, seen) = start_api().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.mp4");
        std::fs::write(&path, b"direct upload payload").unwrap();

        let transport = transport(
            base_url,
            "at_live",
            SplitOptions {
                segment_duration: 20,
                aspect_ratio: Some(AspectRatio::Custom {
                    width: 1080,
                    height: 1350,
                }),
                crop_position: CropPosition::Left,
            },
            &dir,
        )
        .await;
        let file = SourceFile::open(&path).await.unwrap();
        let result = transport.upload(&file).await.unwrap();

        assert_eq!(result.job_id, "job-77");
        assert_eq!(result.original_filename, "trip.mp4");
        assert_eq!(result.segments[0].size_bytes, 2048);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.init_filename, "trip.mp4");
        assert_eq!(seen.put_authorization, None);
        assert_eq!(seen.put_content_type, "video/mp4");
        assert_eq!(seen.put_content_length, "21");
        assert_eq!(seen.put_body, b"direct upload payload");
        assert_eq!(
            seen.process,
            serde_json::json!({
                "job_id": "job-77",
                "segment_duration": 20,
                "aspect_ratio": "custom",
                "crop_position": "left",
                "custom_width": 1080,
                "custom_height": 1350
            })
        );
    }

    #[tokio::test]
    async fn preset_ratio_omits_custom_dimensions() {
        let (base_url, seen) = start_api().await;
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(base_url, "at_stale", SplitOptions::default(), &dir).await;

        let file = SourceFile::from_bytes("clip.mkv", bytes::Bytes::from_static(b"mkv"));
        transport.upload(&file).await.unwrap();

        let seen = seen.lock().unwrap();
        // Stale session was refreshed for init; storage still saw no bearer
        assert_eq!(seen.put_authorization, None);
        assert_eq!(seen.put_content_type, "video/x-matroska");
        assert_eq!(
            seen.process,
            serde_json::json!({
                "job_id": "job-77",
                "segment_duration": 60,
                "crop_position": "center"
            })
        );
    }

    #[tokio::test]
    async fn storage_not_configured_is_distinguishable() {
        let (base_url, seen) = start_api().await;
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(base_url, "at_live", SplitOptions::default(), &dir).await;

        let file = SourceFile::from_bytes("nostorage.mp4", bytes::Bytes::from_static(b"x"));
        let err = transport.upload(&file).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(err.kind(), Some(FailureKind::ServerError));
        match err {
            UploadError::Gateway(GatewayError::RequestFailed { detail, .. }) => {
                assert_eq!(
                    detail.as_deref(),
                    Some("Direct upload requires R2 storage to be configured")
                );
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        assert!(seen.lock().unwrap().put_body.is_empty());
        assert_eq!(seen.lock().unwrap().process_calls, 0);
    }

    #[tokio::test]
    async fn rejected_storage_put_skips_processing() {
        let (base_url, seen) = start_api().await;
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(base_url, "at_live", SplitOptions::default(), &dir).await;

        let file = SourceFile::from_bytes("expired.mov", bytes::Bytes::from_static(b"mov"));
        let err = transport.upload(&file).await.unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(err.kind(), Some(FailureKind::AuthRequired));
        assert!(!err.requires_login());
        assert!(err.to_string().contains("uploads/job-77/expired.mov"));
        assert_eq!(seen.lock().unwrap().process_calls, 0);
    }
}

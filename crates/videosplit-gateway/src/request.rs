//! Request descriptions the gateway can send more than once
//!
//! A 401 means the request is sent again after the refresh, so callers hand
//! the gateway a description rather than a built `reqwest::Request`. File
//! parts are reopened for every send, so a replayed upload streams from disk
//! again instead of holding the whole payload in memory.

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::{Form, Part};

use crate::error::{Error, Result};

/// Body of an outbound request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Multipart form; the boundary content type is set by reqwest.
    Multipart(MultipartBody),
}

/// Method, query and body of a gateway request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    /// Whether the body carries a binary payload.
    pub fn is_binary(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }
}

/// Where a file part's bytes come from.
#[derive(Debug, Clone)]
pub enum PartSource {
    Bytes(Bytes),
    File { path: PathBuf, len: u64 },
}

/// A file field of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub source: PartSource,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, source: PartSource) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            source,
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn len(&self) -> u64 {
        match &self.source {
            PartSource::Bytes(bytes) => bytes.len() as u64,
            PartSource::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn to_part(&self) -> Result<Part> {
        let part = match &self.source {
            PartSource::Bytes(bytes) => {
                Part::stream_with_length(reqwest::Body::from(bytes.clone()), bytes.len() as u64)
            }
            PartSource::File { path, len } => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| Error::Payload(format!("{}: {e}", path.display())))?;
                Part::stream_with_length(reqwest::Body::from(file), *len)
            }
        };
        let part = part.file_name(self.file_name.clone());
        match &self.mime {
            Some(mime) => part
                .mime_str(mime)
                .map_err(|e| Error::InvalidRequest(format!("invalid mime type '{mime}': {e}"))),
            None => Ok(part),
        }
    }
}

/// Text fields plus at most one file.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    file: Option<FilePart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((name.into(), value.to_string()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.file = Some(part);
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn file_part(&self) -> Option<&FilePart> {
        self.file.as_ref()
    }

    /// Build a fresh form for one send.
    pub(crate) async fn to_form(&self) -> Result<Form> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        if let Some(file) = &self.file {
            form = form.part(file.field.clone(), file.to_part().await?);
        }
        Ok(form)
    }
}

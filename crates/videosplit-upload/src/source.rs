//! Files handed to the queue
//!
//! A source is either a file on disk (streamed when uploaded, re-opened on a
//! replay) or an in-memory buffer.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use videosplit_gateway::{FilePart, PartSource};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Disk(PathBuf),
    Memory(Bytes),
}

/// A candidate upload: name, size and where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    len: u64,
    content: Content,
}

impl SourceFile {
    /// Read metadata for a file on disk. The contents are not read here.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            len: metadata.len(),
            content: Content::Disk(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            len: bytes.len() as u64,
            content: Content::Memory(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Extension after the last dot, as written. Empty when there is none.
    pub fn extension(&self) -> &str {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            Content::Disk(path) => Some(path),
            Content::Memory(_) => None,
        }
    }

    /// Content type sent with the multipart file field.
    pub fn mime(&self) -> &'static str {
        match self.extension().to_ascii_lowercase().as_str() {
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            "avi" => "video/x-msvideo",
            "mkv" => "video/x-matroska",
            _ => "application/octet-stream",
        }
    }

    /// Raw request body for a single-file PUT. Disk files are streamed.
    pub async fn body(&self) -> io::Result<reqwest::Body> {
        match &self.content {
            Content::Disk(path) => Ok(reqwest::Body::from(tokio::fs::File::open(path).await?)),
            Content::Memory(bytes) => Ok(reqwest::Body::from(bytes.clone())),
        }
    }

    /// Multipart part for this file under form field `field`.
    pub fn to_part(&self, field: &str) -> FilePart {
        let source = match &self.content {
            Content::Disk(path) => PartSource::File {
                path: path.clone(),
                len: self.len,
            },
            Content::Memory(bytes) => PartSource::Bytes(bytes.clone()),
        };
        FilePart::new(field, self.name.clone(), source).mime(self.mime())
    }
}

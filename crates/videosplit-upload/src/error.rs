//! Error types for the upload queue and pipeline

/// Why a file was not accepted into the queue.
///
/// Rejections apply to one file only; the rest of a batch is still enqueued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("{file_name}: unsupported file type '{extension}' (allowed: mp4, mov, avi, mkv)")]
    UnsupportedType { file_name: String, extension: String },

    #[error("{file_name}: file is {size} bytes, limit is {limit} bytes")]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },

    #[error("{file_name}: queue is full (plan allows {capacity} files)")]
    QueueFull { file_name: String, capacity: usize },
}

/// Why an accepted item ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload: {0}")]
    Validation(String),

    #[error(transparent)]
    Gateway(#[from] videosplit_gateway::Error),
}

impl UploadError {
    /// HTTP status of a server-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Gateway(e) => e.status(),
            UploadError::Validation(_) => None,
        }
    }

    pub fn kind(&self) -> Option<videosplit_gateway::FailureKind> {
        match self {
            UploadError::Gateway(e) => e.kind(),
            UploadError::Validation(_) => None,
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, UploadError::Gateway(e) if e.requires_login())
    }
}

/// Failures of a whole pipeline run, as opposed to a single item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("nothing queued to upload")]
    EmptyQueue,

    #[error("file rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("all {failed} uploads failed")]
    TotalFailure { failed: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use videosplit_gateway::{Error as GatewayError, FailureKind};

    #[test]
    fn rejection_messages_name_the_file() {
        let err = Rejection::UnsupportedType {
            file_name: "notes.txt".into(),
            extension: "txt".into(),
        };
        assert_eq!(
            err.to_string(),
            "notes.txt: unsupported file type 'txt' (allowed: mp4, mov, avi, mkv)"
        );

        let err = Rejection::QueueFull {
            file_name: "b.mp4".into(),
            capacity: 1,
        };
        assert_eq!(err.to_string(), "b.mp4: queue is full (plan allows 1 files)");
    }

    #[test]
    fn gateway_failures_keep_status_and_kind() {
        let err = UploadError::from(GatewayError::RequestFailed {
            status: 429,
            kind: FailureKind::RateLimited,
            detail: None,
            retry_after: Some(60),
        });
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.kind(), Some(FailureKind::RateLimited));
        assert!(!err.requires_login());

        assert!(UploadError::from(GatewayError::RefreshFailed("revoked".into())).requires_login());
        assert_eq!(UploadError::Validation("bad".into()).status(), None);
    }
}

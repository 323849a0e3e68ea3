//! Upload queue and sequential upload pipeline
//!
//! Files are validated into a plan-bounded queue, then uploaded one at a time
//! through a transport: a multipart POST via the session gateway, or the
//! three-step direct flow into object storage. Each item moves
//! `Queued → Uploading → Done | Failed`; a failed item never stops the batch.
//!
//! Flow:
//! 1. `UploadQueue::enqueue` checks extension, size and plan capacity per file
//! 2. `Pipeline::outcomes` walks the queue in insertion order, one upload at a time
//! 3. `Pipeline::run` folds the outcomes into a `BatchReport` with the first success

pub mod direct;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod plan;
pub mod queue;
pub mod source;
pub mod transport;

pub use direct::{DirectUploadTransport, INIT_UPLOAD_PATH, PROCESS_UPLOAD_PATH};
pub use error::{PipelineError, Rejection, UploadError};
pub use options::{AspectRatio, CropPosition, SplitOptions};
pub use pipeline::{BatchReport, ItemOutcome, Pipeline, Progress};
pub use plan::{ALLOWED_EXTENSIONS, MAX_FILE_BYTES, capacity_for};
pub use queue::{ItemId, ItemState, ItemStatus, UploadItem, UploadQueue};
pub use source::SourceFile;
pub use transport::{GatewayTransport, SPLIT_PATH, SegmentInfo, SplitResult, UploadTransport};

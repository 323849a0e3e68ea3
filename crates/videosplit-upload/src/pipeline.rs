//! Sequential upload pipeline
//!
//! `outcomes` is a lazy stream: each poll picks the next queued item, marks it
//! `Uploading`, awaits the transport and records `Done` or `Failed`. Nothing
//! runs concurrently, so item `i + 1` never starts before item `i` has
//! finished and its progress has been reported. Items removed from the queue
//! before the stream reaches them are skipped.

use std::time::Duration;

use futures_util::stream::{self, Stream, StreamExt};
use tracing::{info, warn};

use crate::error::{PipelineError, UploadError};
use crate::queue::{ItemId, ItemState, ItemStatus, UploadQueue};
use crate::source::SourceFile;
use crate::transport::{SplitResult, UploadTransport};

/// Pause between consecutive uploads.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(500);

/// One status transition, reported synchronously to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Items that reached a terminal state so far
    pub processed: usize,
    pub total: usize,
    pub item_id: ItemId,
    pub status: ItemStatus,
}

/// Terminal result of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub id: ItemId,
    pub file_name: String,
    pub result: Result<SplitResult, UploadError>,
}

impl ItemOutcome {
    pub fn status(&self) -> ItemStatus {
        if self.result.is_ok() {
            ItemStatus::Done
        } else {
            ItemStatus::Failed
        }
    }
}

/// Aggregate of a pipeline run, in queue order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    first_success: Option<usize>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let first_success = outcomes.iter().position(|o| o.result.is_ok());
        Self {
            outcomes,
            first_success,
        }
    }

    /// The earliest item (by queue order) that finished `Done`.
    pub fn first_success(&self) -> Option<(&ItemOutcome, &SplitResult)> {
        let outcome = &self.outcomes[self.first_success?];
        outcome.result.as_ref().ok().map(|result| (outcome, result))
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Every item failed. Per-item reasons stay in `outcomes`.
    pub fn is_total_failure(&self) -> bool {
        self.first_success.is_none()
    }

    /// The representative result, or `TotalFailure` when nothing succeeded.
    pub fn into_result(self) -> Result<SplitResult, PipelineError> {
        let failed = self.failed();
        match self.first_success {
            Some(index) => self
                .outcomes
                .into_iter()
                .nth(index)
                .and_then(|outcome| outcome.result.ok())
                .ok_or(PipelineError::TotalFailure { failed }),
            None => Err(PipelineError::TotalFailure { failed }),
        }
    }
}

struct Walk<'a, T: ?Sized, F> {
    queue: UploadQueue,
    transport: &'a T,
    progress: F,
    delay: Duration,
    processed: usize,
    started: bool,
}

impl<T: ?Sized, F: FnMut(&Progress)> Walk<'_, T, F> {
    fn report(&mut self, item_id: ItemId, status: ItemStatus) {
        let progress = Progress {
            processed: self.processed,
            total: self.processed + self.queue.queued_count() + usize::from(!status.is_terminal()),
            item_id,
            status,
        };
        (self.progress)(&progress);
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    item_delay: Duration,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_DELAY)
    }
}

impl Pipeline {
    pub fn new(item_delay: Duration) -> Self {
        Self { item_delay }
    }

    pub fn item_delay(&self) -> Duration {
        self.item_delay
    }

    /// Lazily upload every queued item, yielding one outcome per item.
    pub fn outcomes<'a, T, F>(
        &self,
        queue: &UploadQueue,
        transport: &'a T,
        progress: F,
    ) -> impl Stream<Item = ItemOutcome> + 'a
    where
        T: UploadTransport + ?Sized,
        F: FnMut(&Progress) + 'a,
    {
        let walk = Walk {
            queue: queue.clone(),
            transport,
            progress,
            delay: self.item_delay,
            processed: 0,
            started: false,
        };

        stream::unfold(walk, |mut walk| async move {
            if walk.started {
                if walk.queue.queued_count() == 0 {
                    return None;
                }
                tokio::time::sleep(walk.delay).await;
            }
            walk.started = true;

            let (id, file) = walk.queue.start_next()?;
            walk.report(id, ItemStatus::Uploading);

            let result = walk.transport.upload(&file).await;
            let state = match &result {
                Ok(split) => {
                    info!(item_id = %id, file = file.name(), job_id = %split.job_id, "upload done");
                    ItemState::Done(split.clone())
                }
                Err(e) => {
                    warn!(item_id = %id, file = file.name(), error = %e, "upload failed");
                    ItemState::Failed(e.clone())
                }
            };
            let status = state.status();
            metrics::counter!("videosplit_upload_items_total", "status" => status.label())
                .increment(1);

            walk.queue.finish(id, state);
            walk.processed += 1;
            walk.report(id, status);

            let outcome = ItemOutcome {
                id,
                file_name: file.name().to_owned(),
                result,
            };
            Some((outcome, walk))
        })
    }

    /// Upload every queued item and aggregate the outcomes.
    ///
    /// Only fails when there is nothing to upload; item failures are
    /// reported inside the `BatchReport`.
    pub async fn run<T, F>(
        &self,
        queue: &UploadQueue,
        transport: &T,
        progress: F,
    ) -> Result<BatchReport, PipelineError>
    where
        T: UploadTransport + ?Sized,
        F: FnMut(&Progress),
    {
        let total = queue.queued_count();
        if total == 0 {
            return Err(PipelineError::EmptyQueue);
        }
        info!(total, "upload batch started");

        let outcomes: Vec<ItemOutcome> = self.outcomes(queue, transport, progress).collect().await;
        let report = BatchReport::from_outcomes(outcomes);
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "upload batch finished"
        );
        Ok(report)
    }

    /// Upload one file with the same validation and reporting as a batch.
    pub async fn upload_single<T, F>(
        &self,
        file: SourceFile,
        transport: &T,
        progress: F,
    ) -> Result<BatchReport, PipelineError>
    where
        T: UploadTransport + ?Sized,
        F: FnMut(&Progress),
    {
        let queue = UploadQueue::new();
        queue.enqueue(file, 1)?;
        self.run(&queue, transport, progress).await
    }
}

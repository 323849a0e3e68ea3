//! Plan-bounded upload queue
//!
//! The queue is a cheap clone handle over shared state so a caller can remove
//! a queued item while a pipeline is working through the same queue. Items
//! stay in insertion order; terminal items remain for inspection.
//!
//! Status transitions:
//! - Queued → Uploading (pipeline picks the item)
//! - Uploading → Done | Failed (transport resolved)
//! - Queued → (removed by the caller)

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Rejection, UploadError};
use crate::plan::{MAX_FILE_BYTES, is_allowed_extension};
use crate::source::SourceFile;
use crate::transport::SplitResult;

/// Opaque handle for an accepted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(Uuid);

impl ItemId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// State of an item. A finished item always carries its result or reason.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemState {
    Queued,
    Uploading,
    Done(SplitResult),
    Failed(UploadError),
}

impl ItemState {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemState::Queued => ItemStatus::Queued,
            ItemState::Uploading => ItemStatus::Uploading,
            ItemState::Done(_) => ItemStatus::Done,
            ItemState::Failed(_) => ItemStatus::Failed,
        }
    }
}

/// Payload-free status, as reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Queued,
    Uploading,
    Done,
    Failed,
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Queued => "queued",
            ItemStatus::Uploading => "uploading",
            ItemStatus::Done => "done",
            ItemStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Failed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    pub id: ItemId,
    pub file: SourceFile,
    pub state: ItemState,
}

impl UploadItem {
    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }
}

fn lock(items: &Mutex<Vec<UploadItem>>) -> MutexGuard<'_, Vec<UploadItem>> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered collection of upload items.
#[derive(Debug, Clone, Default)]
pub struct UploadQueue {
    items: Arc<Mutex<Vec<UploadItem>>>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `file` and append it as `Queued`.
    ///
    /// `capacity` is the plan's limit on queue length, checked against every
    /// item currently held (finished ones included).
    pub fn enqueue(&self, file: SourceFile, capacity: usize) -> Result<ItemId, Rejection> {
        if !is_allowed_extension(file.extension()) {
            return Err(Rejection::UnsupportedType {
                file_name: file.name().to_owned(),
                extension: file.extension().to_owned(),
            });
        }
        if file.len() > MAX_FILE_BYTES {
            return Err(Rejection::TooLarge {
                file_name: file.name().to_owned(),
                size: file.len(),
                limit: MAX_FILE_BYTES,
            });
        }

        let mut items = lock(&self.items);
        if items.len() >= capacity {
            return Err(Rejection::QueueFull {
                file_name: file.name().to_owned(),
                capacity,
            });
        }

        let id = ItemId::new();
        debug!(item_id = %id, file = file.name(), size = file.len(), "file queued");
        items.push(UploadItem {
            id,
            file,
            state: ItemState::Queued,
        });
        Ok(id)
    }

    /// Enqueue each file in order; one result per file.
    pub fn enqueue_all(
        &self,
        files: impl IntoIterator<Item = SourceFile>,
        capacity: usize,
    ) -> Vec<Result<ItemId, Rejection>> {
        files
            .into_iter()
            .map(|file| self.enqueue(file, capacity))
            .collect()
    }

    /// Remove a queued item. Unknown ids and items already picked up are left
    /// alone; returns whether anything was removed.
    pub fn remove(&self, id: ItemId) -> bool {
        let mut items = lock(&self.items);
        let Some(pos) = items
            .iter()
            .position(|item| item.id == id && matches!(item.state, ItemState::Queued))
        else {
            return false;
        };
        items.remove(pos);
        info!(item_id = %id, "queued item removed");
        true
    }

    /// Copy of all items in insertion order.
    pub fn snapshot(&self) -> Vec<UploadItem> {
        lock(&self.items).clone()
    }

    pub fn get(&self, id: ItemId) -> Option<UploadItem> {
        lock(&self.items).iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }

    /// Items still waiting for the pipeline.
    pub fn queued_count(&self) -> usize {
        lock(&self.items)
            .iter()
            .filter(|item| matches!(item.state, ItemState::Queued))
            .count()
    }

    /// Drop finished items, keeping queued and in-progress ones.
    pub fn clear_finished(&self) -> usize {
        let mut items = lock(&self.items);
        let before = items.len();
        items.retain(|item| !item.status().is_terminal());
        before - items.len()
    }

    /// Move the first queued item to `Uploading` and return it.
    pub(crate) fn start_next(&self) -> Option<(ItemId, SourceFile)> {
        let mut items = lock(&self.items);
        let item = items
            .iter_mut()
            .find(|item| matches!(item.state, ItemState::Queued))?;
        item.state = ItemState::Uploading;
        Some((item.id, item.file.clone()))
    }

    /// Record the terminal state of an uploading item.
    pub(crate) fn finish(&self, id: ItemId, state: ItemState) {
        let mut items = lock(&self.items);
        if let Some(item) = items
            .iter_mut()
            .find(|item| item.id == id && matches!(item.state, ItemState::Uploading))
        {
            item.state = state;
        }
    }
}

//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which decouples the batch
//! runner from whatever displays its progress.

use crate::model::{BatchItem, UploadBatch};

/// Trait for receiving progress updates from a batch.
///
/// All methods are called synchronously during `run_batch`.
pub trait ProgressCallback: Send {
    /// Called when batch execution starts.
    fn on_batch_started(&self, batch: &UploadBatch);

    /// Called when a file is about to be uploaded.
    fn on_file_started(&self, batch: &UploadBatch, item_index: usize, item: &BatchItem);

    /// Called when a file is done (uploaded, skipped, or failed).
    fn on_file_completed(&self, batch: &UploadBatch, item_index: usize, item: &BatchItem);

    /// Called when the batch stops, whether completed or aborted.
    fn on_batch_completed(&self, batch: &UploadBatch);
}

//! Batch orchestration module.
//!
//! This module provides the batch lifecycle functions:
//! - Creating a batch from shared settings
//! - Planning a batch (expanding the selected files and folders)
//! - Running a batch (uploading each file in order)

use chrono::Utc;
use reqwest::Url;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::BatchError;
use crate::fs_ops;
use crate::model::{
    BatchItem, BatchSettings, BatchState, FailurePolicy, ItemState, UploadBatch, UploadOutcome,
};
use crate::progress::ProgressCallback;
use crate::upload::Uploader;

/// Create a new upload batch.
///
/// # Errors
/// Returns BatchError if the endpoint is not an absolute http(s) URL
pub fn create_batch(
    settings: BatchSettings,
    failure_policy: FailurePolicy,
) -> Result<UploadBatch, BatchError> {
    match Url::parse(&settings.endpoint_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(BatchError::InvalidSettings {
                reason: format!("unsupported URL scheme '{}'", url.scheme()),
            })
        }
        Err(e) => {
            return Err(BatchError::InvalidSettings {
                reason: format!("invalid endpoint URL '{}': {}", settings.endpoint_url, e),
            })
        }
    }

    Ok(UploadBatch {
        id: Uuid::new_v4(),
        settings,
        failure_policy,
        items: Vec::new(),
        state: BatchState::Pending,
        current_item_index: None,
        created_at: Utc::now(),
        start_time: None,
        end_time: None,
    })
}

/// Plan a batch by expanding the selected inputs into files.
///
/// Explicit files keep the order they were given in; folders contribute
/// their contents sorted case-insensitively.
///
/// # Errors
/// Returns BatchError if the batch already ran or enumeration fails
pub fn plan_batch(batch: &mut UploadBatch, inputs: &[PathBuf]) -> Result<(), BatchError> {
    if batch.state != BatchState::Pending {
        return Err(BatchError::NotPending {
            state: batch.state.to_string(),
        });
    }

    batch.items = fs_ops::enumerate_inputs(inputs)?
        .into_iter()
        .map(BatchItem::new)
        .collect();

    if batch.items.len() > 1 && batch.settings.name_override.as_deref().map_or(false, |n| !n.is_empty()) {
        log::warn!(
            "Name override applies to all {} files of batch {}; each upload targets the same name",
            batch.items.len(),
            batch.id
        );
    }
    log::debug!("Planned batch {} with {} files", batch.id, batch.items.len());
    Ok(())
}

/// Run a batch, uploading each file in order.
///
/// Transitions batch state from Pending to Running to Completed (or Aborted).
/// Under `FailurePolicy::AbortOnError` the first failure stops the batch:
/// it is recorded on its item, later items stay Pending, and the error is
/// returned. Under `ContinueOnError` failures are only recorded.
///
/// # Errors
/// `NotPending` if the batch already ran, `FileFailed` on an aborting failure
pub fn run_batch(
    batch: &mut UploadBatch,
    uploader: &Uploader<'_>,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<(), BatchError> {
    if batch.state != BatchState::Pending {
        return Err(BatchError::NotPending {
            state: batch.state.to_string(),
        });
    }

    batch.state = BatchState::Running;
    batch.start_time = Some(Utc::now());
    log::info!("Starting batch {} ({} files)", batch.id, batch.items.len());

    if let Some(callback) = progress_callback {
        callback.on_batch_started(batch);
    }

    let mut abort = None;
    for item_index in 0..batch.items.len() {
        batch.current_item_index = Some(item_index);
        let request = batch.settings.request_for(&batch.items[item_index].source_path);

        if let Some(callback) = progress_callback {
            callback.on_file_started(batch, item_index, &batch.items[item_index]);
        }

        batch.items[item_index].state = ItemState::Uploading;
        match uploader.upload(&request) {
            Ok(outcome) => {
                let item = &mut batch.items[item_index];
                item.state = match outcome {
                    UploadOutcome::Uploaded(_) => ItemState::Uploaded,
                    UploadOutcome::AlreadyUploaded | UploadOutcome::TargetSkipped { .. } => {
                        ItemState::Skipped
                    }
                };
                item.outcome = Some(outcome);
            }
            Err(e) => {
                log::warn!("Upload of {} failed: {}", request.source_path.display(), e);
                let item = &mut batch.items[item_index];
                item.state = ItemState::Failed;
                item.error_code = e.raw_os_error();
                item.error_message = Some(e.to_string());
                if batch.failure_policy == FailurePolicy::AbortOnError {
                    abort = Some(BatchError::FileFailed {
                        path: request.source_path.clone(),
                        source: e,
                    });
                }
            }
        }

        if let Some(callback) = progress_callback {
            callback.on_file_completed(batch, item_index, &batch.items[item_index]);
        }

        if abort.is_some() {
            break;
        }
    }

    batch.state = if abort.is_some() {
        BatchState::Aborted
    } else {
        BatchState::Completed
    };
    batch.end_time = Some(Utc::now());
    batch.current_item_index = None;
    log::info!("Batch {} finished: {}", batch.id, batch.state);

    if let Some(callback) = progress_callback {
        callback.on_batch_completed(batch);
    }

    match abort {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

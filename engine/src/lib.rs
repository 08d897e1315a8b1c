//! # Upload Engine - Document Library Upload Library
//!
//! A headless engine that uploads local files into a remote document library
//! through its copy/versioning web services.
//! Designed as the foundation for multiple front ends (CLI, automation).
//!
//! ## Overview
//!
//! For every file the engine:
//! - Ignores shortcuts left behind by earlier uploads (`*.uploaded.url`)
//! - Resolves conflicts with an existing target (overwrite, skip, or fail)
//! - Translates classification properties into library fields
//! - Copies the payload and checks the per-destination result
//! - Keeps, deletes, or replaces the source with a shortcut
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::time::Duration;
//! use upload_engine::{
//!     create_batch, plan_batch, run_batch, BatchSettings, FailurePolicy, NoClassification,
//!     PropertyAction, SoapClient, SourceAction, TargetAction, Uploader,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SoapClient::new(Duration::from_secs(100))?;
//! let uploader = Uploader::new(&client, &NoClassification);
//!
//! let settings = BatchSettings {
//!     endpoint_url: "http://intranet/sites/docs".to_string(),
//!     library_path: "Shared Documents".to_string(),
//!     name_override: None,
//!     source_action: SourceAction::Keep,
//!     target_action: TargetAction::Skip,
//!     property_action: PropertyAction::Ignore,
//!     credentials: None,
//! };
//! let mut batch = create_batch(settings, FailurePolicy::AbortOnError)?;
//! plan_batch(&mut batch, &[PathBuf::from("C:\\docs")])?;
//! run_batch(&mut batch, &uploader, None)?;
//!
//! for item in &batch.items {
//!     println!("{:?}: {:?}", item.source_path, item.state);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (UploadRequest, UploadBatch, enums)
//! - **error**: Error types
//! - **paths**: URL joining, target names, marker recognition
//! - **metadata**: Classification sources and field translation
//! - **remote**: The `LibraryClient` trait
//! - **soap**: HTTP + SOAP implementation of `LibraryClient`
//! - **upload**: Single-file upload
//! - **fs_ops**: Expansion of selected files and folders
//! - **batch**: Batch orchestration (create, plan, run)
//! - **progress**: Progress callback trait

pub mod model;
pub mod error;
pub mod paths;
pub mod metadata;
pub mod remote;
pub mod soap;
pub mod upload;
pub mod fs_ops;
pub mod batch;
pub mod progress;

#[cfg(test)]
mod test_support;

// Re-export main types and functions
pub use model::{
    BatchItem, BatchSettings, BatchState, BatchSummary, ClassificationProperty, CopyOutcome,
    CopyResult, Credentials, FailedItem, FailurePolicy, FieldDescriptor, FieldType, ItemState,
    PropertyAction, PropertyType, SourceAction, TargetAction, UploadBatch, UploadOutcome,
    UploadReceipt, UploadRequest, VersionInfo,
};
pub use error::{BatchError, MetadataError, RemoteError, UploadError};
pub use paths::{combine_urls, is_uploaded_marker, MARKER_SUFFIX};
pub use metadata::{
    read_fields, translate_property, ClassificationSource, NoClassification, SidecarClassification,
};
pub use remote::LibraryClient;
pub use soap::SoapClient;
pub use upload::Uploader;
pub use batch::{create_batch, plan_batch, run_batch};
pub use progress::ProgressCallback;

//! Error types for the upload engine.
//!
//! `UploadError` is what a single-file upload returns. `RemoteError` comes out
//! of a `LibraryClient`, `MetadataError` out of a classification source, and
//! `BatchError` out of the batch runner.
//!
//! Conditions that are deliberately silent (marker-suffixed inputs, properties
//! without a resolvable type) are not represented here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end the upload of a single file.
///
/// The remote copy may already have committed when one of the local I/O
/// variants is returned from the disposition step; nothing is rolled back.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A file already exists at the target under `TargetAction::Fail`
    #[error("Target file \"{path}\" already exists")]
    TargetExists { path: String },

    /// The remote side rejected the copy or the request did not complete
    #[error("{message}")]
    CopyFailed { destination: String, message: String },

    /// Failed to read the source payload
    #[error("Failed to read file: {}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to delete the source after a successful copy
    #[error("Failed to delete source file: {}", path.display())]
    DeleteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write the uploaded marker
    #[error("Failed to write marker file: {}", path.display())]
    MarkerWriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    /// True for failures of the local filesystem (as opposed to the remote side).
    pub fn is_local_io(&self) -> bool {
        matches!(
            self,
            Self::ReadError { .. } | Self::DeleteError { .. } | Self::MarkerWriteError { .. }
        )
    }

    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<u32> {
        match self {
            Self::ReadError { source, .. }
            | Self::DeleteError { source, .. }
            | Self::MarkerWriteError { source, .. } => source.raw_os_error().map(|e| e as u32),
            _ => None,
        }
    }
}

/// Errors reported by a `LibraryClient` implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced an HTTP response
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status and no SOAP fault
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The endpoint answered with a SOAP fault
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// The response could not be understood
    #[error("malformed response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

impl From<quick_xml::Error> for RemoteError {
    fn from(err: quick_xml::Error) -> Self {
        RemoteError::Protocol(err.to_string())
    }
}

/// Errors reported by a classification source.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read classification data from {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid classification data in {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that stop a batch from being planned or run to completion.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch settings cannot produce a valid request
    #[error("Invalid batch settings: {reason}")]
    InvalidSettings { reason: String },

    /// An input path could not be enumerated
    #[error("Failed to enumerate {}", path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The batch was already started
    #[error("Batch must be in Pending state; current state: {state}")]
    NotPending { state: String },

    /// A file failed under `FailurePolicy::AbortOnError`
    #[error("Upload of {} failed: {source}", path.display())]
    FileFailed {
        path: PathBuf,
        #[source]
        source: UploadError,
    },
}

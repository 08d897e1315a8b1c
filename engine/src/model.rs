//! Core data model for library uploads.
//!
//! This module defines the structures passed into and out of the engine:
//! - UploadRequest: everything needed to upload one file
//! - SourceAction, TargetAction, PropertyAction: enums controlling behavior
//! - ClassificationProperty, FieldDescriptor: metadata before and after translation
//! - CopyOutcome, VersionInfo: what the remote client reports
//! - UploadOutcome: what a successful upload call did
//! - UploadBatch, BatchItem, BatchSettings: an ordered run over many files

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What to do with the local source file after a successful copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceAction {
    /// Leave the source in place
    Keep,
    /// Remove the source
    Delete,
    /// Remove the source and leave a `.uploaded.url` shortcut in its place
    Url,
}

impl SourceAction {
    /// Parse from a case-insensitive name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "delete" => Some(Self::Delete),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

impl fmt::Display for SourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceAction::Keep => write!(f, "Keep"),
            SourceAction::Delete => write!(f, "Delete"),
            SourceAction::Url => write!(f, "Url"),
        }
    }
}

/// Policy for handling a file that already exists in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetAction {
    /// Copy without checking the target
    Overwrite,
    /// Leave the existing target and report success
    Skip,
    /// Leave the existing target and report an error
    Fail,
}

impl TargetAction {
    /// Parse from a case-insensitive name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "overwrite" => Some(Self::Overwrite),
            "skip" => Some(Self::Skip),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

impl fmt::Display for TargetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAction::Overwrite => write!(f, "Overwrite"),
            TargetAction::Skip => write!(f, "Skip"),
            TargetAction::Fail => write!(f, "Fail"),
        }
    }
}

/// Whether classification properties travel with the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyAction {
    Copy,
    Ignore,
}

impl PropertyAction {
    /// Parse from a case-insensitive name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "copy" => Some(Self::Copy),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyAction::Copy => write!(f, "Copy"),
            PropertyAction::Ignore => write!(f, "Ignore"),
        }
    }
}

/// Explicit credentials for the remote library.
///
/// Only constructible from a non-empty username and password; "no credentials"
/// is `None` at every call site and means the ambient identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Build credentials when both parts are non-empty.
    ///
    /// Both parts are taken verbatim.
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        let username = username.unwrap_or_default();
        let password = password.unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One file to upload and the policies that apply to it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Local file to upload
    pub source_path: PathBuf,

    /// Base URL of the site hosting the library
    pub endpoint_url: String,

    /// Library path relative to the endpoint (e.g. "Shared Documents")
    pub library_path: String,

    /// Target file name; the source's file name when `None` or empty
    pub name_override: Option<String>,

    pub source_action: SourceAction,
    pub target_action: TargetAction,
    pub property_action: PropertyAction,

    /// `None` means the ambient identity of the process
    pub credentials: Option<Credentials>,
}

impl UploadRequest {
    /// Create a request with the default policies (Keep, Overwrite, Ignore).
    pub fn new<P: AsRef<Path>>(source_path: P, endpoint_url: &str, library_path: &str) -> Self {
        UploadRequest {
            source_path: source_path.as_ref().to_path_buf(),
            endpoint_url: endpoint_url.to_string(),
            library_path: library_path.to_string(),
            name_override: None,
            source_action: SourceAction::Keep,
            target_action: TargetAction::Overwrite,
            property_action: PropertyAction::Ignore,
            credentials: None,
        }
    }
}

/// Declared type of a classification property.
///
/// Discriminants are the classification subsystem's type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    OrderedList = 1,
    MultiChoiceList = 2,
    String = 4,
    MultiString = 5,
    Int = 6,
    Bool = 7,
    Date = 8,
}

impl PropertyType {
    /// Resolve a numeric type code; unknown codes have no definition.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::OrderedList),
            2 => Some(Self::MultiChoiceList),
            4 => Some(Self::String),
            5 => Some(Self::MultiString),
            6 => Some(Self::Int),
            7 => Some(Self::Bool),
            8 => Some(Self::Date),
            _ => None,
        }
    }
}

/// A typed metadata value attached to a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationProperty {
    pub name: String,
    pub value: String,
    /// `None` when the property's definition could not be resolved
    pub property_type: Option<PropertyType>,
}

/// Remote list-item field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Choice,
    MultiChoice,
    Text,
    Note,
    Number,
    Boolean,
    DateTime,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Choice => "Choice",
            FieldType::MultiChoice => "MultiChoice",
            FieldType::Text => "Text",
            FieldType::Note => "Note",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::DateTime => "DateTime",
        };
        f.write_str(name)
    }
}

/// One field sent alongside the payload, value already in wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub display_name: String,
    pub field_type: FieldType,
    pub value: String,
}

/// Per-destination result of a copy call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResult {
    /// 0 on success
    pub error_code: u32,
    pub error_message: String,
    pub destination_url: String,
}

/// Everything a copy call reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Non-zero when the request itself did not complete
    pub return_code: u32,
    pub results: Vec<CopyResult>,
}

/// One entry from a version lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub url: String,
    pub created: String,
    pub size: Option<u64>,
}

/// What a successful upload call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The candidate was itself an uploaded marker; nothing happened
    AlreadyUploaded,
    /// The target existed under `TargetAction::Skip`
    TargetSkipped { relative_path: String },
    /// The payload was copied and the disposition applied
    Uploaded(UploadReceipt),
}

impl UploadOutcome {
    /// True when bytes were actually sent.
    pub fn transferred(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded(_))
    }
}

/// Details of a completed copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub destination_url: String,
    pub bytes_sent: u64,
    pub field_count: usize,
    pub disposition: SourceAction,
    /// Set under `SourceAction::Url`
    pub marker_path: Option<PathBuf>,
}

/// Settings shared by every file of a batch.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub endpoint_url: String,
    pub library_path: String,
    /// Applied to every file; meaningful for single-file batches
    pub name_override: Option<String>,
    pub source_action: SourceAction,
    pub target_action: TargetAction,
    pub property_action: PropertyAction,
    pub credentials: Option<Credentials>,
}

impl BatchSettings {
    /// Build the request for one file of the batch.
    pub fn request_for(&self, source_path: &Path) -> UploadRequest {
        UploadRequest {
            source_path: source_path.to_path_buf(),
            endpoint_url: self.endpoint_url.clone(),
            library_path: self.library_path.clone(),
            name_override: self.name_override.clone(),
            source_action: self.source_action,
            target_action: self.target_action,
            property_action: self.property_action,
            credentials: self.credentials.clone(),
        }
    }
}

/// What the batch does when a file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure; later files are not attempted
    #[default]
    AbortOnError,
    /// Record the failure and go on with the next file
    ContinueOnError,
}

/// An ordered upload run over many files.
#[derive(Debug)]
pub struct UploadBatch {
    /// Unique identifier for this batch
    pub id: Uuid,

    pub settings: BatchSettings,

    pub failure_policy: FailurePolicy,

    /// Files in upload order
    pub items: Vec<BatchItem>,

    pub state: BatchState,

    /// Index of the file being uploaded (if Running)
    pub current_item_index: Option<usize>,

    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl UploadBatch {
    /// Tally the items by state.
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            batch_id: self.id,
            state: self.state,
            total: self.items.len(),
            uploaded: 0,
            skipped: 0,
            failed: 0,
            pending: 0,
            bytes_sent: 0,
            failures: Vec::new(),
        };
        for item in &self.items {
            match item.state {
                ItemState::Uploaded => summary.uploaded += 1,
                ItemState::Skipped => summary.skipped += 1,
                ItemState::Failed => {
                    summary.failed += 1;
                    summary.failures.push(FailedItem {
                        path: item.source_path.clone(),
                        message: item
                            .error_message
                            .clone()
                            .unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                ItemState::Pending | ItemState::Uploading => summary.pending += 1,
            }
            if let Some(UploadOutcome::Uploaded(receipt)) = &item.outcome {
                summary.bytes_sent += receipt.bytes_sent;
            }
        }
        summary
    }
}

/// A single file within a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub source_path: PathBuf,

    pub state: ItemState,

    /// Set once the upload returned successfully
    pub outcome: Option<UploadOutcome>,

    /// OS error code if the failure was local
    pub error_code: Option<u32>,

    /// Human-readable error message
    pub error_message: Option<String>,
}

impl BatchItem {
    pub fn new(source_path: PathBuf) -> Self {
        BatchItem {
            source_path,
            state: ItemState::Pending,
            outcome: None,
            error_code: None,
            error_message: None,
        }
    }
}

/// The state of an individual file within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    /// Not yet attempted
    Pending,
    /// Currently uploading
    Uploading,
    /// Copied to the library
    Uploaded,
    /// Marker input or existing target under Skip
    Skipped,
    /// Error occurred; see error_message
    Failed,
}

impl ItemState {
    /// Returns true if this state is terminal (no further changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Uploaded | ItemState::Skipped | ItemState::Failed)
    }
}

/// The state of an entire batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchState {
    /// Created, not yet started
    Pending,
    /// Currently executing
    Running,
    /// Every item was attempted
    Completed,
    /// Stopped at the first failure
    Aborted,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-state counts of a batch, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub state: BatchState,
    pub total: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pending: usize,
    pub bytes_sent: u64,
    pub failures: Vec<FailedItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub path: PathBuf,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_parts() {
        assert!(Credentials::from_parts(Some("alice"), Some("secret")).is_some());
        assert!(Credentials::from_parts(Some("alice"), Some("")).is_none());
        assert!(Credentials::from_parts(Some(""), Some("secret")).is_none());
        assert!(Credentials::from_parts(None, None).is_none());
    }

    #[test]
    fn test_credentials_keep_whitespace_username() {
        let creds = Credentials::from_parts(Some("   "), Some("secret"))
            .expect("Whitespace is a non-empty username");
        assert_eq!(creds.username(), "   ");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::from_parts(Some("alice"), Some("secret")).unwrap();
        assert_eq!(creds.username(), "alice");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("alice"));
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn test_action_parsing_is_case_insensitive() {
        assert_eq!(SourceAction::from_str("URL"), Some(SourceAction::Url));
        assert_eq!(TargetAction::from_str("Skip"), Some(TargetAction::Skip));
        assert_eq!(PropertyAction::from_str("copy"), Some(PropertyAction::Copy));
        assert_eq!(TargetAction::from_str("merge"), None);
    }

    #[test]
    fn test_property_type_codes() {
        assert_eq!(PropertyType::from_code(2), Some(PropertyType::MultiChoiceList));
        assert_eq!(PropertyType::from_code(8), Some(PropertyType::Date));
        assert_eq!(PropertyType::from_code(3), None);
        assert_eq!(PropertyType::Bool as u32, 7);
    }
}

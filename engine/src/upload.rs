//! Single-file upload.
//!
//! `Uploader::upload` runs the whole per-file sequence:
//! marker filter, target resolution, metadata translation, remote copy,
//! and source disposition.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::UploadError;
use crate::metadata::{read_fields, ClassificationSource};
use crate::model::{
    CopyOutcome, PropertyAction, SourceAction, TargetAction, UploadOutcome, UploadReceipt,
    UploadRequest,
};
use crate::paths::{combine_urls, is_uploaded_marker, marker_path_for, target_file_name};
use crate::remote::LibraryClient;

/// Uploads files into a library through a `LibraryClient`.
///
/// Holds no per-file state; one instance can serve any number of requests.
pub struct Uploader<'a> {
    client: &'a dyn LibraryClient,
    classification: &'a dyn ClassificationSource,
}

impl<'a> Uploader<'a> {
    pub fn new(client: &'a dyn LibraryClient, classification: &'a dyn ClassificationSource) -> Self {
        Uploader {
            client,
            classification,
        }
    }

    /// Upload one file.
    ///
    /// # Returns
    /// What happened: nothing (marker input), a skip, or a completed copy
    ///
    /// # Errors
    /// `TargetExists` under `TargetAction::Fail`, `CopyFailed` when the remote
    /// side rejects the copy, and the local I/O variants for read, delete, or
    /// marker write failures. No step is retried.
    pub fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome, UploadError> {
        let source = request.source_path.as_path();

        // Shortcuts left by earlier runs
        if is_uploaded_marker(source) {
            log::debug!("Skipping uploaded marker {}", source.display());
            return Ok(UploadOutcome::AlreadyUploaded);
        }

        let name = target_file_name(source, request.name_override.as_deref());
        let relative_path = combine_urls(&request.library_path, &name);

        if request.target_action != TargetAction::Overwrite && self.target_exists(request, &relative_path) {
            if request.target_action == TargetAction::Skip {
                log::info!("Target {} exists; skipping {}", relative_path, source.display());
                return Ok(UploadOutcome::TargetSkipped { relative_path });
            }
            return Err(UploadError::TargetExists { path: relative_path });
        }

        let payload = fs::read(source).map_err(|e| UploadError::ReadError {
            path: source.to_path_buf(),
            source: e,
        })?;
        let destination_url = combine_urls(&request.endpoint_url, &relative_path);

        let fields = match request.property_action {
            PropertyAction::Copy => read_fields(self.classification, source),
            PropertyAction::Ignore => Vec::new(),
        };
        log::debug!(
            "Copying {} ({} bytes, {} fields) to {}",
            source.display(),
            payload.len(),
            fields.len(),
            destination_url
        );

        let destinations = [destination_url.clone()];
        let outcome = self
            .client
            .copy_into_items(
                &request.endpoint_url,
                &payload,
                &destinations,
                &fields,
                request.credentials.as_ref(),
            )
            .map_err(|e| UploadError::CopyFailed {
                destination: destination_url.clone(),
                message: format!("Copy request did not complete: {}", e),
            })?;
        check_copy_outcome(&outcome, &destination_url)?;

        let marker_path = apply_disposition(source, request.source_action, &destination_url)?;
        log::info!("Uploaded {} to {}", source.display(), destination_url);

        Ok(UploadOutcome::Uploaded(UploadReceipt {
            destination_url,
            bytes_sent: payload.len() as u64,
            field_count: fields.len(),
            disposition: request.source_action,
            marker_path,
        }))
    }

    /// Ask the library whether `relative_path` exists.
    ///
    /// Any lookup error counts as "absent".
    fn target_exists(&self, request: &UploadRequest, relative_path: &str) -> bool {
        match self
            .client
            .get_versions(&request.endpoint_url, relative_path, request.credentials.as_ref())
        {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Version lookup for {} failed, treating as absent: {}", relative_path, e);
                false
            }
        }
    }
}

/// Turn a copy outcome into success or `CopyFailed`.
fn check_copy_outcome(outcome: &CopyOutcome, destination_url: &str) -> Result<(), UploadError> {
    if outcome.return_code != 0 {
        return Err(UploadError::CopyFailed {
            destination: destination_url.to_string(),
            message: "Copy request did not complete".to_string(),
        });
    }
    match outcome.results.first() {
        None => Err(UploadError::CopyFailed {
            destination: destination_url.to_string(),
            message: "Copy request returned no result for the destination".to_string(),
        }),
        Some(result) if result.error_code != 0 => Err(UploadError::CopyFailed {
            destination: destination_url.to_string(),
            message: result.error_message.clone(),
        }),
        Some(_) => Ok(()),
    }
}

/// Apply the source action after a successful copy.
///
/// # Returns
/// The marker path when one was written
fn apply_disposition(
    source: &Path,
    action: SourceAction,
    destination_url: &str,
) -> Result<Option<PathBuf>, UploadError> {
    match action {
        SourceAction::Keep => Ok(None),
        SourceAction::Delete => {
            delete_source(source)?;
            Ok(None)
        }
        SourceAction::Url => {
            delete_source(source)?;
            write_marker(source, destination_url).map(Some)
        }
    }
}

fn delete_source(source: &Path) -> Result<(), UploadError> {
    fs::remove_file(source).map_err(|e| UploadError::DeleteError {
        path: source.to_path_buf(),
        source: e,
    })
}

/// Write `<source>.uploaded.url` pointing at the uploaded copy.
pub fn write_marker(source: &Path, destination_url: &str) -> Result<PathBuf, UploadError> {
    let marker = marker_path_for(source);
    let write = |marker: &Path| -> std::io::Result<()> {
        let mut file = fs::File::create(marker)?;
        writeln!(file, "[InternetShortcut]")?;
        writeln!(file, "URL={}", destination_url)?;
        file.flush()
    };
    write(&marker).map_err(|e| UploadError::MarkerWriteError {
        path: marker.clone(),
        source: e,
    })?;
    Ok(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{NoClassification, SidecarClassification};
    use crate::model::{Credentials, FieldType, PropertyType};
    use crate::test_support::FakeLibrary;

    const SITE: &str = "http://intranet/sites/docs";

    fn request(path: &Path) -> UploadRequest {
        UploadRequest::new(path, SITE, "Shared Documents")
    }

    fn write_source(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("Failed to write source");
        path
    }

    #[test]
    fn test_marker_input_is_ignored_without_network() {
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(Path::new("/docs/a.txt.Uploaded.URL"));
        req.target_action = TargetAction::Fail;
        let outcome = uploader.upload(&req).expect("Marker input should not fail");

        assert_eq!(outcome, UploadOutcome::AlreadyUploaded);
        assert_eq!(library.version_queries().len(), 0);
        assert_eq!(library.copy_calls().len(), 0);
    }

    #[test]
    fn test_skip_existing_target_transfers_nothing() {
        let library = FakeLibrary::new().with_existing("Shared Documents/a.txt");
        let uploader = Uploader::new(&library, &NoClassification);

        // Source does not need to exist: nothing is read
        let mut req = request(Path::new("C:\\docs\\a.txt"));
        req.target_action = TargetAction::Skip;
        let outcome = uploader.upload(&req).expect("Skip should succeed");

        assert_eq!(
            outcome,
            UploadOutcome::TargetSkipped {
                relative_path: "Shared Documents/a.txt".to_string()
            }
        );
        assert!(!outcome.transferred());
        assert_eq!(library.version_queries(), vec!["Shared Documents/a.txt".to_string()]);
        assert!(library.copy_calls().is_empty());
    }

    #[test]
    fn test_skip_keeps_source_untouched() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "a.txt", b"original");
        let library = FakeLibrary::new().with_existing("Shared Documents/a.txt");
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.target_action = TargetAction::Skip;
        req.source_action = SourceAction::Delete;
        uploader.upload(&req).expect("Skip should succeed");

        assert_eq!(fs::read(&source).expect("Source should remain"), b"original");
    }

    #[test]
    fn test_fail_on_existing_target_names_destination() {
        let library = FakeLibrary::new().with_existing("Shared Documents/b.txt");
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(Path::new("C:\\docs\\b.txt"));
        req.target_action = TargetAction::Fail;
        let err = uploader.upload(&req).expect_err("Existing target should fail");

        match &err {
            UploadError::TargetExists { path } => assert_eq!(path, "Shared Documents/b.txt"),
            other => panic!("Unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("Shared Documents/b.txt"));
        assert!(library.copy_calls().is_empty());
    }

    #[test]
    fn test_lookup_error_means_absent() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "new.txt", b"data");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.target_action = TargetAction::Fail;
        let outcome = uploader.upload(&req).expect("Absent target should upload");

        assert!(outcome.transferred());
        assert_eq!(library.copy_calls().len(), 1);
    }

    #[test]
    fn test_overwrite_never_queries_existence() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "a.txt", b"data");
        let library = FakeLibrary::new().with_existing("Shared Documents/a.txt");
        let uploader = Uploader::new(&library, &NoClassification);

        let outcome = uploader.upload(&request(&source)).expect("Overwrite should upload");

        assert!(outcome.transferred());
        assert!(library.version_queries().is_empty());
        let calls = library.copy_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].destinations, vec![format!("{}/Shared Documents/a.txt", SITE)]);
        assert_eq!(calls[0].payload, b"data");
    }

    #[test]
    fn test_name_override_sets_target() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "a.txt", b"data");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.name_override = Some("renamed.txt".to_string());
        uploader.upload(&req).expect("Upload should succeed");

        assert_eq!(
            library.copy_calls()[0].destinations,
            vec![format!("{}/Shared Documents/renamed.txt", SITE)]
        );
    }

    #[test]
    fn test_delete_disposition_removes_source_without_marker() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "c.txt", b"data");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.source_action = SourceAction::Delete;
        let outcome = uploader.upload(&req).expect("Upload should succeed");

        assert!(!source.exists());
        assert!(!marker_path_for(&source).exists());
        match outcome {
            UploadOutcome::Uploaded(receipt) => {
                assert_eq!(receipt.disposition, SourceAction::Delete);
                assert_eq!(receipt.marker_path, None);
                assert_eq!(receipt.bytes_sent, 4);
            }
            other => panic!("Unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_url_disposition_replaces_source_with_marker() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "d.txt", b"data");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.source_action = SourceAction::Url;
        uploader.upload(&req).expect("Upload should succeed");

        assert!(!source.exists());
        let marker = temp_dir.path().join("d.txt.uploaded.url");
        let contents = fs::read_to_string(&marker).expect("Marker should exist");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "[InternetShortcut]");
        assert_eq!(lines[1], format!("URL={}/Shared Documents/d.txt", SITE));

        // A second pass over the marker does nothing
        let outcome = uploader.upload(&request(&marker)).expect("Marker pass should succeed");
        assert_eq!(outcome, UploadOutcome::AlreadyUploaded);
        assert_eq!(library.copy_calls().len(), 1);
    }

    #[test]
    fn test_marker_write_failure_after_commit_is_local_io() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "a.txt", b"data");
        // A directory where the marker file should go
        fs::create_dir(marker_path_for(&source)).expect("Failed to create blocking dir");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.source_action = SourceAction::Url;
        let err = uploader.upload(&req).expect_err("Marker write should fail");

        assert!(matches!(err, UploadError::MarkerWriteError { .. }), "Unexpected error: {:?}", err);
        assert!(err.is_local_io());
        // The copy is committed and the source already removed
        assert!(!source.exists());
        assert_eq!(library.copy_calls().len(), 1);
    }

    #[test]
    fn test_keep_disposition_leaves_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "e.txt", b"data");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        uploader.upload(&request(&source)).expect("Upload should succeed");
        assert!(source.exists());
    }

    #[test]
    fn test_nonzero_return_code_fails_and_keeps_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "f.txt", b"data");
        let library = FakeLibrary::new().with_return_code(1);
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.source_action = SourceAction::Delete;
        let err = uploader.upload(&req).expect_err("Copy should fail");

        assert!(matches!(err, UploadError::CopyFailed { .. }));
        assert_eq!(err.to_string(), "Copy request did not complete");
        assert!(source.exists());
    }

    #[test]
    fn test_destination_error_carries_remote_message() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "g.txt", b"data");
        let library = FakeLibrary::new().with_destination_error(4, "The file is checked out");
        let uploader = Uploader::new(&library, &NoClassification);

        let err = uploader.upload(&request(&source)).expect_err("Copy should fail");
        assert_eq!(err.to_string(), "The file is checked out");
    }

    #[test]
    fn test_transport_failure_is_copy_failure() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "h.txt", b"data");
        let library = FakeLibrary::new().with_unreachable_copy();
        let uploader = Uploader::new(&library, &NoClassification);

        let err = uploader.upload(&request(&source)).expect_err("Copy should fail");
        assert!(matches!(err, UploadError::CopyFailed { .. }));
        assert!(err.to_string().starts_with("Copy request did not complete"));
    }

    #[test]
    fn test_missing_source_is_read_error() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let err = uploader
            .upload(&request(&temp_dir.path().join("missing.txt")))
            .expect_err("Missing source should fail");
        assert!(err.is_local_io());
        assert!(library.copy_calls().is_empty());
    }

    #[test]
    fn test_properties_copied_only_when_requested() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "i.txt", b"data");
        fs::write(
            SidecarClassification::sidecar_path(&source),
            r#"[{"name": "Reviewed", "value": "1", "type": 7}, {"name": "Odd", "value": "x", "type": 3}]"#,
        )
        .expect("Failed to write side-car");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &SidecarClassification);

        let mut req = request(&source);
        uploader.upload(&req).expect("Upload should succeed");
        req.property_action = PropertyAction::Copy;
        uploader.upload(&req).expect("Upload should succeed");

        let calls = library.copy_calls();
        assert!(calls[0].fields.is_empty());
        assert_eq!(calls[1].fields.len(), 1);
        assert_eq!(calls[1].fields[0].field_type, FieldType::Boolean);
        assert_eq!(calls[1].fields[0].value, "True");
        assert_eq!(PropertyType::from_code(3), None);
    }

    #[test]
    fn test_credentials_are_threaded_to_client() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = write_source(temp_dir.path(), "j.txt", b"data");
        let library = FakeLibrary::new();
        let uploader = Uploader::new(&library, &NoClassification);

        let mut req = request(&source);
        req.target_action = TargetAction::Skip;
        req.credentials = Credentials::from_parts(Some("alice"), Some("secret"));
        uploader.upload(&req).expect("Upload should succeed");
        req.credentials = None;
        uploader.upload(&req).expect("Upload should succeed");

        // The second pass finds the first copy and skips it
        assert_eq!(
            library.identities(),
            vec![Some("alice".to_string()), Some("alice".to_string()), None]
        );
        assert_eq!(library.copy_calls().len(), 1);
    }
}

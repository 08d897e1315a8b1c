//! In-memory `LibraryClient` used by the engine's tests.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::RemoteError;
use crate::model::{CopyOutcome, CopyResult, Credentials, FieldDescriptor, VersionInfo};
use crate::remote::LibraryClient;

/// One recorded `copy_into_items` call.
#[derive(Debug, Clone)]
pub struct CopyCall {
    pub payload: Vec<u8>,
    pub destinations: Vec<String>,
    pub fields: Vec<FieldDescriptor>,
}

/// Library fake: tracks existing relative paths and records every call.
///
/// Successful copies register their target, so a later lookup finds it.
pub struct FakeLibrary {
    existing: Mutex<HashSet<String>>,
    return_code: u32,
    destination_error: Option<(u32, String)>,
    unreachable_copy: bool,
    fail_names: HashSet<String>,
    version_queries: Mutex<Vec<String>>,
    copy_calls: Mutex<Vec<CopyCall>>,
    identities: Mutex<Vec<Option<String>>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        FakeLibrary {
            existing: Mutex::new(HashSet::new()),
            return_code: 0,
            destination_error: None,
            unreachable_copy: false,
            fail_names: HashSet::new(),
            version_queries: Mutex::new(Vec::new()),
            copy_calls: Mutex::new(Vec::new()),
            identities: Mutex::new(Vec::new()),
        }
    }

    pub fn with_existing(self, relative_path: &str) -> Self {
        self.existing.lock().unwrap().insert(relative_path.to_string());
        self
    }

    pub fn with_return_code(mut self, code: u32) -> Self {
        self.return_code = code;
        self
    }

    pub fn with_destination_error(mut self, code: u32, message: &str) -> Self {
        self.destination_error = Some((code, message.to_string()));
        self
    }

    pub fn with_unreachable_copy(mut self) -> Self {
        self.unreachable_copy = true;
        self
    }

    /// Reject copies whose destination ends with `/name`.
    pub fn with_failing_name(mut self, name: &str) -> Self {
        self.fail_names.insert(name.to_string());
        self
    }

    pub fn version_queries(&self) -> Vec<String> {
        self.version_queries.lock().unwrap().clone()
    }

    pub fn copy_calls(&self) -> Vec<CopyCall> {
        self.copy_calls.lock().unwrap().clone()
    }

    /// Username seen by each call, in call order (`None` for ambient identity).
    pub fn identities(&self) -> Vec<Option<String>> {
        self.identities.lock().unwrap().clone()
    }

    fn record_identity(&self, credentials: Option<&Credentials>) {
        self.identities
            .lock()
            .unwrap()
            .push(credentials.map(|c| c.username().to_string()));
    }
}

impl LibraryClient for FakeLibrary {
    fn get_versions(
        &self,
        _site_url: &str,
        file_name: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<VersionInfo>, RemoteError> {
        self.record_identity(credentials);
        self.version_queries.lock().unwrap().push(file_name.to_string());
        if self.existing.lock().unwrap().contains(file_name) {
            Ok(vec![VersionInfo {
                version: "@1.0".to_string(),
                ..VersionInfo::default()
            }])
        } else {
            Err(RemoteError::Fault("File not found".to_string()))
        }
    }

    fn copy_into_items(
        &self,
        site_url: &str,
        payload: &[u8],
        destinations: &[String],
        fields: &[FieldDescriptor],
        credentials: Option<&Credentials>,
    ) -> Result<CopyOutcome, RemoteError> {
        self.record_identity(credentials);
        self.copy_calls.lock().unwrap().push(CopyCall {
            payload: payload.to_vec(),
            destinations: destinations.to_vec(),
            fields: fields.to_vec(),
        });
        if self.unreachable_copy {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }

        let mut results = Vec::new();
        for destination in destinations {
            let rejected = self
                .fail_names
                .iter()
                .any(|name| destination.ends_with(&format!("/{}", name)));
            let (error_code, error_message) = match &self.destination_error {
                Some((code, message)) => (*code, message.clone()),
                None if rejected => (1, format!("Destination {} is invalid", destination)),
                None => (0, String::new()),
            };
            if error_code == 0 && self.return_code == 0 {
                let relative = destination
                    .strip_prefix(site_url)
                    .unwrap_or(destination.as_str())
                    .trim_start_matches('/');
                self.existing.lock().unwrap().insert(relative.to_string());
            }
            results.push(CopyResult {
                error_code,
                error_message,
                destination_url: destination.clone(),
            });
        }

        Ok(CopyOutcome {
            return_code: self.return_code,
            results,
        })
    }
}

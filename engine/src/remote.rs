//! Remote library client trait.
//!
//! The engine talks to the library only through `LibraryClient`, so any
//! transport (the SOAP client in `soap`, an in-memory fake in tests) can
//! stand behind it.

use crate::error::RemoteError;
use crate::model::{CopyOutcome, Credentials, FieldDescriptor, VersionInfo};

/// The two protocol operations the engine needs.
///
/// `credentials: None` means the ambient identity of the process.
pub trait LibraryClient {
    /// Look up the versions of `file_name` (relative to `site_url`).
    ///
    /// The engine reads any `Ok` as "file exists" and any `Err`, including
    /// not-found, as "file absent".
    fn get_versions(
        &self,
        site_url: &str,
        file_name: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<VersionInfo>, RemoteError>;

    /// Copy `payload` to every absolute URL in `destinations`, setting `fields`.
    fn copy_into_items(
        &self,
        site_url: &str,
        payload: &[u8],
        destinations: &[String],
        fields: &[FieldDescriptor],
        credentials: Option<&Credentials>,
    ) -> Result<CopyOutcome, RemoteError>;
}

//! Target path helpers.
//!
//! Joining of library paths and URLs, target file name resolution, and
//! recognition of uploaded markers.

use std::path::{Path, PathBuf};

/// Suffix of the shortcut left behind by `SourceAction::Url`.
pub const MARKER_SUFFIX: &str = ".uploaded.url";

/// Join two path or URL segments with exactly one `/` between them.
///
/// An empty operand yields the other one unchanged.
pub fn combine_urls(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        return suffix.to_string();
    }
    if suffix.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), suffix.starts_with('/')) {
        (false, false) => format!("{}/{}", base, suffix),
        (true, true) => format!("{}{}", base, &suffix[1..]),
        _ => format!("{}{}", base, suffix),
    }
}

/// True when the path names a marker written by an earlier upload.
pub fn is_uploaded_marker(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.len() >= MARKER_SUFFIX.len()
        && name
            .get(name.len() - MARKER_SUFFIX.len()..)
            .map_or(false, |tail| tail.eq_ignore_ascii_case(MARKER_SUFFIX))
}

/// Location of the marker for a given source file.
pub fn marker_path_for(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(MARKER_SUFFIX);
    PathBuf::from(name)
}

/// Name the file will get in the library.
///
/// A non-empty override wins; otherwise the last component of the source,
/// accepting both `/` and `\` as separators.
pub fn target_file_name(source: &Path, name_override: Option<&str>) -> String {
    if let Some(name) = name_override.filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let full = source.to_string_lossy();
    full.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_inserts_single_separator() {
        assert_eq!(combine_urls("http://site", "lib"), "http://site/lib");
        assert_eq!(combine_urls("http://site/", "lib"), "http://site/lib");
        assert_eq!(combine_urls("http://site", "/lib"), "http://site/lib");
        assert_eq!(combine_urls("http://site/", "/lib"), "http://site/lib");
    }

    #[test]
    fn test_combine_with_empty_operand() {
        assert_eq!(combine_urls("", "Shared Documents"), "Shared Documents");
        assert_eq!(combine_urls("http://site/", ""), "http://site/");
        assert_eq!(combine_urls("", ""), "");
    }

    #[test]
    fn test_combine_is_associative() {
        let segments = ["http://site", "http://site/", "lib", "/lib", "lib/", "/lib/", "a.txt", "/a.txt"];
        for a in segments {
            for b in segments.iter().skip(2) {
                for c in segments.iter().skip(2) {
                    let left = combine_urls(&combine_urls(a, b), c);
                    let right = combine_urls(a, &combine_urls(b, c));
                    assert_eq!(left, right, "a={:?} b={:?} c={:?}", a, b, c);
                }
            }
        }
    }

    #[test]
    fn test_marker_detection_ignores_case() {
        assert!(is_uploaded_marker(Path::new("/docs/a.txt.uploaded.url")));
        assert!(is_uploaded_marker(Path::new("C:\\docs\\A.TXT.UPLOADED.URL")));
        assert!(!is_uploaded_marker(Path::new("/docs/a.txt")));
        assert!(!is_uploaded_marker(Path::new("/docs/a.url")));
        assert!(!is_uploaded_marker(Path::new("url")));
    }

    #[test]
    fn test_marker_path_appends_suffix() {
        assert_eq!(
            marker_path_for(Path::new("/docs/a.txt")),
            PathBuf::from("/docs/a.txt.uploaded.url")
        );
    }

    #[test]
    fn test_target_file_name() {
        assert_eq!(target_file_name(Path::new("C:\\docs\\b.txt"), None), "b.txt");
        assert_eq!(target_file_name(Path::new("/docs/c.txt"), Some("")), "c.txt");
        assert_eq!(target_file_name(Path::new("/docs/c.txt"), Some("renamed.txt")), "renamed.txt");
    }
}

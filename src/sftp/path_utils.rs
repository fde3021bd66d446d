//! Remote path utilities
//!
//! Remote SFTP paths always use `/` as separator, regardless of platform.

/// Suffix of zip-wrapped job results
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Check if a remote SFTP path is absolute.
pub fn is_absolute_remote_path(path: &str) -> bool {
    path.starts_with('/')
}

/// Join remote SFTP path components using `/` separator.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Resolve `path` against `cwd` unless it is already absolute
pub fn resolve_remote_path(cwd: &str, path: &str) -> String {
    if is_absolute_remote_path(path) {
        path.to_string()
    } else {
        join_remote_path(cwd, path.trim_start_matches("./"))
    }
}

/// Whether a job result is delivered as an archive
pub fn is_archive_path(path: &str) -> bool {
    path.ends_with(ARCHIVE_SUFFIX)
}

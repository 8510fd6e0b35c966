//! Input validation for client-supplied names.

/// Longest file name accepted from a client.
pub const MAX_FILENAME_LENGTH: usize = 256;

/// Whether `name` is a bare file name: no directory part, no traversal.
///
/// Allowed: alphanumeric, hyphen, underscore, dot.
pub fn is_bare_filename(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_LENGTH {
        return false;
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

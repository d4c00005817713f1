//! Lexical path handling for VEAP addresses.
//!
//! Purely string based: no lookups against the server are made, so `..` on a
//! relative path can never climb above the unknown base it will be joined to.

use crate::types::Address;

/// Returns the shortest address equivalent to `path` by lexical processing.
///
/// Repeated slashes and `.` elements are dropped, `..` removes the preceding
/// element. On absolute paths a leading `..` is eliminated; on relative paths
/// irreducible `..` runs are kept. A relative path that reduces to nothing
/// becomes `.`.
pub fn clean_path(path: &str) -> Address {
    let (abs, rest) = match path.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, path),
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." if abs || stack.last().map_or(false, |top| *top != "..") => {
                stack.pop();
            }
            _ => stack.push(segment),
        }
    }

    let joined = stack.join("/");
    if abs {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Resolves `path` against `base`.
///
/// Absolute targets are returned verbatim; they bypass the base entirely.
pub fn resolve_path(base: &str, path: &str) -> Address {
    if path.starts_with('/') {
        return path.to_string();
    }
    clean_path(&format!("{}/{}", base, path))
}

//! The blob naming rule and file-URL surgery.
//!
//! The rename rule is a single fixed substitution; there is deliberately no
//! pattern engine behind it. URL rewriting operates on the parsed path and
//! touches only the final segment, so a matching substring earlier in the
//! path is left alone.

use url::Url;

/// Literal substring replaced in every migrated blob name.
pub const RENAME_FROM: &str = "apolice";

/// Its replacement.
pub const RENAME_TO: &str = "bilhete";

/// Apply the rename rule to a blob base name.
///
/// Names without an occurrence of [`RENAME_FROM`] come back unchanged.
pub fn renamed_blob_name(old_name: &str) -> String {
    old_name.replace(RENAME_FROM, RENAME_TO)
}

/// Extract the blob name from a file URL: its final path segment.
///
/// Returns `None` for URLs that do not parse, have no path, or end in a
/// trailing slash.
pub fn blob_name_from_url(file_url: &str) -> Option<String> {
    let parsed = Url::parse(file_url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Rebuild a file URL with its final path segment replaced by `new_name`.
pub fn rewrite_file_url(file_url: &str, new_name: &str) -> Option<String> {
    let mut parsed = Url::parse(file_url).ok()?;
    {
        let mut segments = parsed.path_segments_mut().ok()?;
        segments.pop();
        segments.push(new_name);
    }
    Some(parsed.into())
}

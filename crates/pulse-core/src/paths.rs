//! Reductions applied to resource identifiers before anything leaves the process.

use std::borrow::Cow;

/// Final path segment of a path or URI, with query string and fragment
/// removed and percent-escapes decoded.
///
/// `file:///a/b/example.ts?hash=123` becomes `example.ts`.
pub fn final_segment(resource: &str) -> String {
    let without_query = resource
        .split(['?', '#'])
        .next()
        .unwrap_or(resource);
    let trimmed = without_query.trim_end_matches(['/', '\\']);
    let segment = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);

    match urlencoding::decode(segment) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => segment.to_string(),
    }
}

/// Lower-cased suffix after the last `.` of the file name, or the whole file
/// name when it has none.
pub fn extension_of(resource: &str) -> String {
    let name = final_segment(resource);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => name,
    }
}

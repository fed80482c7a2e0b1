/// Marker appended when text is cut short.
pub const ELLIPSIS: char = '…';

/// Cap `text` at `max_chars` characters, appending [`ELLIPSIS`] when anything
/// was removed. Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((boundary, _)) => {
            let mut cut = text[..boundary].to_string();
            cut.push(ELLIPSIS);
            cut
        }
    }
}

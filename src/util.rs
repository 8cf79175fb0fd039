use chrono::Local;

/// Marker appended when stored output has been cut at the byte cap.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Truncate `text` to at most `max_bytes` bytes on a char boundary, appending
/// [`TRUNCATION_MARKER`] when anything was dropped.
pub fn truncate_with_marker(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::with_capacity(max_bytes + TRUNCATION_MARKER.len());
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Wall-clock timestamp in the ledger's `YYYY-MM-DD HH:MM:SS` form.
pub fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_marker("hello", 2000), "hello");
    }

    #[test]
    fn long_text_is_cut_and_marked() {
        let text = "x".repeat(2500);
        let truncated = truncate_with_marker(&text, 2000);
        assert_eq!(truncated.len(), 2000 + TRUNCATION_MARKER.len());
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(100);
        let truncated = truncate_with_marker(&text, 5);
        assert!(truncated.starts_with("éé"));
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn timestamp_has_ledger_shape() {
        let stamp = timestamp_now();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
    }
}

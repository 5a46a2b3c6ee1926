/// The playground appends a `\n <sep>` marker to the final snapshot, and
/// mid-stream snapshots can end inside a partially transmitted marker.
/// Any of these suffixes hides the tail from the visible text.
const SEPARATOR_PREFIXES: [&str; 4] = ["\n <", "\n <s", "\n <se", "\n <sep"];

/// Byte offset where the visible portion of a cumulative snapshot ends.
/// Equals `text.len()` unless the text ends in a (possibly partial)
/// separator marker, in which case the marker is hidden.
pub fn visible_end(text: &str) -> usize {
    for suffix in SEPARATOR_PREFIXES {
        if text.ends_with(suffix) {
            return text.len() - suffix.len();
        }
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_fully_visible() {
        assert_eq!(visible_end("Hello"), 5);
        assert_eq!(visible_end(""), 0);
    }

    #[test]
    fn partial_marker_is_hidden() {
        assert_eq!(visible_end("Done\n <"), 4);
        assert_eq!(visible_end("Done\n <s"), 4);
        assert_eq!(visible_end("Done\n <se"), 4);
        assert_eq!(visible_end("Done\n <sep"), 4);
    }

    #[test]
    fn marker_lookalikes_mid_text_are_kept() {
        let text = "a\n <sep b";
        assert_eq!(visible_end(text), text.len());
    }

    #[test]
    fn angle_bracket_without_newline_is_kept() {
        assert_eq!(visible_end("x <sep"), 6);
    }
}

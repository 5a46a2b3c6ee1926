use bytes::Bytes;

/// Buffered splitter for the playground's line-oriented stream. Bytes
/// arrive in arbitrary chunks; complete lines come out in order. The
/// buffer is raw bytes and decoding happens per complete line, so a
/// multibyte character split across two chunks is reassembled intact.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, chunk: &Bytes) -> Vec<String> {
        self.push_raw(chunk)
    }

    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.push_raw(chunk.as_bytes())
    }

    fn push_raw(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(decode_line(line));
        }

        lines
    }

    /// Flushes a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.buffer);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(decode_line(line))
    }
}

fn decode_line(line: Vec<u8>) -> String {
    match String::from_utf8(line) {
        Ok(text) => text,
        // A complete line with broken UTF-8 is upstream's bug, not a
        // framing artifact; keep what is readable and let the snapshot
        // parser decide.
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Classification of one raw upstream line. Downstream handling stays
/// exhaustive over this instead of re-testing prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamLine {
    /// Candidate cumulative snapshot; carries the JSON payload text.
    Snapshot(String),
    /// The literal `event: message` marker. Carries no data.
    Control,
    Blank,
    Unrecognized(String),
}

pub fn classify_line(line: &str) -> UpstreamLine {
    if line.is_empty() {
        return UpstreamLine::Blank;
    }
    if let Some(rest) = line.strip_prefix("data:") {
        return UpstreamLine::Snapshot(rest.trim().to_string());
    }
    if line.starts_with('{') {
        return UpstreamLine::Snapshot(line.to_string());
    }
    if line.starts_with("event: message") {
        return UpstreamLine::Control;
    }
    UpstreamLine::Unrecognized(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_reassembles_split_lines() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push_str("data: {\"te").is_empty());
        let lines = decoder.push_str("xt\":\"Hi\"}\n\n");
        assert_eq!(lines, vec!["data: {\"text\":\"Hi\"}".to_string(), String::new()]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_reassembles_multibyte_char_split_across_chunks() {
        let full = "data: {\"type\":\"model\",\"text\":\"你好\"}\n";
        let bytes = full.as_bytes();
        // Split inside the 3-byte encoding of the first character.
        let cut = full.find('你').unwrap() + 1;

        let mut decoder = LineDecoder::new();
        assert!(decoder.push_bytes(&Bytes::copy_from_slice(&bytes[..cut])).is_empty());
        let lines = decoder.push_bytes(&Bytes::copy_from_slice(&bytes[cut..]));
        assert_eq!(lines, vec!["data: {\"type\":\"model\",\"text\":\"你好\"}".to_string()]);
    }

    #[test]
    fn decoder_strips_carriage_returns() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push_str("event: message\r\ndata: {}\r\n");
        assert_eq!(lines, vec!["event: message".to_string(), "data: {}".to_string()]);
    }

    #[test]
    fn decoder_flushes_unterminated_tail() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push_str("{\"type\":\"model\"}").is_empty());
        assert_eq!(decoder.finish(), Some("{\"type\":\"model\"}".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn unterminated_tail_keeps_non_ascii_intact() {
        let full = "{\"text\":\"héllo\"}";
        let bytes = full.as_bytes();
        let cut = full.find('é').unwrap() + 1;

        let mut decoder = LineDecoder::new();
        assert!(decoder.push_bytes(&Bytes::copy_from_slice(&bytes[..cut])).is_empty());
        assert!(decoder.push_bytes(&Bytes::copy_from_slice(&bytes[cut..])).is_empty());
        assert_eq!(decoder.finish(), Some(full.to_string()));
    }

    #[test]
    fn classify_covers_all_observed_shapes() {
        assert_eq!(
            classify_line("data: {\"type\":\"model\"}"),
            UpstreamLine::Snapshot("{\"type\":\"model\"}".to_string())
        );
        assert_eq!(
            classify_line("{\"type\":\"model\"}"),
            UpstreamLine::Snapshot("{\"type\":\"model\"}".to_string())
        );
        assert_eq!(classify_line("event: message"), UpstreamLine::Control);
        assert_eq!(classify_line(""), UpstreamLine::Blank);
        assert_eq!(
            classify_line("ping"),
            UpstreamLine::Unrecognized("ping".to_string())
        );
    }
}

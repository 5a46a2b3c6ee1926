use rekagate_protocol::openai::CompletionUsage;
use rekagate_protocol::reka::ModelSnapshot;

use crate::chat::separator;
use crate::error::{GatewayError, GatewayResult};

/// One increment reconstructed from a cumulative snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub content: String,
    /// `Some` on the terminal delta only.
    pub finish_reason: Option<String>,
    pub usage: CompletionUsage,
}

impl Delta {
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Turns the playground's cumulative snapshots into increments. The
/// cursor always advances to the full snapshot length, including any
/// trimmed separator tail; the playground resends the tail as part of
/// the next snapshot, so nothing visible is lost.
#[derive(Debug, Default)]
pub struct DeltaReconstructor {
    cursor: usize,
    finished: bool,
}

impl DeltaReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Applies one candidate snapshot line. `Ok(None)` means the line
    /// produced nothing to forward (a non-model event, or anything after
    /// the terminal snapshot); a parse failure is fatal for the request.
    pub fn apply(&mut self, line: &str) -> GatewayResult<Option<Delta>> {
        if self.finished {
            return Ok(None);
        }

        let snapshot: ModelSnapshot = serde_json::from_str(line)
            .map_err(|e| GatewayError::Decode(format!("malformed snapshot: {e}")))?;
        if !snapshot.is_model() {
            return Ok(None);
        }

        let end = separator::visible_end(&snapshot.text);
        let content = snapshot
            .text
            .get(self.cursor..end)
            .unwrap_or_default()
            .to_string();
        self.cursor = snapshot.text.len();

        let finish_reason = if snapshot.is_finished() {
            self.finished = true;
            Some("stop".to_string())
        } else {
            None
        };

        // Every model snapshot produces a chunk, even when no new text
        // is visible; usage counters still move.
        Ok(Some(Delta {
            content,
            finish_reason,
            usage: CompletionUsage {
                prompt_tokens: snapshot.metadata.input_tokens,
                completion_tokens: snapshot.metadata.generated_tokens,
                total_tokens: snapshot.metadata.input_tokens + snapshot.metadata.generated_tokens,
            },
        }))
    }
}

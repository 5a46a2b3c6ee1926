//! Reka playground wire types: the outbound chat payload and the
//! cumulative model snapshots the playground streams back.

use serde::{Deserialize, Deserializer, Serialize};

/// One turn of playground conversation history. The playground speaks
/// `human`/`model` rather than OpenAI role names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Human,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub conversation_history: Vec<ConversationTurn>,
    pub stream: bool,
    pub use_search_engine: bool,
    pub use_code_interpreter: bool,
    pub model_name: String,
    pub random_seed: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub generated_tokens: i64,
}

/// One streamed playground event. `text` is cumulative: every snapshot
/// carries the full response generated so far, not an increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
    /// Completion is signaled by the *presence* of the field, even when
    /// its value is null, so a plain `Option` is not enough.
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<Option<String>>,
}

impl ModelSnapshot {
    pub fn is_model(&self) -> bool {
        self.kind == "model"
    }

    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

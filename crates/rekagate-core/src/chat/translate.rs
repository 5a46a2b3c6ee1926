use rekagate_protocol::openai::CreateChatCompletionRequestBody;
use rekagate_protocol::reka::{ChatRequestBody, ConversationTurn, TurnKind};
use time::OffsetDateTime;

pub const DEFAULT_MODEL: &str = "reka-core";

/// Translates an inbound chat completion request into the playground's
/// payload. Returns the payload together with the model name echoed back
/// in every outbound chunk.
pub fn to_upstream(body: &CreateChatCompletionRequestBody) -> (ChatRequestBody, String) {
    let model = body
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let conversation_history = body
        .messages
        .iter()
        .map(|message| ConversationTurn {
            kind: match message.role.as_str() {
                "user" => TurnKind::Human,
                _ => TurnKind::Model,
            },
            text: message.content.clone(),
        })
        .collect();

    let payload = ChatRequestBody {
        conversation_history,
        stream: body.stream.unwrap_or(true),
        use_search_engine: false,
        use_code_interpreter: false,
        model_name: model.clone(),
        random_seed: OffsetDateTime::now_utc().unix_timestamp(),
    };

    (payload, model)
}

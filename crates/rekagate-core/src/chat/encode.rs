use bytes::Bytes;
use rekagate_protocol::openai::{
    ChatCompletionChunk, ChatCompletionChunkObjectType, ChatCompletionStreamChoice,
    ChatCompletionStreamDelta,
};
use time::OffsetDateTime;

use crate::chat::delta::Delta;
use crate::error::{GatewayError, GatewayResult};

pub const CHUNK_ID: &str = "chatcmpl-reka-ai";

/// Serializes one delta as an SSE data frame.
pub fn chunk_frame(delta: &Delta, model: &str) -> GatewayResult<Bytes> {
    let chunk = ChatCompletionChunk {
        id: CHUNK_ID.to_string(),
        object: ChatCompletionChunkObjectType::ChatCompletionChunk,
        created: OffsetDateTime::now_utc().unix_timestamp(),
        model: model.to_string(),
        choices: vec![ChatCompletionStreamChoice {
            index: 0,
            delta: ChatCompletionStreamDelta {
                role: "assistant".to_string(),
                content: delta.content.clone(),
            },
            finish_reason: delta.finish_reason.clone(),
        }],
        usage: delta.usage,
    };
    let json = serde_json::to_string(&chunk)
        .map_err(|e| GatewayError::Decode(format!("unable to serialize chunk: {e}")))?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// The terminal sentinel. Sent exactly once, after the terminal delta.
pub fn done_frame() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekagate_protocol::openai::CompletionUsage;

    fn delta(content: &str, finish: Option<&str>) -> Delta {
        Delta {
            content: content.to_string(),
            finish_reason: finish.map(str::to_string),
            usage: CompletionUsage {
                prompt_tokens: 1,
                completion_tokens: 2,
                total_tokens: 3,
            },
        }
    }

    #[test]
    fn frame_is_sse_data_line() {
        let frame = chunk_frame(&delta("Hi", None), "reka-core").unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("data: {"));
        assert!(text.ends_with("}\n\n"));

        let json: serde_json::Value =
            serde_json::from_str(text.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["id"], "chatcmpl-reka-ai");
        assert_eq!(json["model"], "reka-core");
        assert_eq!(json["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(json["choices"][0]["finish_reason"], serde_json::Value::Null);
    }

    #[test]
    fn terminal_frame_carries_finish_reason() {
        let frame = chunk_frame(&delta("", Some("stop")), "reka-core").unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(text.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn sentinel_is_verbatim() {
        assert_eq!(&done_frame()[..], b"data: [DONE]\n\n");
    }
}

use rekagate_protocol::openai::{CreateChatCompletionRequestBody, ListModelsResponse, Model};
use tracing::{info, warn};

use crate::chat::{self, EventStream, translate, upstream};
use crate::client::build_client;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::token::{LoginTokenSource, TokenStore};

const MODEL_CATALOG: [&str; 3] = ["reka-core", "reka-flash", "reka-edge"];
const MODEL_CATALOG_CREATED: i64 = 1_719_999_999;

/// Shared service state: one upstream client, one token store, one
/// config. Cloning is cheap on the client; the whole gateway lives in an
/// `Arc` at the router layer.
pub struct Gateway {
    config: GatewayConfig,
    client: wreq::Client,
    tokens: TokenStore<LoginTokenSource>,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let client = build_client(&config)?;
        let tokens = TokenStore::new(
            LoginTokenSource::new(client.clone(), config.clone()),
            config.fallback_token.clone(),
        );
        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    /// Runs one chat completion. Returns the echoed model name and the
    /// outbound frame stream; any error here happens before the first
    /// byte reaches the client.
    pub async fn chat_completions(
        &self,
        body: &CreateChatCompletionRequestBody,
        header_token: Option<&str>,
    ) -> GatewayResult<(String, EventStream)> {
        let token = self.tokens.bearer_for_request(header_token).await?;
        let (payload, model) = translate::to_upstream(body);
        let url = self.config.chat_url();

        let response = match upstream::open(&self.client, &url, &token, &payload).await {
            Ok(response) => response,
            // A cached token the expiry check liked can still be dead
            // upstream. Refresh once; header tokens are the caller's
            // problem.
            Err(GatewayError::Upstream { status: 401, .. }) if header_token.is_none() => {
                warn!(event = "token_rejected_upstream");
                self.tokens.invalidate().await;
                let token = self.tokens.bearer_for_request(None).await?;
                upstream::open(&self.client, &url, &token, &payload).await?
            }
            Err(err) => return Err(err),
        };

        info!(event = "chat_stream_opened", model = %model, turns = payload.conversation_history.len());
        Ok((model.clone(), chat::relay(response, model)))
    }

    pub fn list_models(&self) -> ListModelsResponse {
        ListModelsResponse {
            object: "list".to_string(),
            data: MODEL_CATALOG
                .iter()
                .map(|id| Model {
                    id: (*id).to_string(),
                    object: "model".to_string(),
                    created: MODEL_CATALOG_CREATED,
                    owned_by: "reka-ai".to_string(),
                })
                .collect(),
        }
    }
}

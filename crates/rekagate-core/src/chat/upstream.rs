use rekagate_protocol::reka::ChatRequestBody;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

/// Opens the streaming chat request. The caller gets the raw response
/// back once the status line is known to be good; body consumption
/// happens in the relay.
pub async fn open(
    client: &wreq::Client,
    url: &str,
    token: &str,
    payload: &ChatRequestBody,
) -> GatewayResult<wreq::Response> {
    debug!(event = "upstream_request", url, model = %payload.model_name, stream = payload.stream);

    let response = client
        .post(url)
        .header(wreq::header::AUTHORIZATION, format!("Bearer {token}"))
        .json(payload)
        .send()
        .await
        .map_err(|e| GatewayError::Transport(format!("chat request failed: {e}")))?;

    let status = response.status();
    if status.as_u16() == 429 {
        return Err(GatewayError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        // The body goes to the log, never back to the client.
        warn!(event = "upstream_error", status = status.as_u16(), body = %body.chars().take(512).collect::<String>());
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

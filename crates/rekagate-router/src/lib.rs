//! HTTP surface: the OpenAI-compatible routes plus the permissive CORS
//! handling browser clients need.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use rekagate_core::{Gateway, GatewayError};
use rekagate_protocol::openai::CreateChatCompletionRequestBody;
use tracing::{error, info};

/// Per-request token override header. Never cached.
pub const TOKEN_HEADER: &str = "x-reka-token";

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route(
            "/v1/chat/completions",
            axum::routing::post(chat_completions).options(preflight),
        )
        .route("/v1/models", get(list_models).options(preflight))
        .fallback(fallback)
        .with_state(gateway)
}

async fn chat_completions(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Json(body): Json<CreateChatCompletionRequestBody>,
) -> Response {
    let header_token = headers.get(TOKEN_HEADER).and_then(|value| value.to_str().ok());

    match gateway.chat_completions(&body, header_token).await {
        Ok((model, stream)) => {
            info!(event = "chat_completions", model = %model);
            // Relay errors after the first byte can only end the stream
            // early; the status line is already on the wire.
            let frames = stream.filter_map(|item| async move {
                match item {
                    Ok(frame) => Some(Ok::<_, Infallible>(frame)),
                    Err(err) => {
                        error!(event = "chat_stream_aborted", error = %err);
                        None
                    }
                }
            });

            let mut response = Response::new(Body::from_stream(frames));
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/event-stream"),
            );
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            apply_cors(headers);
            response
        }
        Err(err) => error_response(err),
    }
}

async fn list_models(State(gateway): State<Arc<Gateway>>) -> Response {
    let mut response = Json(gateway.list_models()).into_response();
    apply_cors(response.headers_mut());
    response
}

async fn preflight() -> Response {
    cors_ok()
}

/// The original surface answers preflight on any path, so unknown
/// OPTIONS requests get CORS headers rather than a 404.
async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return cors_ok();
    }
    StatusCode::NOT_FOUND.into_response()
}

fn cors_ok() -> Response {
    let mut response = StatusCode::OK.into_response();
    apply_cors(response.headers_mut());
    response
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
}

fn error_response(err: GatewayError) -> Response {
    error!(event = "chat_request_failed", status = err.http_status(), error = %err);
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, err.public_message().to_string()).into_response();
    apply_cors(response.headers_mut());
    response
}

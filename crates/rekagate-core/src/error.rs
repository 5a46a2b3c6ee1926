pub type GatewayResult<T> = Result<T, GatewayError>;

/// Request-scoped failure taxonomy. Every variant is handled at the HTTP
/// boundary and mapped to a status plus a short body; none of these crash
/// the process.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no access token was provided, nor a username and password")]
    Configuration,
    #[error("unable to obtain new access token: {0}")]
    Acquisition(String),
    #[error("rate limited by Reka AI")]
    RateLimited,
    #[error("unexpected response from upstream server: {status}")]
    Upstream { status: u16, body: String },
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("unable to decode upstream response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::RateLimited => 429,
            _ => 500,
        }
    }

    /// Short body returned to the client. Upstream bodies are not echoed
    /// back; they are logged instead.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::Configuration => "No usable upstream credentials",
            GatewayError::Acquisition(_) => "Unable to obtain upstream access token",
            GatewayError::RateLimited => "Rate limited by Reka AI",
            GatewayError::Upstream { .. } => "Unexpected response from upstream server",
            GatewayError::Transport(_) => "Unexpected upstream error",
            GatewayError::Decode(_) => "Unable to decode upstream response",
        }
    }
}

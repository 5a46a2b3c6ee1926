use std::time::Duration;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

/// Builds the shared upstream HTTP client. All egress (login, token
/// refresh, chat) goes through this client so the proxy and timeout
/// settings apply uniformly.
pub fn build_client(config: &GatewayConfig) -> GatewayResult<wreq::Client> {
    // Redirects are followed by hand during login so the final URL and
    // every Set-Cookie along the way stay visible.
    let mut builder = wreq::Client::builder().redirect(wreq::redirect::Policy::none());

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = wreq::Proxy::all(proxy_url)
            .map_err(|e| GatewayError::Transport(format!("invalid proxy `{proxy_url}`: {e}")))?;
        builder = builder.proxy(proxy);
    }
    if let Some(secs) = config.connect_timeout_secs {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder
        .build()
        .map_err(|e| GatewayError::Transport(format!("unable to build http client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        assert!(build_client(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn builds_with_timeouts() {
        let config = GatewayConfig {
            connect_timeout_secs: Some(10),
            request_timeout_secs: Some(300),
            ..GatewayConfig::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn rejects_malformed_proxy() {
        let config = GatewayConfig {
            proxy: Some("::not a url::".to_string()),
            ..GatewayConfig::default()
        };
        assert!(build_client(&config).is_err());
    }
}

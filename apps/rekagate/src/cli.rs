use clap::Parser;

use rekagate_core::GatewayConfig;

#[derive(Parser)]
#[command(name = "rekagate")]
pub(crate) struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    pub(crate) host: String,
    #[arg(long, default_value_t = 3031)]
    pub(crate) port: u16,
    /// Outbound forward proxy for all upstream traffic.
    #[arg(long, env = "PROXY")]
    pub(crate) proxy: Option<String>,
    #[arg(long, env = "REKA_USER")]
    pub(crate) reka_user: Option<String>,
    #[arg(long, env = "REKA_PASS")]
    pub(crate) reka_pass: Option<String>,
    /// Pre-provisioned access token, used when no credentials are set.
    #[arg(long, env = "REKA_TOKEN")]
    pub(crate) reka_token: Option<String>,
    /// `development` turns the default log filter up to debug.
    #[arg(long, env = "ENVIRONMENT", default_value = "production")]
    pub(crate) environment: String,
    /// Upstream connect timeout in seconds. No timeout when unset.
    #[arg(long)]
    pub(crate) connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds. Leave unset for streaming.
    #[arg(long)]
    pub(crate) request_timeout_secs: Option<u64>,
}

impl Cli {
    pub(crate) fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            proxy: self.proxy.clone(),
            username: self.reka_user.clone(),
            password: self.reka_pass.clone(),
            fallback_token: self.reka_token.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            request_timeout_secs: self.request_timeout_secs,
            ..GatewayConfig::default()
        }
    }
}

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_BASE: &str = "https://chat.reka.ai";
pub const DEFAULT_AUTH_BASE: &str = "https://auth.reka.ai";

/// Runtime configuration for the gateway. `chat_base`/`auth_base` exist
/// so tests can point the whole pipeline at a stub upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Optional outbound forward proxy for all upstream egress.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Login credentials used to mint fresh tokens.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Pre-provisioned bearer token usable without credentials.
    #[serde(default)]
    pub fallback_token: Option<String>,
    pub chat_base: String,
    pub auth_base: String,
    /// No timeouts by default; streaming responses can legitimately run
    /// for minutes.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            username: None,
            password: None,
            fallback_token: None,
            chat_base: DEFAULT_CHAT_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

impl GatewayConfig {
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.chat_base.trim_end_matches('/'))
    }

    pub fn login_url(&self) -> String {
        format!("{}/bff/auth/login", self.chat_base.trim_end_matches('/'))
    }

    pub fn access_token_url(&self) -> String {
        format!("{}/bff/auth/access_token", self.chat_base.trim_end_matches('/'))
    }

    pub fn auth_form_url(&self) -> String {
        format!("{}/u/login", self.auth_base.trim_end_matches('/'))
    }

    pub fn has_credentials(&self) -> bool {
        matches!((&self.username, &self.password), (Some(user), Some(pass))
            if !user.is_empty() && !pass.is_empty())
    }
}

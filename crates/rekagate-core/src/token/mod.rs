pub mod jwt;
pub mod login;

use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

/// Where fresh bearer tokens come from. The production source runs the
/// login simulation; tests substitute a canned one.
pub trait TokenSource: Send + Sync {
    fn acquire(&self) -> impl Future<Output = GatewayResult<String>> + Send;
}

/// Production source: the three-step login against the playground.
pub struct LoginTokenSource {
    client: wreq::Client,
    config: GatewayConfig,
}

impl LoginTokenSource {
    pub fn new(client: wreq::Client, config: GatewayConfig) -> Self {
        Self { client, config }
    }
}

impl TokenSource for LoginTokenSource {
    async fn acquire(&self) -> GatewayResult<String> {
        login::acquire(&self.client, &self.config).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    Refreshing,
}

/// Process-wide bearer token cache. At most one login runs at a time:
/// the Idle/Refreshing transition happens under `state`'s lock, so a
/// burst of requests with a stale token elects exactly one leader and
/// the rest wait on `gate` for its result.
pub struct TokenStore<S> {
    source: S,
    fallback: Option<String>,
    cached: RwLock<Option<String>>,
    state: Mutex<RefreshState>,
    gate: Notify,
}

impl<S: TokenSource> TokenStore<S> {
    pub fn new(source: S, fallback: Option<String>) -> Self {
        Self {
            source,
            fallback,
            cached: RwLock::new(None),
            state: Mutex::new(RefreshState::Idle),
            gate: Notify::new(),
        }
    }

    /// Resolves the bearer token for one request. A per-request header
    /// override wins outright and is never cached; otherwise the cached
    /// token is used while fresh and refreshed through the gate when not.
    pub async fn bearer_for_request(&self, header_override: Option<&str>) -> GatewayResult<String> {
        if let Some(token) = header_override {
            return Ok(token.to_string());
        }
        self.ensure_valid().await
    }

    /// Drops the cached token so the next request refreshes. Used when
    /// upstream rejects a token the expiry check still considered fresh.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn ensure_valid(&self) -> GatewayResult<String> {
        loop {
            if let Some(token) = self.fresh_cached().await {
                return Ok(token);
            }

            let wait = {
                let mut state = self.state.lock().await;
                // A refresh may have landed between the check above and
                // taking the lock.
                if let Some(token) = self.fresh_cached().await {
                    return Ok(token);
                }
                match *state {
                    RefreshState::Idle => {
                        *state = RefreshState::Refreshing;
                        None
                    }
                    RefreshState::Refreshing => Some(self.gate.notified()),
                }
            };

            match wait {
                Some(notified) => notified.await,
                None => return self.refresh_as_leader().await,
            }
        }
    }

    async fn refresh_as_leader(&self) -> GatewayResult<String> {
        let result = self.source.acquire().await;
        if let Ok(token) = &result {
            *self.cached.write().await = Some(token.clone());
            debug!(event = "token_refreshed");
        }
        *self.state.lock().await = RefreshState::Idle;
        self.gate.notify_waiters();

        match result {
            Ok(token) => Ok(token),
            // A configured fallback token still beats refusing the
            // request when no credentials exist to refresh with.
            Err(GatewayError::Configuration) => match &self.fallback {
                Some(token) => Ok(token.clone()),
                None => Err(GatewayError::Configuration),
            },
            Err(err) => {
                warn!(event = "token_refresh_failed", error = %err);
                Err(err)
            }
        }
    }

    async fn fresh_cached(&self) -> Option<String> {
        {
            let guard = self.cached.read().await;
            if let Some(token) = guard.as_ref()
                && !jwt::is_expired(token)
            {
                return Some(token.clone());
            }
        }
        // Seed from the configured fallback the first time through.
        if let Some(token) = &self.fallback
            && !jwt::is_expired(token)
        {
            let mut guard = self.cached.write().await;
            if guard.is_none() {
                *guard = Some(token.clone());
            }
            return Some(token.clone());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use time::OffsetDateTime;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let payload = URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{exp}}}").as_bytes());
        format!("{header}.{payload}.sig")
    }

    fn fresh_jwt() -> String {
        jwt_with_exp(OffsetDateTime::now_utc().unix_timestamp() + 3_600)
    }

    struct CountingSource {
        calls: AtomicUsize,
        token: String,
    }

    impl TokenSource for CountingSource {
        async fn acquire(&self) -> GatewayResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(self.token.clone())
        }
    }

    struct FailingSource;

    impl TokenSource for FailingSource {
        async fn acquire(&self) -> GatewayResult<String> {
            Err(GatewayError::Configuration)
        }
    }

    #[tokio::test]
    async fn header_override_wins_and_is_not_cached() {
        let store = TokenStore::new(FailingSource, None);
        let token = store.bearer_for_request(Some("per-request")).await;
        assert_eq!(token.ok().as_deref(), Some("per-request"));
        assert!(store.cached.read().await.is_none());
    }

    #[tokio::test]
    async fn fallback_used_without_credentials() {
        let store = TokenStore::new(FailingSource, Some(fresh_jwt()));
        assert!(store.bearer_for_request(None).await.is_ok());
    }

    #[tokio::test]
    async fn opaque_fallback_survives_configuration_error() {
        let store = TokenStore::new(FailingSource, Some("opaque-token".to_string()));
        let token = store.bearer_for_request(None).await;
        assert_eq!(token.ok().as_deref(), Some("opaque-token"));
    }

    #[tokio::test]
    async fn no_credentials_and_no_fallback_is_a_configuration_error() {
        let store = TokenStore::new(FailingSource, None);
        assert!(matches!(
            store.bearer_for_request(None).await,
            Err(GatewayError::Configuration)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_acquisition() {
        let store = Arc::new(TokenStore::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                token: fresh_jwt(),
            },
            None,
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.bearer_for_request(None).await
            }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(store.source.calls.load(Ordering::SeqCst), 1);
        assert!(tokens.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn expired_cache_triggers_refresh() {
        let store = TokenStore::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                token: fresh_jwt(),
            },
            None,
        );
        *store.cached.write().await = Some(jwt_with_exp(
            OffsetDateTime::now_utc().unix_timestamp() - 10,
        ));

        assert!(store.bearer_for_request(None).await.is_ok());
        assert_eq!(store.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_next_refresh() {
        let store = TokenStore::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                token: fresh_jwt(),
            },
            None,
        );
        store.bearer_for_request(None).await.unwrap();
        store.invalidate().await;
        store.bearer_for_request(None).await.unwrap();
        assert_eq!(store.source.calls.load(Ordering::SeqCst), 2);
    }
}

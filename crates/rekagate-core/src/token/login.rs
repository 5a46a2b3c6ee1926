use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

const MAX_REDIRECT_HOPS: usize = 10;

/// Minimal cookie jar for the login handshake. The auth flow bounces
/// between two hosts that share a session, so one name-keyed map is
/// enough; later values overwrite earlier ones like a browser would.
#[derive(Debug, Default)]
struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    fn absorb(&mut self, headers: &wreq::header::HeaderMap) {
        for value in headers.get_all(wreq::header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let pair = raw.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    fn header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    access_token: String,
}

/// Performs the three-step browser login and returns a fresh bearer
/// token. Steps: walk the login redirect chain to pick up the `state`
/// parameter, submit the credential form, then read the access token
/// off the session.
pub async fn acquire(client: &wreq::Client, config: &GatewayConfig) -> GatewayResult<String> {
    let (username, password) = match (&config.username, &config.password) {
        (Some(user), Some(pass)) => (user.clone(), pass.clone()),
        _ => return Err(GatewayError::Configuration),
    };

    let mut jar = CookieJar::default();

    let landing = follow_redirects(client, &mut jar, config.login_url()).await?;
    let state = query_param(&landing.url, "state").ok_or_else(|| {
        GatewayError::Acquisition(format!("login flow ended without a state parameter: {}", landing.url))
    })?;
    debug!(event = "login_state_obtained", url = %landing.url);

    let form_url = format!(
        "{}?state={}",
        config.auth_form_url(),
        urlencoding::encode(&state)
    );
    let mut request = client.post(&form_url).form(&[
        ("state", state.as_str()),
        ("action", "default"),
        ("username", username.as_str()),
        ("password", password.as_str()),
    ]);
    if let Some(cookie) = jar.header() {
        request = request.header(wreq::header::COOKIE, cookie);
    }
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::Acquisition(format!("credential form submit failed: {e}")))?;
    jar.absorb(response.headers());
    let status = response.status();
    if status.is_redirection() {
        let next = redirect_target(&form_url, response.headers()).ok_or_else(|| {
            GatewayError::Acquisition(format!("credential form redirect without location ({status})"))
        })?;
        follow_redirects(client, &mut jar, next).await?;
    } else if !status.is_success() {
        return Err(GatewayError::Acquisition(format!(
            "credential form rejected with status {status}"
        )));
    }

    let mut request = client.get(config.access_token_url());
    if let Some(cookie) = jar.header() {
        request = request.header(wreq::header::COOKIE, cookie);
    }
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::Acquisition(format!("access token fetch failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Acquisition(format!(
            "access token endpoint returned status {status}"
        )));
    }
    let body: AccessTokenResponse = response
        .json()
        .await
        .map_err(|e| GatewayError::Acquisition(format!("access token response unreadable: {e}")))?;
    if body.access_token.is_empty() {
        return Err(GatewayError::Acquisition(
            "access token response carried an empty token".to_string(),
        ));
    }
    Ok(body.access_token)
}

struct Landing {
    url: String,
}

/// GETs `url` and follows Location headers by hand, absorbing cookies
/// from every hop. Returns the first non-redirect stop.
async fn follow_redirects(
    client: &wreq::Client,
    jar: &mut CookieJar,
    url: String,
) -> GatewayResult<Landing> {
    let mut current = url;
    for _ in 0..MAX_REDIRECT_HOPS {
        let mut request = client.get(&current);
        if let Some(cookie) = jar.header() {
            request = request.header(wreq::header::COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Acquisition(format!("login request to {current} failed: {e}")))?;
        jar.absorb(response.headers());

        let status = response.status();
        if status.is_redirection() {
            let next = redirect_target(&current, response.headers()).ok_or_else(|| {
                GatewayError::Acquisition(format!("redirect without location from {current} ({status})"))
            })?;
            current = next;
            continue;
        }
        if !status.is_success() {
            return Err(GatewayError::Acquisition(format!(
                "login flow stopped at {current} with status {status}"
            )));
        }
        return Ok(Landing { url: current });
    }
    Err(GatewayError::Acquisition(
        "login flow exceeded the redirect limit".to_string(),
    ))
}

fn redirect_target(current: &str, headers: &wreq::header::HeaderMap) -> Option<String> {
    let location = headers
        .get(wreq::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    if location.starts_with("http://") || location.starts_with("https://") {
        return Some(location.to_string());
    }
    if location.starts_with('/') {
        return Some(format!("{}{}", origin_of(current)?, location));
    }
    None
}

/// `https://host[:port]` part of an absolute URL.
fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    match rest.find('/') {
        Some(path_start) => Some(&url[..scheme_end + 3 + path_start]),
        None => Some(url),
    }
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            return urlencoding::decode(value).ok().map(|v| v.into_owned());
        }
    }
    None
}

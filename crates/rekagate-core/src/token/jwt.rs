use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Extracts the `exp` claim from an unverified JWT payload. The gateway
/// never validates signatures; it only reads the expiry to decide when
/// to log in again.
fn expiry_of(token: &str) -> Result<Option<i64>, ()> {
    let payload = token.split('.').nth(1).ok_or(())?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.as_bytes()).map_err(|_| ())?;
    let claims: Claims = serde_json::from_slice(&decoded).map_err(|_| ())?;
    Ok(claims.exp)
}

/// A token whose payload cannot be decoded counts as expired so a
/// refresh replaces it rather than looping on upstream 401s. A decodable
/// payload without an `exp` claim never expires.
pub fn is_expired(token: &str) -> bool {
    match expiry_of(token) {
        Ok(Some(exp)) => exp < OffsetDateTime::now_utc().unix_timestamp(),
        Ok(None) => false,
        Err(()) => true,
    }
}

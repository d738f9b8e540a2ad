use crate::errors::AuthError;
use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "X-Signature";

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| anyhow!("invalid HMAC key: {e}"))
}

/// Base64 of HMAC-SHA256 over the raw body, sent as `X-Signature`.
pub fn sign_body(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check `signature` against `body`. The comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), AuthError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(AuthError::missing_signature)?;
    let expected = STANDARD
        .decode(signature)
        .map_err(|_| AuthError::invalid_signature())?;
    let mut mac = mac(secret).map_err(|_| AuthError::invalid_signature())?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| AuthError::invalid_signature())
}

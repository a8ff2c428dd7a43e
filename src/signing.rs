use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::DeliveryError;

type HmacSha256 = Hmac<Sha256>;

/// Headers produced when signing a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignatureHeaders {
    pub signature: (String, String),
    pub timestamp: Option<(String, String)>,
}

/// Sign `payload` with `secret`, optionally binding the current unix time.
pub(crate) fn build_signature_headers(
    secret: &[u8],
    payload: &[u8],
    signature_header: &str,
    timestamp_header: Option<&str>,
) -> Result<SignatureHeaders, DeliveryError> {
    let Some(timestamp_header) = timestamp_header else {
        let signature = compute_signature(secret, payload, None)?;
        return Ok(SignatureHeaders {
            signature: (signature_header.to_string(), signature),
            timestamp: None,
        });
    };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string();
    let signature = compute_signature(secret, payload, Some(&timestamp))?;

    Ok(SignatureHeaders {
        signature: (signature_header.to_string(), signature),
        timestamp: Some((timestamp_header.to_string(), timestamp)),
    })
}

/// Hex-encoded HMAC-SHA256 over `timestamp || payload`.
pub fn compute_signature(
    secret: &[u8],
    payload: &[u8],
    timestamp: Option<&str>,
) -> Result<String, DeliveryError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| DeliveryError::Signing(e.to_string()))?;
    if let Some(ts) = timestamp {
        mac.update(ts.as_bytes());
    }
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a received signature, for use on the receiving side.
pub fn verify_signature(
    secret: &[u8],
    payload: &[u8],
    timestamp: Option<&str>,
    signature_hex: &str,
) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    if let Some(ts) = timestamp {
        mac.update(ts.as_bytes());
    }
    mac.update(payload);

    mac.verify_slice(&signature).is_ok()
}

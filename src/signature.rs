//! GitHub webhook signature verification

use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a GitHub `X-Hub-Signature-256` header against the raw request body.
///
/// The header carries `sha256=` followed by the hex HMAC-SHA256 of the body
/// keyed by the shared secret. Comparison is constant-time via
/// [`Mac::verify_slice`]. A missing header is simply an invalid signature.
pub fn verify_github_signature(
    secret: &str,
    payload: &[u8],
    signature_header: Option<&str>,
) -> bool {
    let Some(signature_header) = signature_header else {
        return false;
    };

    // Expected format: "sha256=..."
    let expected_prefix = "sha256=";
    if !signature_header.starts_with(expected_prefix) {
        return false;
    }

    // signature from GitHub, hex-encoded
    let git_signature = &signature_header[expected_prefix.len()..];
    let git_signature_bytes = match hex_decode(git_signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    // Compute HMAC SHA256 over the raw body
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    // Constant-time comparison; wrong length is just unequal
    mac.verify_slice(&git_signature_bytes).is_ok()
}

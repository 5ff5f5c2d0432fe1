//! Message fingerprints.
//!
//! The fingerprint is the gossipsub message id, so it doubles as the
//! de-duplication key inside the router and as the join key in the logs.

/// Number of payload bytes that make it into a fingerprint
pub const FINGERPRINT_PREFIX_LEN: usize = 8;

/// Compute the fingerprint of a payload
///
/// Payloads longer than [`FINGERPRINT_PREFIX_LEN`] bytes are truncated and
/// marked with a trailing `...`.
pub fn fingerprint(payload: &[u8]) -> String {
    if payload.len() > FINGERPRINT_PREFIX_LEN {
        format!("{}...", hex::encode(&payload[..FINGERPRINT_PREFIX_LEN]))
    } else {
        hex::encode(payload)
    }
}

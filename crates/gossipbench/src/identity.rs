//! Deterministic node identities.
//!
//! Every node can compute every other node's peer id offline: the Ed25519 seed
//! is the node ordinal in little-endian followed by zero bytes.

use libp2p::{identity::Keypair, PeerId};

use crate::error::{ConfigError, IdentityError};

/// Length of an Ed25519 secret seed
pub const SEED_LEN: usize = 32;

/// Hostname prefix shared by every fleet member
pub const HOSTNAME_PREFIX: &str = "node";

/// Build the key seed for a node ordinal
pub fn seed_for(ordinal: u64) -> [u8; SEED_LEN] {
    let mut seed = [0u8; SEED_LEN];
    seed[..8].copy_from_slice(&ordinal.to_le_bytes());
    seed
}

/// Derive the Ed25519 keypair of a node ordinal
///
/// A 32-byte seed is always a valid Ed25519 secret, so an error here means the
/// crypto backend is broken rather than the input being bad.
pub fn derive_keypair(ordinal: u64) -> Result<Keypair, IdentityError> {
    let mut seed = seed_for(ordinal);
    Keypair::ed25519_from_bytes(&mut seed).map_err(|source| IdentityError { ordinal, source })
}

/// Derive the peer id of a node ordinal
pub fn peer_id_for(ordinal: u64) -> Result<PeerId, IdentityError> {
    Ok(derive_keypair(ordinal)?.public().to_peer_id())
}

/// Hostname of a node ordinal
pub fn hostname_for(ordinal: u64) -> String {
    format!("{HOSTNAME_PREFIX}{ordinal}")
}

/// Parse the node ordinal out of a `node<N>` hostname
///
/// Only the canonical form produced by [`hostname_for`] is accepted, so
/// `node007` or `node7.local` are rejected.
pub fn parse_ordinal(hostname: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::Hostname { hostname: hostname.to_string() };

    let digits = hostname.strip_prefix(HOSTNAME_PREFIX).ok_or_else(invalid)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(invalid());
    }

    digits.parse::<u64>().map_err(|_| invalid())
}

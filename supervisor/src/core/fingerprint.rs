//! Deterministic error fingerprints for failure clustering.
//!
//! A fingerprint is a coarse clustering key derived from a failing command's
//! identity, used to detect repeated identical failures (thrashing). It is
//! not a security hash: collisions across distinct-but-similar failures are
//! expected and acceptable.

use sha2::{Digest, Sha256};

use crate::core::types::CommandResult;

/// Fingerprint of a single failing command: first 8 hex characters of
/// `sha256("<cmd>:<exit_code>")`.
pub fn fingerprint_of(cmd: &str, exit_code: i32) -> String {
    let digest = Sha256::digest(format!("{cmd}:{exit_code}").as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// Derive a fingerprint from the first command result with a non-zero exit
/// code. Returns `None` when every command succeeded.
pub fn derive_fingerprint(results: &[CommandResult]) -> Option<String> {
    let failed = results.iter().find(|result| result.exit_code != 0)?;
    Some(fingerprint_of(&failed.cmd, failed.exit_code))
}

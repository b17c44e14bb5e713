//! Authority keypair files
//!
//! A keypair file is a JSON array of bytes: either the 32-byte secret alone or
//! the 64-byte secret followed by its public key.

use std::path::Path;

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;

pub fn load_authority(path: &Path) -> Result<SigningKey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading keypair {}", path.display()))?;
    parse_keypair(&text).with_context(|| format!("keypair {}", path.display()))
}

fn parse_keypair(text: &str) -> Result<SigningKey> {
    let bytes: Vec<u8> =
        serde_json::from_str(text).context("expected a JSON array of bytes")?;
    if bytes.len() != 32 && bytes.len() != 64 {
        bail!("expected 32 or 64 bytes, found {}", bytes.len());
    }

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&bytes[..32]);
    let key = SigningKey::from_bytes(&secret);

    if bytes.len() == 64 && key.verifying_key().as_bytes()[..] != bytes[32..] {
        bail!("public key does not match secret key");
    }
    Ok(key)
}

/// Write `key` in the 64-byte form
pub fn save_authority(path: &Path, key: &SigningKey) -> Result<()> {
    let bytes = key.to_keypair_bytes().to_vec();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(&bytes)?)
        .with_context(|| format!("writing keypair {}", path.display()))
}

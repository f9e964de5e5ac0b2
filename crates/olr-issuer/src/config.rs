//! Environment-sourced configuration, resolved once at process start.

use std::fmt;
use std::path::PathBuf;

use olr_core::{Keypair, Result};

/// Default issuer identity for development deployments.
pub const DEFAULT_ISSUER: &str = "did:web:openline.local";
/// Default key id.
pub const DEFAULT_KID: &str = "dev-1";
/// Default host recorded in capture `where` blocks.
pub const DEFAULT_HOST: &str = "api";
/// Default store root.
pub const DEFAULT_RECEIPTS_DIR: &str = "docs";

/// Where the process signing key comes from.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Operator-supplied hex secret (production).
    HexSecret(String),
    /// Deterministic key hashed from a seed phrase (development).
    Seed(String),
    /// Fresh random key; does not survive a restart.
    Ephemeral,
}

impl KeyMaterial {
    /// Resolve from optional environment values, in priority order:
    /// hex secret, then seed, then ephemeral.
    pub fn resolve(hex_secret: Option<String>, seed: Option<String>) -> Self {
        match (non_empty(hex_secret), non_empty(seed)) {
            (Some(hex), _) => Self::HexSecret(hex),
            (None, Some(seed)) => Self::Seed(seed),
            (None, None) => Self::Ephemeral,
        }
    }

    /// Build the process signing key.
    ///
    /// Unusable key material is fatal: the caller must not serve signing
    /// requests after this fails.
    pub fn into_keypair(self) -> Result<Keypair> {
        match self {
            Self::HexSecret(hex) => Keypair::from_hex(&hex),
            Self::Seed(seed) => Ok(Keypair::derive(&seed)),
            Self::Ephemeral => {
                tracing::warn!(
                    "no signing key configured; using an ephemeral key that will not \
                     survive a restart (unsuitable for production)"
                );
                Ok(Keypair::generate())
            }
        }
    }
}

// Key material never appears in logs or panic messages.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HexSecret(_) => f.write_str("KeyMaterial::HexSecret(..)"),
            Self::Seed(_) => f.write_str("KeyMaterial::Seed(..)"),
            Self::Ephemeral => f.write_str("KeyMaterial::Ephemeral"),
        }
    }
}

/// Issuer configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identifier of the signing authority, stable per deployment.
    pub issuer: String,
    /// Key id published in receipts and the issuer key document.
    pub kid: String,
    /// Host recorded in capture `where` blocks.
    pub host: String,
    /// Root directory for the filesystem store.
    pub receipts_root: PathBuf,
    /// Signing key source.
    pub key: KeyMaterial,
}

impl Config {
    /// Read configuration from the environment:
    /// `ISSUER_DID`, `KEY_ID`, `HOSTNAME`, `RECEIPTS_DIR`,
    /// `SIGNING_SK_HEX` (hex secret) and `DEV_SEED` (seed phrase).
    pub fn from_env() -> Self {
        Self {
            issuer: env_or("ISSUER_DID", DEFAULT_ISSUER),
            kid: env_or("KEY_ID", DEFAULT_KID),
            host: env_or("HOSTNAME", DEFAULT_HOST),
            receipts_root: env_or("RECEIPTS_DIR", DEFAULT_RECEIPTS_DIR).into(),
            key: KeyMaterial::resolve(
                std::env::var("SIGNING_SK_HEX").ok(),
                std::env::var("DEV_SEED").ok(),
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.into(),
            kid: DEFAULT_KID.into(),
            host: DEFAULT_HOST.into(),
            receipts_root: DEFAULT_RECEIPTS_DIR.into(),
            key: KeyMaterial::Ephemeral,
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use olr_core::CoreError;

    #[test]
    fn test_resolve_priority() {
        assert!(matches!(
            KeyMaterial::resolve(Some("ab".repeat(32)), Some("seed".into())),
            KeyMaterial::HexSecret(_)
        ));
        assert!(matches!(
            KeyMaterial::resolve(None, Some("seed".into())),
            KeyMaterial::Seed(_)
        ));
        assert!(matches!(
            KeyMaterial::resolve(Some(String::new()), None),
            KeyMaterial::Ephemeral
        ));
    }

    #[test]
    fn test_seed_material_deterministic() {
        let pk1 = KeyMaterial::Seed("seed".into())
            .into_keypair()
            .unwrap()
            .public_key();
        let pk2 = KeyMaterial::Seed("seed".into())
            .into_keypair()
            .unwrap()
            .public_key();
        assert_eq!(pk1, pk2);
    }

    #[test]
    fn test_short_hex_secret_is_fatal() {
        let result = KeyMaterial::HexSecret("abcd".into()).into_keypair();
        assert!(matches!(result, Err(CoreError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let secret = KeyMaterial::HexSecret("ab".repeat(32));
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("abab"));
    }
}

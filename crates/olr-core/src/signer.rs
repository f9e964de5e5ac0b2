//! The signer: a process-lifetime signing identity.
//!
//! Created once at startup from configured key material and shared
//! read-only across requests. Signing is a pure function of the canonical
//! message bytes and the fixed key, so no synchronization is needed.

use serde_json::{Map, Value};

use crate::canonical::canonical_bytes;
use crate::crypto::{Keypair, PublicKey};
use crate::error::Result;

/// A signing identity: a keypair plus the key id published with every
/// receipt it seals.
#[derive(Debug, Clone)]
pub struct Signer {
    keypair: Keypair,
    kid: String,
}

impl Signer {
    /// Wrap a keypair under the given key id.
    pub fn new(keypair: Keypair, kid: impl Into<String>) -> Self {
        Self {
            keypair,
            kid: kid.into(),
        }
    }

    /// The key id recorded in the `kid` field of sealed receipts.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The verifying key for this signer.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Hex encoding of the public key, stable for the process lifetime.
    pub fn public_key_hex(&self) -> String {
        self.public_key().to_hex()
    }

    /// Sign a record's fields, returning the lowercase hex signature.
    ///
    /// The record is canonicalized first (top-level `sig` excluded), so the
    /// signature never covers itself. Canonicalization errors propagate;
    /// the signer does not swallow them.
    pub fn sign_fields(&self, fields: &Map<String, Value>) -> Result<String> {
        let message = canonical_bytes(fields)?;
        Ok(self.keypair.sign(&message).to_hex())
    }
}

//! Error types for the OpenLine receipt core.

use thiserror::Error;

/// Errors that can occur while assembling or verifying receipts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A non-capture receipt was requested without a usable parent rid.
    ///
    /// This is a client error: the request is rejected before any signing
    /// or storage attempt.
    #[error("parent required")]
    MissingParent,

    /// Configured key material cannot produce a signing key.
    ///
    /// Fatal at startup; the process must not serve signing requests.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A field value could not be deterministically serialized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] serde_json::Error),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// A record does not have the structure of a sealed receipt.
    #[error("malformed receipt: {0}")]
    MalformedReceipt(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

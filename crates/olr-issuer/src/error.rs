//! Error types for the issuer service.

use thiserror::Error;

use olr_core::CoreError;
use olr_store::StoreError;

/// Errors surfaced by the issuer service.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// The request payload does not deserialize into the variant's typed
    /// parameters.
    #[error("invalid request payload: {0}")]
    InvalidPayload(serde_json::Error),

    /// Core error (missing parent, canonicalization, key material).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage error: the receipt was NOT issued, regardless of whether
    /// signing succeeded.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl IssuerError {
    /// Whether this error is the caller's fault (maps to a 4xx at the HTTP
    /// layer) rather than a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload(_)
                | Self::Core(CoreError::MissingParent)
                | Self::Core(CoreError::Canonicalization(_))
        )
    }
}

/// Result type for issuer operations.
pub type Result<T> = std::result::Result<T, IssuerError>;

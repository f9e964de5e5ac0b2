//! Store trait: the minimal interface for receipt persistence.

use serde::{Deserialize, Serialize};

use olr_core::{Receipt, Rid};

use crate::error::Result;

/// Result of persisting a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistResult {
    /// The receipt was written.
    Persisted,
    /// The exact same receipt was already persisted (idempotent, not an
    /// error). A different receipt under the same rid is a
    /// [`StoreError::RidCollision`](crate::StoreError::RidCollision).
    AlreadyExists,
}

/// The issuer public-key document, published once per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerKeyRecord {
    pub issuer: String,
    pub kid: String,
    pub ed25519_public_key_hex: String,
}

/// The store trait: append-only persistence for sealed receipts.
///
/// The per-rid records are the authoritative log. The "latest" pointer is
/// a best-effort convenience cache that can be rebuilt from the log; under
/// concurrent persists it is last-writer-wins.
pub trait ReceiptStore: Send + Sync {
    /// Persist a sealed receipt under its rid and refresh the latest
    /// pointer.
    ///
    /// The per-rid write happens first, so a crash between the two writes
    /// leaves at worst a stale pointer, never a missing permanent record.
    fn persist(&self, receipt: &Receipt) -> Result<PersistResult>;

    /// Publish the issuer key document if absent. First writer wins; an
    /// existing document is never overwritten.
    ///
    /// Returns `true` if this call wrote the document.
    fn publish_issuer_key(&self, record: &IssuerKeyRecord) -> Result<bool>;

    /// Load a receipt by rid.
    fn load(&self, rid: &Rid) -> Result<Option<Receipt>>;

    /// The most recently persisted receipt, if any.
    fn latest(&self) -> Result<Option<Receipt>>;
}

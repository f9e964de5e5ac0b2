//! In-memory store for tests and simple embedding.

use std::collections::HashMap;
use std::sync::RwLock;

use olr_core::{Receipt, Rid};

use crate::error::{Result, StoreError};
use crate::traits::{IssuerKeyRecord, PersistResult, ReceiptStore};

/// In-memory implementation of the store contract.
///
/// Honors the same append-only semantics as [`FsStore`](crate::FsStore):
/// identical re-persists are idempotent, rid collisions fail, and the
/// issuer key record is first-writer-wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    receipts: RwLock<HashMap<String, Receipt>>,
    latest: RwLock<Option<Receipt>>,
    issuer_key: RwLock<Option<IssuerKeyRecord>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted receipts.
    pub fn count(&self) -> usize {
        self.receipts.read().unwrap().len()
    }
}

impl ReceiptStore for MemoryStore {
    fn persist(&self, receipt: &Receipt) -> Result<PersistResult> {
        let mut receipts = self.receipts.write().unwrap();
        let key = receipt.rid().to_string();

        let result = match receipts.get(&key) {
            Some(existing) if existing == receipt => PersistResult::AlreadyExists,
            Some(_) => return Err(StoreError::RidCollision { rid: key }),
            None => {
                receipts.insert(key, receipt.clone());
                PersistResult::Persisted
            }
        };
        *self.latest.write().unwrap() = Some(receipt.clone());
        Ok(result)
    }

    fn publish_issuer_key(&self, record: &IssuerKeyRecord) -> Result<bool> {
        let mut slot = self.issuer_key.write().unwrap();
        if slot.is_some() {
            return Ok(false);
        }
        *slot = Some(record.clone());
        Ok(true)
    }

    fn load(&self, rid: &Rid) -> Result<Option<Receipt>> {
        Ok(self.receipts.read().unwrap().get(rid.as_str()).cloned())
    }

    fn latest(&self) -> Result<Option<Receipt>> {
        Ok(self.latest.read().unwrap().clone())
    }
}

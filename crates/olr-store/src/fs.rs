//! Filesystem implementation of the store.
//!
//! Layout under the store root:
//! - `receipts/{variant-dir}/{rid}.json` — one immutable file per receipt
//! - `receipt.latest.json` — mutable pointer to the most recent receipt
//! - `issuer.pub.json` — the issuer key document, written once
//!
//! All files are pretty-printed JSON with sorted keys so the audit trail
//! stays human-readable.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use olr_core::canonical::escape_non_ascii;
use olr_core::{Receipt, Rid};

use crate::error::{Result, StoreError};
use crate::traits::{IssuerKeyRecord, PersistResult, ReceiptStore};

/// Filesystem-backed receipt store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`. Directories are created lazily on
    /// first write.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn receipt_path(&self, rid: &Rid) -> PathBuf {
        self.root
            .join("receipts")
            .join(rid.kind().dir_name())
            .join(format!("{rid}.json"))
    }

    fn latest_path(&self) -> PathBuf {
        self.root.join("receipt.latest.json")
    }

    fn issuer_key_path(&self) -> PathBuf {
        self.root.join("issuer.pub.json")
    }

    fn read_receipt(&self, path: &Path) -> Result<Option<Receipt>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: Value = serde_json::from_slice(&bytes)?;
        let receipt =
            Receipt::from_value(value).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(Some(receipt))
    }
}

impl ReceiptStore for FsStore {
    fn persist(&self, receipt: &Receipt) -> Result<PersistResult> {
        let path = self.receipt_path(receipt.rid());
        let bytes = pretty_sorted(&receipt.to_value())?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        // create_new makes the per-rid write atomic: of two concurrent
        // writers, exactly one creates the file and the other sees
        // AlreadyExists.
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // Permanent record first; a crash here leaves at worst a
                // stale latest pointer.
                file.write_all(&bytes)?;
                fs::write(self.latest_path(), &bytes)?;
                tracing::debug!(rid = %receipt.rid(), path = %path.display(), "persisted receipt");
                Ok(PersistResult::Persisted)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let existing = fs::read(&path)?;
                if existing != bytes {
                    return Err(StoreError::RidCollision {
                        rid: receipt.rid().to_string(),
                    });
                }
                // Idempotent re-persist still refreshes the pointer.
                fs::write(self.latest_path(), &bytes)?;
                Ok(PersistResult::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn publish_issuer_key(&self, record: &IssuerKeyRecord) -> Result<bool> {
        let path = self.issuer_key_path();
        let bytes = pretty_sorted(&serde_json::to_value(record)?)?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        // create_new is the first-writer-wins guard: a published key
        // document is never overwritten, even across restarts with
        // different key material.
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(&bytes)?;
                tracing::info!(path = %path.display(), kid = %record.kid, "published issuer key");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self, rid: &Rid) -> Result<Option<Receipt>> {
        self.read_receipt(&self.receipt_path(rid))
    }

    fn latest(&self) -> Result<Option<Receipt>> {
        self.read_receipt(&self.latest_path())
    }
}

/// Render a JSON value as pretty-printed bytes with keys sorted at every
/// level and non-ASCII escaped. This is the on-disk audit format, not the
/// signing input.
fn pretty_sorted(value: &Value) -> Result<Vec<u8>> {
    let text = serde_json::to_string_pretty(&sorted(value))?;
    Ok(escape_non_ascii(&text).into_bytes())
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), sorted(&map[k.as_str()])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

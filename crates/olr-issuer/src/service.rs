//! The issuer service: builds, signs, and persists receipts.
//!
//! One instance per process, created at startup and shared read-only
//! across request handlers. Signing and persistence are a single logical
//! operation from the caller's perspective: if persistence fails, the
//! receipt was not issued.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use olr_core::{
    CaptureParams, EvalParams, LabelParams, PromoteParams, PublicKey, Receipt, ReceiptBuilder,
    Signer,
};
use olr_store::{IssuerKeyRecord, ReceiptStore};

use crate::config::Config;
use crate::error::{IssuerError, Result};

/// Response body for a `/health`-style endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub ok: bool,
    pub issuer: String,
    pub kid: String,
}

/// The receipt issuer: signer, identity, and store behind one API.
pub struct ReceiptService<S: ReceiptStore> {
    issuer: String,
    host: String,
    signer: Signer,
    store: S,
}

impl<S: ReceiptStore> ReceiptService<S> {
    /// Build a service from resolved configuration and a store.
    ///
    /// Fails if the configured key material is unusable; the process must
    /// not serve signing requests in that case.
    pub fn from_config(config: Config, store: S) -> Result<Self> {
        let keypair = config.key.into_keypair()?;
        Ok(Self {
            issuer: config.issuer,
            host: config.host,
            signer: Signer::new(keypair, config.kid),
            store,
        })
    }

    /// Issue a capture receipt (root of a lineage).
    pub fn capture(&self, payload: Value) -> Result<Receipt> {
        let params: CaptureParams = parse_payload(payload)?;
        let receipt = self.builder().capture(params)?;
        self.commit(receipt)
    }

    /// Issue an eval receipt; the payload must carry a non-empty `parent`.
    pub fn eval(&self, payload: Value) -> Result<Receipt> {
        let params: EvalParams = parse_payload(payload)?;
        let receipt = self.builder().eval(params)?;
        self.commit(receipt)
    }

    /// Issue a label receipt; the payload must carry a non-empty `parent`.
    pub fn label(&self, payload: Value) -> Result<Receipt> {
        let params: LabelParams = parse_payload(payload)?;
        let receipt = self.builder().label(params)?;
        self.commit(receipt)
    }

    /// Issue a promotion receipt; the payload must carry a non-empty
    /// `parent`.
    pub fn promote(&self, payload: Value) -> Result<Receipt> {
        let params: PromoteParams = parse_payload(payload)?;
        let receipt = self.builder().promote(params)?;
        self.commit(receipt)
    }

    /// The issuer identity string.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The active key id.
    pub fn kid(&self) -> &str {
        self.signer.kid()
    }

    /// The verifying key for receipts issued by this process.
    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    /// Hex encoding of the public key, stable for the process lifetime.
    pub fn public_key_hex(&self) -> String {
        self.signer.public_key_hex()
    }

    /// Liveness summary for the HTTP collaborator.
    pub fn health(&self) -> Health {
        Health {
            ok: true,
            issuer: self.issuer.clone(),
            kid: self.signer.kid().to_string(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn builder(&self) -> ReceiptBuilder<'_> {
        ReceiptBuilder::new(&self.signer, &self.issuer).host(&self.host)
    }

    fn commit(&self, receipt: Receipt) -> Result<Receipt> {
        self.store.persist(&receipt)?;
        // Lazy one-time publication; the store enforces first-writer-wins.
        self.store.publish_issuer_key(&IssuerKeyRecord {
            issuer: self.issuer.clone(),
            kid: self.signer.kid().to_string(),
            ed25519_public_key_hex: self.signer.public_key_hex(),
        })?;
        tracing::info!(rid = %receipt.rid(), kind = ?receipt.kind(), "issued receipt");
        Ok(receipt)
    }
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(IssuerError::InvalidPayload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyMaterial;
    use olr_store::MemoryStore;
    use serde_json::json;

    fn service() -> ReceiptService<MemoryStore> {
        let config = Config {
            key: KeyMaterial::Seed("service-test-seed".into()),
            ..Config::default()
        };
        ReceiptService::from_config(config, MemoryStore::new()).unwrap()
    }

    #[test]
    fn test_capture_then_eval_chain() {
        let svc = service();

        let capture = svc.capture(json!({"metrics": {"a": 1}})).unwrap();
        capture.verify(&svc.public_key()).unwrap();

        let eval = svc.eval(json!({"parent": capture.rid().as_str()})).unwrap();
        assert_eq!(eval.parent(), Some(capture.rid().as_str()));
        eval.verify(&svc.public_key()).unwrap();

        assert_eq!(svc.store().count(), 2);
        assert_eq!(svc.store().latest().unwrap().unwrap().rid(), eval.rid());
    }

    #[test]
    fn test_eval_without_parent_persists_nothing() {
        let svc = service();

        let err = svc.eval(json!({})).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(svc.store().count(), 0);

        let err = svc.eval(json!({"parent": ""})).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(svc.store().count(), 0);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let svc = service();
        // flags must be an array of strings
        let err = svc.capture(json!({"flags": 42})).unwrap_err();
        assert!(matches!(err, IssuerError::InvalidPayload(_)));
        assert!(err.is_client_error());
        assert_eq!(svc.store().count(), 0);
    }

    #[test]
    fn test_health_and_key_accessors() {
        let svc = service();
        let health = svc.health();
        assert!(health.ok);
        assert_eq!(health.issuer, svc.issuer());
        assert_eq!(health.kid, svc.kid());
        assert_eq!(svc.public_key_hex().len(), 64);
    }
}

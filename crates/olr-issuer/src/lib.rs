//! # OpenLine Receipt Issuer
//!
//! The unified API for issuing signed workflow receipts: configuration,
//! signing identity, and persistence behind one service.
//!
//! ## Overview
//!
//! Receipts document a linear workflow over an experimental artifact:
//!
//! - **capture** - the artifact enters the amber loop (root, no parent)
//! - **eval** - a variant evaluated against it
//! - **label** - an adjudication on a prior receipt
//! - **promote** - terminal promotion to gold
//!
//! Every receipt is canonical-JSON-signed with the process Ed25519 key and
//! persisted append-only; non-capture receipts must name a parent rid.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use olr_issuer::{Config, ReceiptService};
//! use olr_store::FsStore;
//! use serde_json::json;
//!
//! let config = Config::from_env();
//! let store = FsStore::open(config.receipts_root.clone());
//! let service = ReceiptService::from_config(config, store).unwrap();
//!
//! let capture = service.capture(json!({"metrics": {"kappa": 0.78}})).unwrap();
//! let eval = service
//!     .eval(json!({"parent": capture.rid().as_str()}))
//!     .unwrap();
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `olr_issuer::core` - canonicalization, signing, receipt assembly
//! - `olr_issuer::store` - persistence backends

pub mod config;
pub mod error;
pub mod service;

// Re-export component crates
pub use olr_core as core;
pub use olr_store as store;

// Re-export main types for convenience
pub use config::{Config, KeyMaterial};
pub use error::{IssuerError, Result};
pub use service::{Health, ReceiptService};

// Re-export commonly used component types
pub use olr_core::{
    CaptureParams, EvalParams, Keypair, LabelParams, PromoteParams, PublicKey, Receipt,
    ReceiptBuilder, ReceiptKind, Rid, Signer,
};
pub use olr_store::{FsStore, IssuerKeyRecord, MemoryStore, PersistResult, ReceiptStore};

//! # OpenLine Receipts Core
//!
//! Pure primitives for OpenLine receipts: canonicalization, key material,
//! and receipt assembly.
//!
//! This crate contains no I/O. It is pure computation over cryptographic
//! data structures.
//!
//! ## Key Types
//!
//! - [`Receipt`] - A sealed, signed record of one workflow step
//! - [`Rid`] - The receipt identifier, prefixed by variant
//! - [`Signer`] - The process-lifetime signing identity
//! - [`ReceiptBuilder`] - Assembles and seals the four receipt variants
//!
//! ## Canonicalization
//!
//! Signatures cover compact JSON with sorted keys and the `sig` field
//! excluded. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod receipt;
pub mod signer;

pub use canonical::{canonical_bytes, SIG_FIELD};
pub use crypto::{Keypair, PublicKey, SignatureBytes};
pub use error::{CoreError, Result};
pub use receipt::{
    now_iso, CaptureParams, EvalParams, LabelParams, PromoteParams, Receipt, ReceiptBuilder,
    ReceiptKind, Rid,
};
pub use signer::Signer;

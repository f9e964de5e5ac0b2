//! # OpenLine Receipts Store
//!
//! Append-only persistence for sealed receipts.
//!
//! The authoritative log is one immutable file per receipt, keyed by rid.
//! A mutable "latest" pointer mirrors the most recent persist, and the
//! issuer public-key document is published exactly once per deployment.
//!
//! Backends:
//! - [`FsStore`] - filesystem, the production backend
//! - [`MemoryStore`] - in-memory, for tests

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use traits::{IssuerKeyRecord, PersistResult, ReceiptStore};

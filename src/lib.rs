//! credscan: read-only scanner and decryptor for encrypted credential stores
//!
//! Recovers credentials from a store kept in a page-structured database file
//! without linking the database engine:
//! - Bounds-checked walk of leaf table pages, cells and record headers
//! - Fixed column layout (site, account, secret) with plausibility filters
//! - Key token extraction and account-scoped key unwrap via a pluggable capability
//! - AES-GCM decryption of each sealed secret, authenticated or discarded
//!
//! The store is never written. Scanning and decryption are lazy iterators;
//! see [`storage::scanner::Scanner`] and [`pipeline::StoreSession`].

pub mod config;
pub mod crypto;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use crate::config::{Config, DecryptConfig, ScanLimits};
pub use crate::crypto::unwrap::{MasterKey, UnwrapCapability};
pub use crate::error::{CredScanError, DecryptFailure, Result};
pub use crate::pipeline::{Pipeline, ResultSink, RunSummary, StoreInput, StoreReport};
pub use crate::storage::scanner::{scan, ScanStats, Scanner};
pub use crate::types::{CellLocation, CredentialTuple, DecryptedCredential};

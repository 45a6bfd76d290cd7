//! Store-by-store driver: key artifact → master key → scan → decrypt.
//!
//! This is the only module that opens files. Each store gets its own
//! `StoreSession`; nothing but the run totals outlives a store.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::crypto::aead::RecordCipher;
use crate::crypto::token::extract_key_token;
use crate::crypto::unwrap::{unwrap_master_key, MasterKey, UnwrapCapability};
use crate::error::{CredScanError, Result};
use crate::storage::scanner::{ScanStats, Scanner};
use crate::types::DecryptedCredential;

/// One logical store as supplied by the caller's locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInput {
    pub name: String,
    /// Structured text file carrying the base64 key token.
    pub key_artifact: PathBuf,
    /// Page-structured database file.
    pub database: PathBuf,
}

/// Outcome of processing one store.
#[derive(Debug)]
pub struct StoreReport {
    pub name: String,
    pub scan: ScanStats,
    pub decrypted: u64,
    /// Tuples found but not decrypted (bad marker, truncated, tag mismatch).
    pub rejected: u64,
    /// Set when the store was abandoned before or during setup.
    pub error: Option<CredScanError>,
}

impl StoreReport {
    fn aborted(name: &str, error: CredScanError) -> Self {
        StoreReport {
            name: name.to_string(),
            scan: ScanStats::default(),
            decrypted: 0,
            rejected: 0,
            error: Some(error),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stores: usize,
    pub stores_aborted: usize,
    pub tuples_found: u64,
    pub decrypted: u64,
    pub rejected: u64,
}

/// Receives results as they are produced.
pub trait ResultSink {
    fn credential(&mut self, store: &str, credential: &DecryptedCredential);

    fn store_finished(&mut self, _report: &StoreReport) {}

    fn run_finished(&mut self, _summary: &RunSummary) {}
}

/// Lazily decrypted credentials of a single store.
///
/// Owns the record cipher for that store. Dropping the session drops the
/// cipher, and the AES key schedule is zeroized with it.
pub struct StoreSession<R> {
    name: String,
    scanner: Scanner<R>,
    cipher: RecordCipher,
    decrypted: u64,
    rejected: u64,
}

impl<R: Read + Seek> StoreSession<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scan_stats(&self) -> ScanStats {
        self.scanner.stats()
    }

    pub fn decrypted(&self) -> u64 {
        self.decrypted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn into_report(self) -> StoreReport {
        StoreReport {
            scan: self.scanner.stats(),
            name: self.name,
            decrypted: self.decrypted,
            rejected: self.rejected,
            error: None,
        }
    }
}

impl<R: Read + Seek> Iterator for StoreSession<R> {
    type Item = DecryptedCredential;

    fn next(&mut self) -> Option<DecryptedCredential> {
        loop {
            let tuple = self.scanner.next()?;
            match self.cipher.decrypt(&tuple.secret) {
                Ok(secret) => {
                    self.decrypted += 1;
                    return Some(DecryptedCredential {
                        site: tuple.site,
                        account: tuple.account,
                        secret,
                        location: tuple.location,
                    });
                }
                Err(e) => {
                    debug!(store = %self.name, location = %tuple.location, error = %e, "secret rejected");
                    self.rejected += 1;
                }
            }
        }
    }
}

pub struct Pipeline<C> {
    capability: C,
    config: Config,
}

impl<C: UnwrapCapability> Pipeline<C> {
    pub fn new(capability: C, config: Config) -> Self {
        Pipeline { capability, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract the key token from artifact bytes and unwrap it.
    pub fn unwrap_key(&self, artifact: &[u8]) -> Result<MasterKey> {
        let token = extract_key_token(artifact, &self.config.decrypt.key_field)?;
        unwrap_master_key(&token, &self.capability, self.config.decrypt.max_key_len)
    }

    /// Prepare a session over an already opened store source.
    pub fn open_store_with<R: Read + Seek>(
        &self,
        name: &str,
        artifact: &[u8],
        store: R,
    ) -> Result<StoreSession<R>> {
        let cipher = {
            let key = self.unwrap_key(artifact)?;
            RecordCipher::new(&key, self.config.decrypt.max_plaintext_len)?
        };
        info!(store = name, suite = cipher.suite().as_str(), "master key unwrapped");

        let scanner = Scanner::open(store, self.config.scan)?;
        Ok(StoreSession {
            name: name.to_string(),
            scanner,
            cipher,
            decrypted: 0,
            rejected: 0,
        })
    }

    pub fn open_store(&self, input: &StoreInput) -> Result<StoreSession<File>> {
        let artifact = read_artifact(&input.key_artifact, self.config.decrypt.max_artifact_len)?;
        let store = File::open(&input.database)?;
        self.open_store_with(&input.name, &artifact, store)
    }

    /// Process one store start to finish. Never fails: setup errors are
    /// recorded in the report and the store yields nothing.
    pub fn process_store(&self, input: &StoreInput, sink: &mut dyn ResultSink) -> StoreReport {
        info!(store = %input.name, "processing store");
        let report = match self.open_store(input) {
            Ok(mut session) => {
                for credential in session.by_ref() {
                    sink.credential(&input.name, &credential);
                }
                session.into_report()
            }
            Err(e) => {
                warn!(store = %input.name, error = %e, "store aborted");
                StoreReport::aborted(&input.name, e)
            }
        };

        if !report.is_aborted() {
            info!(
                store = %report.name,
                found = report.scan.tuples_emitted,
                decrypted = report.decrypted,
                rejected = report.rejected,
                "store finished"
            );
        }
        sink.store_finished(&report);
        report
    }

    /// Process every store in order, continuing past aborted ones.
    pub fn run(&self, inputs: &[StoreInput], sink: &mut dyn ResultSink) -> RunSummary {
        let mut summary = RunSummary::default();
        for input in inputs {
            let report = self.process_store(input, sink);
            summary.stores += 1;
            if report.is_aborted() {
                summary.stores_aborted += 1;
            }
            summary.tuples_found += report.scan.tuples_emitted;
            summary.decrypted += report.decrypted;
            summary.rejected += report.rejected;
        }
        info!(
            stores = summary.stores,
            aborted = summary.stores_aborted,
            decrypted = summary.decrypted,
            "run finished"
        );
        sink.run_finished(&summary);
        summary
    }
}

/// Read the key artifact, refusing empty or oversized files.
pub fn read_artifact(path: &Path, max_len: u64) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 || len > max_len {
        return Err(CredScanError::Format(format!(
            "key artifact is {} bytes (allowed 1..={})",
            len, max_len
        )));
    }

    let mut bytes = Vec::with_capacity(len as usize);
    file.take(max_len).read_to_end(&mut bytes)?;
    Ok(bytes)
}

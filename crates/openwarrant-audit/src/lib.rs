//! OpenWarrant Audit - Hash-chained decision ledger
//!
//! Every warrant decision produces exactly one audit record. Records are
//! append-only and each one stores the hash of its predecessor:
//!
//! ```text
//! record_hash = "sha256:" + hex(SHA-256(canonical_content ++ previous_hash))
//! ```
//!
//! The first record links to [`GENESIS_HASH`]. Nothing is ever mutated or
//! removed after append; retention is left to external [`AuditSink`]s.

pub mod ledger;
pub mod record;
pub mod sink;

pub use ledger::{verify_chain, verify_chain_integrity, AuditLedger};
pub use record::{
    chain_hash, render_timestamp, AuditCondition, AuditContent, AuditRecord, GENESIS_HASH,
    HASH_SCHEME,
};
pub use sink::{read_jsonl, AuditSink, JsonlFileSink};

use thiserror::Error;

/// Errors raised by audit sinks
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit sink {sink} failed: {message}")]
    Sink { sink: String, message: String },

    #[error("Audit file error ({path}): {message}")]
    Io { path: String, message: String },

    #[error("JSON error: {message}")]
    Json { message: String },
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Json {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

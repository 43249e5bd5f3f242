//! In-memory hash-chained ledger

use chrono::{SubsecRound, Utc};
use openwarrant_types::AuditRecordId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::record::{chain_hash, AuditContent, AuditRecord, GENESIS_HASH};
use crate::sink::AuditSink;

struct ChainState {
    records: Vec<AuditRecord>,
    head: String,
    /// Appended but not yet written to the sinks, oldest first
    undelivered: VecDeque<AuditRecord>,
}

/// Append-only ledger of decision records.
///
/// Each append reads the head, hashes, stores and advances the head under a
/// single lock, so concurrent appends never share a previous hash. Sinks are
/// written outside that lock, one flushing thread at a time, in chain order.
pub struct AuditLedger {
    chain: Mutex<ChainState>,
    delivery: Mutex<()>,
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self {
            chain: Mutex::new(ChainState {
                records: Vec::new(),
                head: GENESIS_HASH.to_string(),
                undelivered: VecDeque::new(),
            }),
            delivery: Mutex::new(()),
            sinks: Vec::new(),
        }
    }

    /// Forward every appended record to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Append a decision, write it to the sinks and return the stored record
    pub fn append(&self, content: AuditContent) -> AuditRecord {
        let record = self.append_pending(content);
        self.flush_sinks();
        record
    }

    /// Append a decision without touching the sinks.
    ///
    /// The record is queued for the next [`flush_sinks`](Self::flush_sinks).
    pub fn append_pending(&self, content: AuditContent) -> AuditRecord {
        let record = {
            let mut chain = self.chain.lock();
            let timestamp = Utc::now().trunc_subsecs(6);
            let previous_hash = chain.head.clone();
            let record_hash = chain_hash(&content.canonical_string(&timestamp), &previous_hash);

            let record = AuditRecord {
                record_id: AuditRecordId::new(),
                timestamp,
                agent_id: content.agent_id,
                warrant_id: content.warrant_id,
                action: content.action,
                decision: content.decision,
                conditions_evaluated: content.conditions,
                correlation_id: content.correlation_id,
                previous_hash,
                record_hash,
            };

            chain.records.push(record.clone());
            chain.head = record.record_hash.clone();
            if !self.sinks.is_empty() {
                chain.undelivered.push_back(record.clone());
            }
            record
        };

        debug!(
            record_id = %record.record_id,
            decision = %record.decision,
            hash = %record.record_hash,
            "audit record appended"
        );
        record
    }

    /// Write every queued record to the sinks, oldest first.
    ///
    /// Returns at once if another thread is already flushing; that thread
    /// keeps going until the queue is empty.
    pub fn flush_sinks(&self) {
        loop {
            let Some(turn) = self.delivery.try_lock() else {
                return;
            };
            loop {
                let batch: Vec<AuditRecord> = self.chain.lock().undelivered.drain(..).collect();
                if batch.is_empty() {
                    break;
                }
                for record in &batch {
                    self.forward(record);
                }
            }
            drop(turn);

            // A record queued after the last drain but before the release
            // found the turn taken, so it is ours to deliver
            if self.chain.lock().undelivered.is_empty() {
                return;
            }
        }
    }

    fn forward(&self, record: &AuditRecord) {
        for sink in &self.sinks {
            if let Err(e) = sink.write(record) {
                warn!(sink = %sink.name(), record_id = %record.record_id, "audit sink failed: {}", e);
            }
        }
    }

    /// Snapshot of every record, oldest first
    pub fn records(&self) -> Vec<AuditRecord> {
        self.chain.lock().records.clone()
    }

    /// Current chain head
    pub fn last_hash(&self) -> String {
        self.chain.lock().head.clone()
    }

    pub fn get(&self, record_id: &AuditRecordId) -> Option<AuditRecord> {
        self.chain
            .lock()
            .records
            .iter()
            .find(|r| &r.record_id == record_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.chain.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every record links to its predecessor
    pub fn verify(&self) -> bool {
        verify_chain(&self.chain.lock().records)
    }

    /// Check linkage and recompute every record hash
    pub fn verify_integrity(&self) -> bool {
        verify_chain_integrity(&self.chain.lock().records)
    }
}

impl Default for AuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chain = self.chain.lock();
        f.debug_struct("AuditLedger")
            .field("records", &chain.records.len())
            .field("head", &chain.head)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Linkage check over an exported sequence of records
pub fn verify_chain(records: &[AuditRecord]) -> bool {
    let mut expected_prev: &str = GENESIS_HASH;
    for record in records {
        if record.previous_hash != expected_prev {
            return false;
        }
        expected_prev = record.record_hash.as_str();
    }
    true
}

/// Linkage check plus per-record hash recomputation
pub fn verify_chain_integrity(records: &[AuditRecord]) -> bool {
    verify_chain(records) && records.iter().all(AuditRecord::verify)
}

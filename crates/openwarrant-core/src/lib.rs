//! OpenWarrant Core - Warrant decision engine
//!
//! The engine answers one question per call: may this agent, acting in
//! this role, perform this action on this category of data right now?
//!
//! ```text
//! WarrantRequest -> match -> validity window -> conditions -> Decision
//!                                                               |
//!                                      trust counter + audit ledger append
//!                                                               |
//!                                                          observers
//! ```
//!
//! Every call to [`WarrantEngine::check`] that passes request validation
//! appends exactly one record to the engine's [`AuditLedger`], whatever the
//! decision.

pub mod conditions;
pub mod engine;
pub mod matcher;
pub mod observer;

pub use engine::{
    CatalogSource, EngineConfig, WarrantEngine, TRUST_LEVEL_1_AUTHORIZATIONS,
    TRUST_LEVEL_2_AUTHORIZATIONS,
};
pub use matcher::{action_matches, find_match, find_unusable};
pub use observer::{Callbacks, DecisionCallback, DecisionObserver};

pub use openwarrant_audit::{AuditLedger, AuditRecord, AuditSink};
pub use openwarrant_types::*;

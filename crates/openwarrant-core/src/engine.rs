//! Warrant decision engine

use openwarrant_audit::{AuditContent, AuditLedger, AuditRecord, AuditSink};
use openwarrant_types::{
    ConditionKind, ConditionResult, Decision, Result, TrustElevation, Warrant, WarrantRequest,
    WarrantResponse, WarrantSource,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::conditions;
use crate::matcher;
use crate::observer::{self, DecisionObserver};

/// Authorized decisions needed to reach trust level 1
pub const TRUST_LEVEL_1_AUTHORIZATIONS: u64 = 10;
/// Authorized decisions needed to reach trust level 2
pub const TRUST_LEVEL_2_AUTHORIZATIONS: u64 = 50;

/// Where the engine's warrants come from
pub enum CatalogSource {
    /// Pre-loaded warrants, matched in the given order
    Warrants(Vec<Warrant>),
    /// Loaded once at construction
    Source(Box<dyn WarrantSource>),
}

impl Default for CatalogSource {
    fn default() -> Self {
        Self::Warrants(Vec::new())
    }
}

#[derive(Default)]
pub struct EngineConfig {
    pub catalog: CatalogSource,
    pub observers: Vec<Arc<dyn DecisionObserver>>,
    /// Written after the engine's locks are released, in chain order. A check
    /// may return before its record is written when another thread is
    /// already flushing.
    pub audit_sinks: Vec<Arc<dyn AuditSink>>,
    /// External notification endpoint; stored and exposed, never called
    pub notification_endpoint: Option<String>,
}

impl EngineConfig {
    pub fn with_warrants(warrants: Vec<Warrant>) -> Self {
        Self {
            catalog: CatalogSource::Warrants(warrants),
            ..Self::default()
        }
    }

    pub fn with_source(source: impl WarrantSource + 'static) -> Self {
        Self {
            catalog: CatalogSource::Source(Box::new(source)),
            ..Self::default()
        }
    }

    pub fn observer(mut self, observer: impl DecisionObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sinks.push(sink);
        self
    }

    pub fn notification_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.notification_endpoint = Some(endpoint.into());
        self
    }
}

/// Decides warrant requests and records every decision in its audit ledger.
///
/// Safe to share across threads. The trust counter increment and the ledger
/// append happen under one lock, so concurrent checks linearize the same
/// way for both. Audit sinks are written outside that lock.
pub struct WarrantEngine {
    warrants: Vec<Warrant>,
    ledger: AuditLedger,
    authorized_count: Mutex<u64>,
    observers: Vec<Arc<dyn DecisionObserver>>,
    notification_endpoint: Option<String>,
}

impl WarrantEngine {
    /// Build an engine; a failing catalog source aborts construction
    pub fn new(config: EngineConfig) -> Result<Self> {
        let warrants = match config.catalog {
            CatalogSource::Warrants(warrants) => warrants,
            CatalogSource::Source(source) => {
                let warrants = source.load()?;
                info!(
                    source = %source.describe(),
                    warrants = warrants.len(),
                    "warrant catalog loaded"
                );
                warrants
            }
        };

        let ledger = config
            .audit_sinks
            .into_iter()
            .fold(AuditLedger::new(), |ledger, sink| ledger.with_sink(sink));

        Ok(Self {
            warrants,
            ledger,
            authorized_count: Mutex::new(0),
            observers: config.observers,
            notification_endpoint: config.notification_endpoint,
        })
    }

    /// Engine over a fixed list of warrants, with no observers
    pub fn with_warrants(warrants: Vec<Warrant>) -> Self {
        Self {
            warrants,
            ledger: AuditLedger::new(),
            authorized_count: Mutex::new(0),
            observers: Vec::new(),
            notification_endpoint: None,
        }
    }

    /// Decide a request, append the decision to the ledger and notify observers
    pub fn check(&self, request: &WarrantRequest) -> Result<WarrantResponse> {
        request.validate()?;

        let mut response = self.decide(request);
        let content = AuditContent::from_response(
            &response,
            request.agent_id.as_str(),
            request.action.as_str(),
            request.correlation_id.clone(),
        );

        let record = {
            let mut authorized = self.authorized_count.lock();
            if response.decision.is_authorized() {
                *authorized += 1;
                response.trust_elevation = elevation_for(*authorized);
            }
            self.ledger.append_pending(content)
        };
        self.ledger.flush_sinks();
        response.audit_hash = record.record_hash;
        response.previous_hash = record.previous_hash;

        info!(
            decision = %response.decision,
            warrant_id = response.warrant_id.as_deref().unwrap_or("-"),
            agent_id = %request.agent_id,
            action = %request.action,
            audit_hash = %response.audit_hash,
            "warrant decision"
        );
        if let Some(elevation) = &response.trust_elevation {
            info!(new_level = elevation.new_level, "trust level elevated");
        }

        observer::notify(&self.observers, &response);
        Ok(response)
    }

    /// Match, validity window, conditions, classification. No side effects.
    fn decide(&self, request: &WarrantRequest) -> WarrantResponse {
        let Some(warrant) = matcher::find_match(&self.warrants, request) else {
            if let Some(blocked) = matcher::find_unusable(&self.warrants, request) {
                debug!(warrant_id = %blocked.id, "only an unusable warrant covers request");
                return WarrantResponse::for_warrant(Decision::Denied, blocked)
                    .with_conditions(vec![status_result(blocked)]);
            }
            debug!(action = %request.action, role = %request.role, "no warrant covers request");
            return WarrantResponse::new(Decision::NoWarrant);
        };
        debug!(warrant_id = %warrant.id, "warrant matched");

        let at = request.effective_time();
        if !warrant.is_valid_at(at) {
            debug!(
                warrant_id = %warrant.id,
                valid_from = %warrant.valid_from,
                valid_until = %warrant.valid_until,
                at = %at,
                "warrant outside validity window"
            );
            return WarrantResponse::for_warrant(Decision::Expired, warrant);
        }

        let results = conditions::evaluate(warrant, request);
        debug!(
            warrant_id = %warrant.id,
            evaluated = results.len(),
            failed = results.iter().filter(|r| !r.met).count(),
            "conditions evaluated"
        );

        let decision = if results.iter().any(|r| r.triggers_escalation()) {
            Decision::Escalate
        } else if results.iter().any(|r| !r.met) {
            Decision::Denied
        } else {
            Decision::Authorized
        };

        WarrantResponse::for_warrant(decision, warrant).with_conditions(results)
    }

    /// Loaded warrants, in match order
    pub fn warrants(&self) -> &[Warrant] {
        &self.warrants
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.ledger.records()
    }

    /// Chain linkage check over every decision recorded so far
    pub fn verify(&self) -> bool {
        self.ledger.verify()
    }

    /// Number of AUTHORIZED decisions so far
    pub fn trust_count(&self) -> u64 {
        *self.authorized_count.lock()
    }

    /// Current trust tier derived from the authorized count
    pub fn trust_level(&self) -> u8 {
        trust_level_for(self.trust_count())
    }

    pub fn notification_endpoint(&self) -> Option<&str> {
        self.notification_endpoint.as_deref()
    }
}

impl std::fmt::Debug for WarrantEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarrantEngine")
            .field("warrants", &self.warrants.len())
            .field("ledger", &self.ledger)
            .field("observers", &self.observers.len())
            .field("notification_endpoint", &self.notification_endpoint)
            .finish()
    }
}

/// Failed status result for a suspended or revoked warrant
fn status_result(warrant: &Warrant) -> ConditionResult {
    let status = warrant.status.map(|s| s.as_str()).unwrap_or_default();
    ConditionResult::unmet(
        "status",
        ConditionKind::Status,
        format!("Warrant {} is {}", warrant.id, status.to_lowercase()),
    )
}

/// Elevation notice for the authorization that brought the count to `count`
fn elevation_for(count: u64) -> Option<TrustElevation> {
    match count {
        TRUST_LEVEL_1_AUTHORIZATIONS => Some(TrustElevation::to_level(1)),
        TRUST_LEVEL_2_AUTHORIZATIONS => Some(TrustElevation::to_level(2)),
        _ => None,
    }
}

fn trust_level_for(count: u64) -> u8 {
    if count >= TRUST_LEVEL_2_AUTHORIZATIONS {
        2
    } else if count >= TRUST_LEVEL_1_AUTHORIZATIONS {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openwarrant_types::{OpenWarrantError, StaticCatalog};

    struct FailingSource;

    impl WarrantSource for FailingSource {
        fn load(&self) -> Result<Vec<Warrant>> {
            Err(OpenWarrantError::CatalogNotFound {
                path: "/nowhere".to_string(),
            })
        }
    }

    #[test]
    fn test_elevation_thresholds() {
        assert_eq!(elevation_for(9), None);
        assert_eq!(elevation_for(10), Some(TrustElevation::to_level(1)));
        assert_eq!(elevation_for(11), None);
        assert_eq!(elevation_for(50), Some(TrustElevation::to_level(2)));
        assert_eq!(elevation_for(51), None);
    }

    #[test]
    fn test_trust_level_tiers() {
        assert_eq!(trust_level_for(0), 0);
        assert_eq!(trust_level_for(10), 1);
        assert_eq!(trust_level_for(49), 1);
        assert_eq!(trust_level_for(50), 2);
    }

    #[test]
    fn test_failing_source_fails_construction() {
        let result = WarrantEngine::new(EngineConfig::with_source(FailingSource));
        assert!(matches!(result, Err(OpenWarrantError::CatalogNotFound { .. })));
    }

    #[test]
    fn test_source_is_loaded_once_in_order() {
        let catalog = StaticCatalog::new(vec![
            Warrant::builder("a", "ops").build(),
            Warrant::builder("b", "ops").build(),
        ]);
        let engine = WarrantEngine::new(
            EngineConfig::with_source(catalog).notification_endpoint("https://hooks.example/ow"),
        )
        .unwrap();

        let ids: Vec<_> = engine.warrants().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(engine.notification_endpoint(), Some("https://hooks.example/ow"));
    }

    #[test]
    fn test_invalid_request_writes_nothing() {
        let engine = WarrantEngine::with_warrants(vec![]);
        let result = engine.check(&WarrantRequest::new("", "read", "nurse", "PHI"));

        assert_eq!(result, Err(OpenWarrantError::invalid_request("agent_id")));
        assert!(engine.ledger().is_empty());
    }
}

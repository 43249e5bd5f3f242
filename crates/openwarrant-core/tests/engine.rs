use std::sync::{mpsc, Arc};
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;

use openwarrant_audit::{AuditError, AuditSink, GENESIS_HASH};
use openwarrant_core::{
    Callbacks, ConditionKind, ConstraintOp, Decision, EngineConfig, OpenWarrantError, Warrant,
    WarrantEngine, WarrantRequest, WarrantStatus, CAPABILITY_CONTEXT_KEY,
};

fn phi_warrant() -> Warrant {
    Warrant::builder("hipaa-treatment-001", "compliance@hospital.example")
        .roles(["attending_physician"])
        .actions(["read-patient-record"])
        .data_categories(["PHI"])
        .condition("patient_consent", "required")
        .condition("recipient_verified", "required")
        .valid_between(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap(),
        )
        .build()
}

fn trading_warrant() -> Warrant {
    Warrant::builder("trade-desk-001", "risk@bank.example")
        .roles(["trader"])
        .actions(["execute-trade"])
        .data_categories(["market_orders"])
        .condition("single_trade_limit", 50000)
        .build()
}

fn phi_request(consent: bool) -> WarrantRequest {
    WarrantRequest::new("agent-7", "read-patient-record", "attending_physician", "PHI")
        .with_context("patient_consent", consent)
        .with_context("recipient_verified", true)
        .at(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap())
}

fn open_warrant(id: &str) -> Warrant {
    Warrant::builder(id, "ops")
        .roles(["bot"])
        .actions(["ping"])
        .data_categories(["telemetry"])
        .build()
}

fn ping() -> WarrantRequest {
    WarrantRequest::new("bot-1", "ping", "bot", "telemetry")
}

#[test]
fn test_consented_phi_read_is_authorized() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let response = engine.check(&phi_request(true)).unwrap();

    assert_eq!(response.decision, Decision::Authorized);
    assert_eq!(response.warrant_id.as_deref(), Some("hipaa-treatment-001"));
    assert_eq!(response.conditions_evaluated.len(), 2);
    assert!(response.conditions_evaluated.iter().all(|c| c.met));

    let authority = response.authority.expect("authority snapshot");
    assert_eq!(authority.issuer, "compliance@hospital.example");
    assert_eq!(authority.scope, vec!["read-patient-record".to_string()]);
}

#[test]
fn test_missing_consent_is_denied() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let response = engine.check(&phi_request(false)).unwrap();

    assert_eq!(response.decision, Decision::Denied);
    let failed: Vec<_> = response.failed_conditions().map(|c| c.condition.as_str()).collect();
    assert_eq!(failed, vec!["patient_consent"]);
}

#[test]
fn test_trade_over_limit_escalates() {
    let engine = WarrantEngine::with_warrants(vec![trading_warrant()]);
    let request = WarrantRequest::new("desk-bot", "execute-trade", "trader", "market_orders")
        .with_context("amount", 75000);
    let response = engine.check(&request).unwrap();

    assert_eq!(response.decision, Decision::Escalate);
    assert!(!response.conditions_evaluated[0].met);
}

#[test]
fn test_escalation_outranks_denial() {
    let warrant = Warrant::builder("mixed", "ops")
        .roles(["trader"])
        .actions(["execute-trade"])
        .data_categories(["market_orders"])
        .condition("compliance_ack", "required")
        .condition("escalation_threshold", 1000)
        .build();
    let engine = WarrantEngine::with_warrants(vec![warrant]);
    let request = WarrantRequest::new("desk-bot", "execute-trade", "trader", "market_orders")
        .with_context("amount", 5000);

    let response = engine.check(&request).unwrap();
    assert_eq!(response.decision, Decision::Escalate);
    assert_eq!(response.failed_conditions().count(), 2);
}

#[test]
fn test_sequential_checks_chain() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let first = engine.check(&phi_request(true)).unwrap();
    let second = engine.check(&phi_request(false)).unwrap();

    assert_eq!(first.previous_hash, GENESIS_HASH);
    assert_eq!(second.previous_hash, first.audit_hash);
    assert_ne!(first.audit_hash, second.audit_hash);
    assert!(engine.verify());
}

#[test]
fn test_no_warrant_has_empty_fields() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let request = WarrantRequest::new("agent-7", "delete-patient-record", "attending_physician", "PHI");
    let response = engine.check(&request).unwrap();

    assert_eq!(response.decision, Decision::NoWarrant);
    assert!(response.warrant_id.is_none());
    assert!(response.authority.is_none());
    assert!(response.conditions_evaluated.is_empty());
    assert!(response.audit_hash.starts_with("sha256:"));

    let records = engine.audit_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decision, Decision::NoWarrant);
    assert!(records[0].warrant_id.is_none());
}

#[test]
fn test_expired_skips_conditions() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let request = phi_request(false).at(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    let response = engine.check(&request).unwrap();

    assert_eq!(response.decision, Decision::Expired);
    assert_eq!(response.warrant_id.as_deref(), Some("hipaa-treatment-001"));
    assert!(response.conditions_evaluated.is_empty());
    assert_eq!(engine.ledger().len(), 1);
}

#[test]
fn test_validity_window_is_inclusive() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let at_end = phi_request(true).at(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap());
    let at_start = phi_request(true).at(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

    assert_eq!(engine.check(&at_end).unwrap().decision, Decision::Authorized);
    assert_eq!(engine.check(&at_start).unwrap().decision, Decision::Authorized);
}

#[test]
fn test_first_match_is_stable() {
    let expired_first = Warrant::builder("old", "ops")
        .roles(["bot"])
        .actions(["ping"])
        .data_categories(["telemetry"])
        .valid_between(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 12, 31, 0, 0, 0).unwrap(),
        )
        .build();
    let engine = WarrantEngine::with_warrants(vec![expired_first, open_warrant("fresh")]);

    for _ in 0..3 {
        let response = engine.check(&ping()).unwrap();
        assert_eq!(response.decision, Decision::Expired);
        assert_eq!(response.warrant_id.as_deref(), Some("old"));
    }
}

#[test]
fn test_every_check_appends_one_record() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant(), trading_warrant()]);
    let requests = vec![
        phi_request(true),
        phi_request(false),
        WarrantRequest::new("x", "unknown", "nobody", "none"),
        WarrantRequest::new("desk-bot", "execute-trade", "trader", "market_orders")
            .with_context("amount", 99999),
    ];
    for request in &requests {
        engine.check(request).unwrap();
    }

    assert_eq!(engine.ledger().len(), requests.len());
    assert!(engine.verify());
    assert!(engine.ledger().verify_integrity());
}

#[test]
fn test_trust_elevates_exactly_at_thresholds() {
    let engine = WarrantEngine::with_warrants(vec![open_warrant("ping")]);

    let elevated: Vec<(usize, u8)> = (1..=60)
        .filter_map(|n| {
            let response = engine.check(&ping()).unwrap();
            response.trust_elevation.map(|e| (n, e.new_level))
        })
        .collect();

    assert_eq!(elevated, vec![(10, 1), (50, 2)]);
    assert_eq!(engine.trust_count(), 60);
    assert_eq!(engine.trust_level(), 2);
}

#[test]
fn test_only_authorized_decisions_count_toward_trust() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    for _ in 0..5 {
        engine.check(&phi_request(false)).unwrap();
    }
    engine.check(&phi_request(true)).unwrap();

    assert_eq!(engine.trust_count(), 1);
    assert_eq!(engine.trust_level(), 0);
}

#[test]
fn test_correlation_id_is_recorded() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let response = engine
        .check(&phi_request(true).with_correlation_id("req-42"))
        .unwrap();

    let record = &engine.audit_records()[0];
    assert_eq!(record.correlation_id.as_deref(), Some("req-42"));
    assert_eq!(record.record_hash, response.audit_hash);
    assert!(record.verify());
}

#[test]
fn test_observers_fire_after_append_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (a, b) = (log.clone(), log.clone());
    let callbacks = Callbacks::new()
        .on_decision(move |r| a.lock().push(format!("decision:{}", r.decision)))
        .on_escalate(move |r| b.lock().push(format!("escalate:{}", r.audit_hash.len())));
    let engine = WarrantEngine::new(
        EngineConfig::with_warrants(vec![trading_warrant()]).observer(callbacks),
    )
    .unwrap();

    let request = WarrantRequest::new("desk-bot", "execute-trade", "trader", "market_orders")
        .with_context("amount", 60000);
    engine.check(&request).unwrap();

    // "sha256:" plus 64 hex digits, so the hash was already set
    assert_eq!(
        *log.lock(),
        vec!["decision:ESCALATE".to_string(), "escalate:71".to_string()]
    );
}

#[test]
fn test_panicking_observer_does_not_change_outcome() {
    let seen = Arc::new(Mutex::new(0u32));
    let counter = seen.clone();
    let engine = WarrantEngine::new(
        EngineConfig::with_warrants(vec![phi_warrant()])
            .observer(Callbacks::new().on_authorized(|_| panic!("downstream outage")))
            .observer(Callbacks::new().on_authorized(move |_| *counter.lock() += 1)),
    )
    .unwrap();

    let response = engine.check(&phi_request(true)).unwrap();
    assert_eq!(response.decision, Decision::Authorized);
    assert_eq!(*seen.lock(), 1);
    assert_eq!(engine.ledger().len(), 1);
}

#[test]
fn test_invalid_request_is_rejected_without_audit() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let request = WarrantRequest::new("agent-7", "  ", "attending_physician", "PHI");

    let err = engine.check(&request).unwrap_err();
    assert_eq!(err, OpenWarrantError::invalid_request("action"));
    assert!(engine.ledger().is_empty());
    assert_eq!(engine.trust_count(), 0);
}

#[test]
fn test_context_map_from_json() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let context = json!({"patient_consent": true, "recipient_verified": "yes"});
    let request = WarrantRequest::new("agent-7", "read-patient-record", "attending_physician", "PHI")
        .with_context_map(context.as_object().cloned().unwrap())
        .at(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());

    assert_eq!(engine.check(&request).unwrap().decision, Decision::Authorized);
}

#[test]
fn test_concurrent_checks_keep_chain_and_count_consistent() {
    let engine = Arc::new(WarrantEngine::with_warrants(vec![open_warrant("ping")]));
    let elevations = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let elevations = elevations.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    let response = engine.check(&ping()).unwrap();
                    if let Some(e) = response.trust_elevation {
                        elevations.lock().push(e.new_level);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.trust_count(), 200);
    assert_eq!(engine.ledger().len(), 200);
    assert!(engine.verify());

    let mut levels = elevations.lock().clone();
    levels.sort();
    assert_eq!(levels, vec![1, 2]);
}

struct CollectingSink {
    hashes: Mutex<Vec<String>>,
}

impl AuditSink for CollectingSink {
    fn name(&self) -> String {
        "collecting".to_string()
    }

    fn write(&self, record: &openwarrant_core::AuditRecord) -> Result<(), AuditError> {
        self.hashes.lock().push(record.record_hash.clone());
        Ok(())
    }
}

#[test]
fn test_audit_sinks_receive_records() {
    let sink = Arc::new(CollectingSink {
        hashes: Mutex::new(Vec::new()),
    });
    let engine = WarrantEngine::new(
        EngineConfig::with_warrants(vec![phi_warrant()]).audit_sink(sink.clone()),
    )
    .unwrap();

    let response = engine.check(&phi_request(true)).unwrap();
    assert_eq!(*sink.hashes.lock(), vec![response.audit_hash]);
}

struct GatedSink {
    gate: Mutex<()>,
    entered: Mutex<mpsc::Sender<()>>,
    hashes: Mutex<Vec<String>>,
}

impl AuditSink for GatedSink {
    fn name(&self) -> String {
        "gated".to_string()
    }

    fn write(&self, record: &openwarrant_core::AuditRecord) -> Result<(), AuditError> {
        let _ = self.entered.lock().send(());
        let _open = self.gate.lock();
        self.hashes.lock().push(record.record_hash.clone());
        Ok(())
    }
}

#[test]
fn test_slow_sink_does_not_hold_up_other_checks() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let sink = Arc::new(GatedSink {
        gate: Mutex::new(()),
        entered: Mutex::new(entered_tx),
        hashes: Mutex::new(Vec::new()),
    });
    let engine = Arc::new(
        WarrantEngine::new(
            EngineConfig::with_warrants(vec![open_warrant("ping")]).audit_sink(sink.clone()),
        )
        .unwrap(),
    );

    let gate = sink.gate.lock();
    let first = {
        let engine = engine.clone();
        thread::spawn(move || engine.check(&ping()).unwrap())
    };
    entered_rx.recv().unwrap();

    // The first record is stuck in the sink; this check still completes
    let second = engine.check(&ping()).unwrap();
    assert_eq!(engine.ledger().len(), 2);
    assert_eq!(engine.trust_count(), 2);
    assert!(sink.hashes.lock().is_empty());

    drop(gate);
    let first = first.join().unwrap();
    assert_eq!(*sink.hashes.lock(), vec![first.audit_hash, second.audit_hash]);
}

#[test]
fn test_record_timestamp_is_append_time_not_request_time() {
    let engine = WarrantEngine::with_warrants(vec![phi_warrant()]);
    let request = phi_request(true);
    let requested_at = request.timestamp.unwrap();

    let before = Utc::now();
    engine.check(&request).unwrap();
    let after = Utc::now();

    let record = &engine.audit_records()[0];
    assert_ne!(record.timestamp, requested_at);
    assert!(record.timestamp >= before - Duration::seconds(1));
    assert!(record.timestamp <= after + Duration::seconds(1));
}

#[test]
fn test_limit_past_float_precision_still_escalates() {
    let warrant = Warrant::builder("trade-desk-big", "risk@bank.example")
        .roles(["trader"])
        .actions(["execute-trade"])
        .data_categories(["market_orders"])
        .condition("single_trade_limit", 9007199254740992u64)
        .build();
    let engine = WarrantEngine::with_warrants(vec![warrant]);
    let trade = |amount: u64| {
        WarrantRequest::new("algo-1", "execute-trade", "trader", "market_orders")
            .with_context("amount", amount)
    };

    assert_eq!(
        engine.check(&trade(9007199254740993)).unwrap().decision,
        Decision::Escalate
    );
    assert_eq!(
        engine.check(&trade(9007199254740992)).unwrap().decision,
        Decision::Authorized
    );
}

fn sepsis_warrant() -> Warrant {
    Warrant::builder("sepsis-alert-001", "cmo@hospital.example")
        .roles(["clinical_agent"])
        .actions(["page-rapid-response"])
        .data_categories(["PHI"])
        .condition("patient_consent", "required")
        .constraint("care_setting", ConstraintOp::In, json!(["icu", "ed"]))
        .constraint("sepsis_score", ConstraintOp::Gte, 0.8)
        .build()
}

fn sepsis_request(setting: &str, score: f64) -> WarrantRequest {
    WarrantRequest::new("sepsis-bot", "page-rapid-response", "clinical_agent", "PHI")
        .with_context("care_setting", setting)
        .with_context("sepsis_score", score)
}

#[test]
fn test_constraints_decide_instead_of_conditions() {
    let engine = WarrantEngine::with_warrants(vec![sepsis_warrant()]);

    // patient_consent is absent but constraints take over
    let response = engine.check(&sepsis_request("icu", 0.92)).unwrap();
    assert_eq!(response.decision, Decision::Authorized);
    assert_eq!(response.conditions_evaluated.len(), 2);

    let response = engine.check(&sepsis_request("outpatient", 0.92)).unwrap();
    assert_eq!(response.decision, Decision::Denied);
    let failed: Vec<_> = response.failed_conditions().map(|c| c.condition.as_str()).collect();
    assert_eq!(failed, vec!["care_setting"]);
    assert_eq!(engine.audit_records()[1].conditions_evaluated[0].detail, r#"in ["icu","ed"]"#);
}

#[test]
fn test_revoked_warrant_alone_is_denied() {
    let revoked = Warrant::builder("ping-revoked", "ops")
        .roles(["bot"])
        .actions(["ping"])
        .data_categories(["telemetry"])
        .status(WarrantStatus::Revoked)
        .build();
    let engine = WarrantEngine::with_warrants(vec![revoked]);

    let response = engine.check(&ping()).unwrap();
    assert_eq!(response.decision, Decision::Denied);
    assert_eq!(response.warrant_id.as_deref(), Some("ping-revoked"));
    assert_eq!(response.conditions_evaluated.len(), 1);
    assert_eq!(response.conditions_evaluated[0].kind, ConditionKind::Status);
    assert_eq!(
        response.conditions_evaluated[0].detail,
        "Warrant ping-revoked is revoked"
    );
    assert_eq!(engine.trust_count(), 0);
    assert_eq!(engine.ledger().len(), 1);
}

#[test]
fn test_unusable_warrants_fall_through_to_the_next_match() {
    let scoped = |id: &str, status: WarrantStatus| {
        Warrant::builder(id, "ops")
            .roles(["bot"])
            .actions(["ping"])
            .data_categories(["telemetry"])
            .status(status)
            .build()
    };
    let engine = WarrantEngine::with_warrants(vec![
        scoped("w1", WarrantStatus::Revoked),
        scoped("w2", WarrantStatus::Suspended),
        scoped("w3", WarrantStatus::Active),
    ]);

    let response = engine.check(&ping()).unwrap();
    assert_eq!(response.decision, Decision::Authorized);
    assert_eq!(response.warrant_id.as_deref(), Some("w3"));

    let engine = WarrantEngine::with_warrants(vec![scoped("w2", WarrantStatus::Suspended)]);
    assert_eq!(engine.check(&ping()).unwrap().decision, Decision::Denied);

    let engine = WarrantEngine::with_warrants(vec![open_warrant("unrelated")]);
    let other = WarrantRequest::new("bot-1", "pong", "bot", "telemetry");
    assert_eq!(engine.check(&other).unwrap().decision, Decision::NoWarrant);
}

#[test]
fn test_capability_allowlist_decisions() {
    let warrant = Warrant::builder("sepsis-model-001", "cmo@hospital.example")
        .roles(["clinical_agent"])
        .actions(["page-rapid-response"])
        .data_categories(["PHI"])
        .allowed_capability("sepsis-model", "3.2")
        .build();
    let engine = WarrantEngine::with_warrants(vec![warrant]);
    let invoked_by = |version: &str| {
        sepsis_request("icu", 0.9)
            .with_context(CAPABILITY_CONTEXT_KEY, json!({"name": "sepsis-model", "version": version}))
    };

    assert_eq!(engine.check(&invoked_by("3.2")).unwrap().decision, Decision::Authorized);

    let response = engine.check(&invoked_by("2.0")).unwrap();
    assert_eq!(response.decision, Decision::Denied);
    assert_eq!(response.conditions_evaluated[0].condition, CAPABILITY_CONTEXT_KEY);

    // No invoking capability named: the allowlist has nothing to check
    let response = engine.check(&sepsis_request("icu", 0.9)).unwrap();
    assert_eq!(response.decision, Decision::Authorized);
    assert!(response.conditions_evaluated.is_empty());
}

//! Check command - decide one request against a catalog

use anyhow::Context;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use openwarrant_audit::JsonlFileSink;
use openwarrant_core::{WarrantRequest, WarrantResponse};

use super::{build_engine, catalog_config};
use crate::{display, CheckArgs, OutputFormat};

pub fn run(args: &CheckArgs) -> anyhow::Result<()> {
    let context = WarrantRequest::parse_context(&args.context).context("Invalid JSON context")?;

    let mut config = catalog_config(&args.warrant_dir)?;
    if let Some(path) = &args.audit_log {
        let sink = JsonlFileSink::open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        config = config.audit_sink(Arc::new(sink));
    }
    let engine = build_engine(config)?;
    debug!(warrants = engine.warrants().len(), "engine ready");

    let mut request = WarrantRequest::new(
        args.agent_id.as_str(),
        args.action.as_str(),
        args.role.as_str(),
        args.data_type.as_str(),
    )
    .with_context_map(context);
    if let Some(correlation_id) = &args.correlation_id {
        request = request.with_correlation_id(correlation_id.as_str());
    }

    let response = engine.check(&request)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&response))?),
        OutputFormat::Text => print_text(&response),
    }
    Ok(())
}

fn to_json(response: &WarrantResponse) -> Value {
    let conditions: Vec<Value> = response
        .conditions_evaluated
        .iter()
        .map(|c| json!({"condition": c.condition, "met": c.met, "detail": c.detail}))
        .collect();

    let mut output = json!({
        "decision": response.decision.as_str(),
        "warrant_id": response.warrant_id,
        "audit_hash": response.audit_hash,
        "previous_hash": response.previous_hash,
        "conditions": conditions,
    });
    if let (Some(authority), Some(fields)) = (&response.authority, output.as_object_mut()) {
        fields.insert("authority".to_string(), json!(authority));
    }
    if let (Some(elevation), Some(fields)) = (&response.trust_elevation, output.as_object_mut()) {
        fields.insert("trust_elevation".to_string(), json!(elevation));
    }
    output
}

fn print_text(response: &WarrantResponse) {
    display::decision_line(response.decision);
    if let Some(warrant_id) = &response.warrant_id {
        display::labeled("Warrant", warrant_id);
    }
    if let Some(authority) = &response.authority {
        display::labeled("Issuer", &authority.issuer);
    }
    if !response.conditions_evaluated.is_empty() {
        println!("Conditions:");
        for c in &response.conditions_evaluated {
            display::condition(&c.condition, c.met, &c.detail);
        }
    }
    display::labeled("Audit", &response.audit_hash);
}

//! List command - show the warrants a catalog provides

use colored::*;
use std::path::Path;

use openwarrant_core::{display_value, Warrant};

use super::{build_engine, catalog_config};
use crate::display;

pub fn run(warrant_dir: &Path) -> anyhow::Result<()> {
    let engine = build_engine(catalog_config(warrant_dir)?)?;

    display::section(&format!("Warrants in {}", warrant_dir.display()));
    if engine.warrants().is_empty() {
        println!("  {}", "No warrants found".yellow());
        return Ok(());
    }

    for warrant in engine.warrants() {
        println!();
        println!("  {}", warrant.id.bright_white().bold());
        display::labeled("  Issuer", &warrant.issuer);
        display::labeled(
            "  Valid",
            &format!("{} .. {}", warrant.valid_from, warrant.valid_until),
        );
        display::labeled("  Roles", &warrant.roles.join(", "));
        display::labeled("  Actions", &warrant.actions.join(", "));
        display::labeled("  Data", &warrant.data_categories.join(", "));
        if let Some(status) = warrant.status {
            display::labeled("  Status", status.as_str());
        }
        for (label, line) in rule_lines(warrant) {
            display::labeled(label, &line);
        }
    }
    println!();
    Ok(())
}

/// Condition, constraint and capability summaries, one line per kind present
fn rule_lines(warrant: &Warrant) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();
    if !warrant.conditions.is_empty() {
        let conditions: Vec<_> = warrant
            .conditions
            .iter()
            .map(|c| format!("{}={}", c.name(), display_value(c.value())))
            .collect();
        lines.push(("  Conditions", conditions.join(", ")));
    }
    if !warrant.context_constraints.is_empty() {
        let constraints: Vec<_> = warrant
            .context_constraints
            .iter()
            .map(|c| format!("{} {}", c.field, c.describe()))
            .collect();
        lines.push(("  Constraints", constraints.join(", ")));
    }
    if !warrant.allowed_capabilities.is_empty() {
        let capabilities: Vec<_> = warrant.allowed_capabilities.iter().map(|c| c.label()).collect();
        lines.push(("  Capabilities", capabilities.join(", ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use openwarrant_core::ConstraintOp;
    use serde_json::json;

    #[test]
    fn test_rule_lines_show_declared_values() {
        let warrant = Warrant::builder("w", "ops")
            .condition("single_trade_limit", 50000)
            .condition("purpose", json!(["treatment", "billing"]))
            .constraint("age", ConstraintOp::Gte, 18)
            .allowed_capability("triage-model", "2.0")
            .build();

        let lines = rule_lines(&warrant);
        assert_eq!(
            lines[0].1,
            r#"single_trade_limit=50000, purpose=["treatment","billing"]"#
        );
        assert_eq!(lines[1].1, "age gte 18");
        assert_eq!(lines[2].1, "triage-model@2.0");
        assert!(rule_lines(&Warrant::builder("bare", "ops").build()).is_empty());
    }
}

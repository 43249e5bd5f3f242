//! Display utilities for the CLI

use colored::*;
use openwarrant_core::Decision;

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_black());
    println!(" {}", title.bright_white().bold());
    println!("{}", "━".repeat(60).bright_black());
}

/// Print a labeled value, padded so values line up
pub fn labeled(label: &str, value: &str) {
    let label = format!("{:<11}", format!("{}:", label));
    println!("{} {}", label.bright_white(), value.bright_cyan());
}

/// Decision line, colored by outcome
pub fn decision_line(decision: Decision) {
    let word = decision.as_str();
    let word = match decision {
        Decision::Authorized => word.bright_green().bold(),
        Decision::Escalate => word.yellow().bold(),
        Decision::Denied | Decision::NoWarrant | Decision::Expired => word.bright_red().bold(),
    };
    println!("{} {}", format!("{:<11}", "Decision:").bright_white(), word);
}

/// One evaluated condition line
pub fn condition(name: &str, met: bool, detail: &str) {
    let status = if met {
        "[MET]".bright_green()
    } else {
        "[NOT MET]".bright_red()
    };
    println!("  {} {}: {}", status, name, detail.bright_black());
}

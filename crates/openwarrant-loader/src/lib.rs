//! OpenWarrant Loader - YAML warrant catalogs
//!
//! Reads warrant documents from disk and hands them to the engine through
//! [`YamlCatalog`], an implementation of [`WarrantSource`]. Signature
//! checking is out of scope here: files are trusted as already
//! authenticated.

pub mod document;

pub use document::{parse_datetime, DEFAULT_VALID_FROM, DEFAULT_VALID_UNTIL};

use document::WarrantDocument;
use openwarrant_types::{OpenWarrantError, Result, Warrant, WarrantSource};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extensions picked up when loading a directory
pub const WARRANT_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

const WRAPPER_KEY: &str = "warrant";

/// Parse one warrant document. `origin` names the source in errors.
pub fn parse_warrant(text: &str, origin: &str) -> Result<Warrant> {
    let parse_error = |message: String| OpenWarrantError::CatalogParse {
        path: origin.to_string(),
        message,
    };

    let mut root: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    let wrapped = root.as_mapping_mut().and_then(|m| m.remove(WRAPPER_KEY));
    if let Some(inner) = wrapped {
        root = inner;
    }

    let document: WarrantDocument =
        serde_yaml::from_value(root).map_err(|e| parse_error(e.to_string()))?;
    document.into_warrant().map_err(parse_error)
}

/// Load a single warrant file
pub fn load_warrant_file(path: impl AsRef<Path>) -> Result<Warrant> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    if !path.exists() {
        return Err(OpenWarrantError::CatalogNotFound { path: origin });
    }
    let text = fs::read_to_string(path).map_err(|e| OpenWarrantError::CatalogIo {
        path: origin.clone(),
        message: e.to_string(),
    })?;
    parse_warrant(&text, &origin)
}

/// Load every `.yaml`/`.yml` file in a directory, in filename order.
///
/// Files that fail to load are skipped with a warning.
pub fn load_warrant_dir(path: impl AsRef<Path>) -> Result<Vec<Warrant>> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Err(OpenWarrantError::CatalogNotFound {
            path: path.display().to_string(),
        });
    }

    let io_error = |e: std::io::Error| OpenWarrantError::CatalogIo {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_error)? {
        let file = entry.map_err(io_error)?.path();
        if file.is_file() && is_warrant_file(&file) {
            files.push(file);
        }
    }
    files.sort();

    let mut warrants = Vec::with_capacity(files.len());
    for file in files {
        match load_warrant_file(&file) {
            Ok(warrant) => {
                debug!(file = %file.display(), warrant_id = %warrant.id, "warrant loaded");
                warrants.push(warrant);
            }
            Err(e) => warn!(file = %file.display(), error = %e, "skipping warrant file"),
        }
    }
    Ok(warrants)
}

fn is_warrant_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WARRANT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Warrant catalog backed by a directory of YAML files, or a single file
#[derive(Debug, Clone)]
pub struct YamlCatalog {
    path: PathBuf,
}

impl YamlCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WarrantSource for YamlCatalog {
    fn load(&self) -> Result<Vec<Warrant>> {
        if self.path.is_file() {
            load_warrant_file(&self.path).map(|w| vec![w])
        } else {
            load_warrant_dir(&self.path)
        }
    }

    fn describe(&self) -> String {
        format!("yaml catalog at {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openwarrant_types::{ConditionKind, ConstraintOp, WarrantStatus};

    #[test]
    fn test_parse_wrapped_document() {
        let yaml = r#"
warrant:
  id: trade-desk-001
  issuer: risk@bank.example
  signature: "ed25519:abc"
  who_can_act:
    roles: [trader, senior_trader]
  what_they_can_do:
    actions:
      - execute-trade
      - cancel-trade
    data_types: [market_orders]
  under_what_conditions:
    - single_trade_limit: 50000
    - trading_hours_only: required
  valid_from: "2026-02-01T00:00:00Z"
  valid_until: 2026-06-30T23:59:59Z
  trust_level_required: 1
  escalation_target: head-of-desk@bank.example
"#;
        let warrant = parse_warrant(yaml, "inline").unwrap();

        assert_eq!(warrant.id, "trade-desk-001");
        assert_eq!(warrant.signature, "ed25519:abc");
        assert_eq!(warrant.roles, vec!["trader", "senior_trader"]);
        assert_eq!(warrant.actions, vec!["execute-trade", "cancel-trade"]);
        assert_eq!(warrant.data_categories, vec!["market_orders"]);
        assert_eq!(warrant.conditions.len(), 2);
        assert_eq!(warrant.conditions[0].kind(), ConditionKind::Threshold);
        assert_eq!(warrant.conditions[1].kind(), ConditionKind::Required);
        assert_eq!(warrant.valid_from, parse_datetime("2026-02-01T00:00:00Z").unwrap());
        assert_eq!(warrant.trust_level_required, 1);
        assert_eq!(warrant.escalation_target, "head-of-desk@bank.example");
        assert!(warrant.audit_required);
    }

    #[test]
    fn test_parse_bare_document_with_defaults() {
        let yaml = "id: 42\nissuer: ops\nwho_can_act:\n  roles: [bot]\n";
        let warrant = parse_warrant(yaml, "inline").unwrap();

        assert_eq!(warrant.id, "42");
        assert!(warrant.actions.is_empty());
        assert_eq!(warrant.valid_from, parse_datetime(DEFAULT_VALID_FROM).unwrap());
        assert_eq!(warrant.valid_until, parse_datetime(DEFAULT_VALID_UNTIL).unwrap());
    }

    #[test]
    fn test_multi_key_conditions_are_flattened() {
        let yaml = r#"
id: w
under_what_conditions:
  - purpose: [treatment, billing]
    jurisdiction: US
  - "just a string"
"#;
        let warrant = parse_warrant(yaml, "inline").unwrap();
        let names: Vec<_> = warrant.conditions.iter().map(|c| c.name()).collect();

        assert_eq!(names, vec!["purpose", "jurisdiction"]);
        assert_eq!(warrant.conditions[0].kind(), ConditionKind::AllowedSet);
        assert_eq!(warrant.conditions[1].kind(), ConditionKind::ExactMatch);
    }

    #[test]
    fn test_parse_status_constraints_and_capabilities() {
        let yaml = r#"
warrant:
  id: sepsis-alert-001
  issuer: cmo@hospital.example
  status: suspended
  who_can_act:
    roles: [clinical_agent]
  what_they_can_do:
    actions: [page-rapid-response]
    data_types: [PHI]
  context_constraints:
    - field: care_setting
      operator: in
      value: [icu, ed]
    - {field: sepsis_score, op: gte, value: 0.8}
    - {field: consent, operator: required}
  allowed_capabilities:
    - name: sepsis-model
      version: 3.2
"#;
        let warrant = parse_warrant(yaml, "inline").unwrap();

        assert_eq!(warrant.status, Some(WarrantStatus::Suspended));
        assert!(!warrant.is_usable());
        assert_eq!(warrant.context_constraints.len(), 3);
        assert_eq!(warrant.context_constraints[0].operator, ConstraintOp::In);
        assert_eq!(warrant.context_constraints[1].describe(), "gte 0.8");
        assert_eq!(warrant.context_constraints[2].operator, ConstraintOp::Required);
        assert_eq!(warrant.allowed_capabilities[0].label(), "sepsis-model@3.2");
    }

    #[test]
    fn test_unknown_operator_or_status_fails_the_file() {
        let bad_operator = "id: w\ncontext_constraints:\n  - {field: x, operator: approx, value: 1}\n";
        assert!(matches!(
            parse_warrant(bad_operator, "op.yaml"),
            Err(OpenWarrantError::CatalogParse { .. })
        ));

        let bad_status = "id: w\nstatus: retired\n";
        assert!(parse_warrant(bad_status, "status.yaml").is_err());
    }

    #[test]
    fn test_parse_errors_name_the_origin() {
        let err = parse_warrant("id: [unterminated", "broken.yaml").unwrap_err();
        match err {
            OpenWarrantError::CatalogParse { path, .. } => assert_eq!(path, "broken.yaml"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = parse_warrant("id: w\nvalid_from: someday\n", "dates.yaml").unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn test_extension_filter() {
        assert!(is_warrant_file(Path::new("a.yaml")));
        assert!(is_warrant_file(Path::new("b.yml")));
        assert!(!is_warrant_file(Path::new("c.json")));
        assert!(!is_warrant_file(Path::new("README")));
    }
}

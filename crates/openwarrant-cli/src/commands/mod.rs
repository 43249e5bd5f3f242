//! CLI command implementations

pub mod check;
pub mod list;

use anyhow::Context;
use openwarrant_core::{EngineConfig, WarrantEngine};
use openwarrant_loader::YamlCatalog;
use std::path::Path;

/// Engine over the YAML catalog at `warrant_dir`
fn catalog_config(warrant_dir: &Path) -> anyhow::Result<EngineConfig> {
    if !warrant_dir.exists() {
        anyhow::bail!("Warrant directory not found: {}", warrant_dir.display());
    }
    Ok(EngineConfig::with_source(YamlCatalog::new(warrant_dir)))
}

fn build_engine(config: EngineConfig) -> anyhow::Result<WarrantEngine> {
    WarrantEngine::new(config).context("Failed to load warrant catalog")
}

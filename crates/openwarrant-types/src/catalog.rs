//! Warrant catalog seam
//!
//! The decision engine never parses warrant files. It asks a
//! [`WarrantSource`] for an ordered list of already-authenticated warrants
//! once, at construction.

use crate::warrant::Warrant;
use crate::Result;

/// Supplies the ordered set of candidate warrants
pub trait WarrantSource: Send + Sync {
    /// Load every warrant, in the order they should be matched
    fn load(&self) -> Result<Vec<Warrant>>;

    /// Human-readable description of where warrants come from
    fn describe(&self) -> String {
        "warrant source".to_string()
    }
}

/// A fixed, in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    warrants: Vec<Warrant>,
}

impl StaticCatalog {
    pub fn new(warrants: Vec<Warrant>) -> Self {
        Self { warrants }
    }
}

impl WarrantSource for StaticCatalog {
    fn load(&self) -> Result<Vec<Warrant>> {
        Ok(self.warrants.clone())
    }

    fn describe(&self) -> String {
        format!("static catalog ({} warrants)", self.warrants.len())
    }
}

//! OpenWarrant Types - Canonical domain types for warrant-based authorization
//!
//! This crate contains the foundational types shared by every OpenWarrant
//! crate, with zero dependencies on the others:
//!
//! - Warrant: a pre-authenticated grant scoping roles, actions and data categories
//! - Condition: a named predicate declared by a warrant, classified at load time
//! - Constraint: an operator comparison over one context field
//! - WarrantRequest: a single authorization query from an agent
//! - WarrantResponse: the decision plus its audit position
//! - WarrantSource: the seam through which catalogs are supplied
//!
//! # Decisions
//!
//! ```text
//! AUTHORIZED | DENIED | ESCALATE | NO_WARRANT | EXPIRED
//! ```

pub mod catalog;
pub mod condition;
pub mod constraint;
pub mod error;
pub mod identity;
pub mod request;
pub mod response;
pub mod warrant;

pub use catalog::*;
pub use condition::*;
pub use constraint::*;
pub use error::*;
pub use identity::*;
pub use request::*;
pub use response::*;
pub use warrant::*;

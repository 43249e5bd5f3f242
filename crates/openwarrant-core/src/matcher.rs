//! Warrant matching
//!
//! First match wins: the catalog is scanned in its given order and the
//! first usable warrant covering the request's action, role and data
//! category is selected. Suspended and revoked warrants are passed over.

use openwarrant_types::{Warrant, WarrantRequest};

/// Segment that matches the rest of a dot-separated action
pub const WILDCARD: &str = "*";

/// Whether `action` is covered by `pattern`.
///
/// Patterns are dot-separated; a `*` segment matches everything from that
/// point on. Patterns without a wildcard must match exactly.
pub fn action_matches(pattern: &str, action: &str) -> bool {
    let mut action_parts = action.split('.');
    for part in pattern.split('.') {
        if part == WILDCARD {
            return true;
        }
        match action_parts.next() {
            Some(a) if a == part => continue,
            _ => return false,
        }
    }
    action_parts.next().is_none()
}

/// Whether `warrant` covers the request's action, role and data category
pub fn covers(warrant: &Warrant, request: &WarrantRequest) -> bool {
    warrant
        .actions
        .iter()
        .any(|pattern| action_matches(pattern, &request.action))
        && warrant.has_role(&request.role)
        && warrant.has_data_category(&request.data_category)
}

/// First usable warrant in catalog order that covers the request
pub fn find_match<'a>(warrants: &'a [Warrant], request: &WarrantRequest) -> Option<&'a Warrant> {
    warrants.iter().find(|w| w.is_usable() && covers(w, request))
}

/// First suspended or revoked warrant that would otherwise cover the request
pub fn find_unusable<'a>(warrants: &'a [Warrant], request: &WarrantRequest) -> Option<&'a Warrant> {
    warrants.iter().find(|w| !w.is_usable() && covers(w, request))
}

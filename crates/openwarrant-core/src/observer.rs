//! Decision observers
//!
//! Observers are notified after a decision has been appended to the audit
//! ledger. They are fire-and-forget: a panicking observer is caught and
//! logged, and never affects another observer or the returned response.

use openwarrant_types::{Decision, WarrantResponse};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Receives finalized decisions
pub trait DecisionObserver: Send + Sync {
    /// Called for every decision
    fn on_decision(&self, _response: &WarrantResponse) {}

    fn on_authorized(&self, _response: &WarrantResponse) {}

    fn on_denied(&self, _response: &WarrantResponse) {}

    fn on_escalate(&self, _response: &WarrantResponse) {}
}

pub type DecisionCallback = Box<dyn Fn(&WarrantResponse) + Send + Sync>;

/// Observer assembled from optional closures
#[derive(Default)]
pub struct Callbacks {
    on_decision: Option<DecisionCallback>,
    on_authorized: Option<DecisionCallback>,
    on_denied: Option<DecisionCallback>,
    on_escalate: Option<DecisionCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_decision(mut self, f: impl Fn(&WarrantResponse) + Send + Sync + 'static) -> Self {
        self.on_decision = Some(Box::new(f));
        self
    }

    pub fn on_authorized(mut self, f: impl Fn(&WarrantResponse) + Send + Sync + 'static) -> Self {
        self.on_authorized = Some(Box::new(f));
        self
    }

    pub fn on_denied(mut self, f: impl Fn(&WarrantResponse) + Send + Sync + 'static) -> Self {
        self.on_denied = Some(Box::new(f));
        self
    }

    pub fn on_escalate(mut self, f: impl Fn(&WarrantResponse) + Send + Sync + 'static) -> Self {
        self.on_escalate = Some(Box::new(f));
        self
    }
}

impl DecisionObserver for Callbacks {
    fn on_decision(&self, response: &WarrantResponse) {
        if let Some(f) = &self.on_decision {
            f(response);
        }
    }

    fn on_authorized(&self, response: &WarrantResponse) {
        if let Some(f) = &self.on_authorized {
            f(response);
        }
    }

    fn on_denied(&self, response: &WarrantResponse) {
        if let Some(f) = &self.on_denied {
            f(response);
        }
    }

    fn on_escalate(&self, response: &WarrantResponse) {
        if let Some(f) = &self.on_escalate {
            f(response);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_decision", &self.on_decision.is_some())
            .field("on_authorized", &self.on_authorized.is_some())
            .field("on_denied", &self.on_denied.is_some())
            .field("on_escalate", &self.on_escalate.is_some())
            .finish()
    }
}

/// Fire the generic hook, then the one matching the decision
pub(crate) fn notify(observers: &[Arc<dyn DecisionObserver>], response: &WarrantResponse) {
    for observer in observers {
        let observer = observer.as_ref();
        guarded("on_decision", || observer.on_decision(response));
        match response.decision {
            Decision::Authorized => guarded("on_authorized", || observer.on_authorized(response)),
            Decision::Denied => guarded("on_denied", || observer.on_denied(response)),
            Decision::Escalate => guarded("on_escalate", || observer.on_escalate(response)),
            Decision::NoWarrant | Decision::Expired => {}
        }
    }
}

fn guarded(hook: &str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        warn!(hook, "decision observer panicked: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

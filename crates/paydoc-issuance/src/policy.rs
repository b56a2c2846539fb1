//! Issuance Policy
//!
//! Decides whether one paid intent may mint more than one document.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

/// How many documents a single succeeded intent may produce
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IssuancePolicy {
    /// Any number; every call yields a new artifact
    #[default]
    Unlimited,

    /// The first successful issuance claims the intent
    OncePerIntent,
}

impl IssuancePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unlimited => "unlimited",
            Self::OncePerIntent => "once-per-intent",
        }
    }
}

impl FromStr for IssuancePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "unlimited" => Ok(Self::Unlimited),
            "once-per-intent" | "once" => Ok(Self::OncePerIntent),
            other => Err(format!(
                "unknown issuance policy '{other}' (expected 'unlimited' or 'once-per-intent')"
            )),
        }
    }
}

/// Intent ids that already produced a document in this process
#[derive(Debug, Default)]
pub struct IssuanceLedger {
    issued: Mutex<HashSet<String>>,
}

impl IssuanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim an intent. Returns `None` if it is already claimed.
    ///
    /// The claim is given back when the returned [`Claim`] drops, unless it
    /// was committed first.
    pub fn claim(self: &Arc<Self>, intent_id: &str) -> Option<Claim> {
        let inserted = self
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(intent_id.to_string());

        inserted.then(|| Claim {
            ledger: Arc::clone(self),
            intent_id: intent_id.to_string(),
            committed: false,
        })
    }

    pub fn contains(&self, intent_id: &str) -> bool {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(intent_id)
    }

    fn release(&self, intent_id: &str) {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(intent_id);
    }
}

/// A held ledger entry for one intent
#[derive(Debug)]
pub struct Claim {
    ledger: Arc<IssuanceLedger>,
    intent_id: String,
    committed: bool,
}

impl Claim {
    /// Keep the entry: the document reached the caller
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(intent_id = %self.intent_id, "Releasing issuance claim");
            self.ledger.release(&self.intent_id);
        }
    }
}

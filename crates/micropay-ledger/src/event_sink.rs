//! Boundary to the append-only event log.

use alloy_primitives::U256;
use micropay_types::{Account, LedgerEvent};

/// Append-only, externally observable log the engine writes to.
pub trait EventSink {
    fn emit(&mut self, event: LedgerEvent);
}

/// In-memory event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event in emission order.
    #[must_use]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// `PaymentClaimed` events as `(sender, amount)` pairs, in order.
    #[must_use]
    pub fn claims(&self) -> Vec<(Account, U256)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::PaymentClaimed { sender, amount, .. } => Some((*sender, *amount)),
                _ => None,
            })
            .collect()
    }

    /// `Deposited` events as `(account, amount)` pairs, in order.
    #[must_use]
    pub fn deposits(&self) -> Vec<(Account, U256)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::Deposited { account, amount, .. } => Some((*account, *amount)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}

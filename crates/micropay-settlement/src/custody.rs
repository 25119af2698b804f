//! Custody conservation invariant checker.
//!
//! Invariant enforced over the engine's lifetime:
//! ```text
//! Σ pools == Σ deposits - Σ claims
//! ```
//!
//! Value only enters custody through deposits and only leaves it through
//! settled batches. If the pools ever disagree with that history, something
//! has gone catastrophically wrong.

use alloy_primitives::U256;
use micropay_types::{MicropayError, Result};

/// Tracks lifetime deposit and claim totals.
#[derive(Debug, Default)]
pub struct CustodyConservation {
    deposited: U256,
    claimed: U256,
}

impl CustodyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            deposited: U256::ZERO,
            claimed: U256::ZERO,
        }
    }

    /// Record a deposit.
    pub fn record_deposit(&mut self, amount: U256) {
        self.deposited = self.deposited.saturating_add(amount);
    }

    /// Record the total of a settled batch.
    pub fn record_claim(&mut self, amount: U256) {
        self.claimed = self.claimed.saturating_add(amount);
    }

    /// Expected value in custody: deposits - claims.
    #[must_use]
    pub fn expected_custody(&self) -> U256 {
        self.deposited.saturating_sub(self.claimed)
    }

    /// Verify that the sum of all pools matches the recorded history.
    ///
    /// # Errors
    /// Returns [`MicropayError::CustodyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, actual_pooled: U256) -> Result<()> {
        let expected = self.expected_custody();
        if actual_pooled != expected {
            return Err(MicropayError::CustodyInvariantViolation {
                reason: format!(
                    "pooled {actual_pooled} != expected {expected} \
                     (deposits={}, claims={})",
                    self.deposited, self.claimed,
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_deposits(&self) -> U256 {
        self.deposited
    }

    #[must_use]
    pub fn total_claims(&self) -> U256 {
        self.claimed
    }
}

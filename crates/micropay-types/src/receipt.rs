//! Claim receipts returned to the collector.
//!
//! A [`ClaimReceipt`] lists every voucher a batch applied, so the per-voucher
//! accounting can be checked after the fact against the event log.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Account, BatchId, Nonce};

/// One voucher as applied by a settled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedVoucher {
    pub sender: Account,
    pub nonce: Nonce,
    pub amount: U256,
}

/// Outcome of a successful `claim_payments` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub batch_id: BatchId,
    /// Who received the aggregate transfer.
    pub collector: Address,
    /// Sum of all applied amounts; the value of the single transfer.
    pub total: U256,
    /// Applied vouchers in submission order.
    pub applied: Vec<AppliedVoucher>,
    pub settled_at: DateTime<Utc>,
}

impl ClaimReceipt {
    /// Receipt for an empty batch: nothing applied, nothing transferred.
    #[must_use]
    pub fn empty(collector: Address) -> Self {
        Self {
            batch_id: BatchId::new(),
            collector,
            total: U256::ZERO,
            applied: Vec::new(),
            settled_at: Utc::now(),
        }
    }

    /// Whether the batch applied no vouchers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Total applied for one sender within this batch.
    #[must_use]
    pub fn total_for(&self, sender: Account) -> U256 {
        self.applied
            .iter()
            .filter(|v| v.sender == sender)
            .fold(U256::ZERO, |acc, v| acc.saturating_add(v.amount))
    }
}

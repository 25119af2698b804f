//! Externally observable ledger events.
//!
//! The engine appends an event for every deposit, every claimed voucher, and
//! every settled batch. Callers use these to reconcile per-voucher accounting
//! without reading engine internals.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Account, BatchId, Nonce};

/// One entry in the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Value was pulled into custody and credited to `account`'s pool.
    Deposited {
        account: Account,
        amount: U256,
        at: DateTime<Utc>,
    },
    /// One voucher was applied inside a settled batch.
    PaymentClaimed {
        batch_id: BatchId,
        sender: Account,
        collector: Address,
        nonce: Nonce,
        amount: U256,
        at: DateTime<Utc>,
    },
    /// A batch committed and its total was transferred to the collector.
    BatchSettled {
        batch_id: BatchId,
        collector: Address,
        vouchers: usize,
        total: U256,
        at: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// Short uppercase tag for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deposited { .. } => "DEPOSITED",
            Self::PaymentClaimed { .. } => "PAYMENT_CLAIMED",
            Self::BatchSettled { .. } => "BATCH_SETTLED",
        }
    }

    /// When the event was recorded.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Deposited { at, .. }
            | Self::PaymentClaimed { at, .. }
            | Self::BatchSettled { at, .. } => *at,
        }
    }
}

impl std::fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposited {
                account, amount, ..
            } => write!(f, "DEPOSITED {account} {amount}"),
            Self::PaymentClaimed {
                sender,
                amount,
                nonce,
                ..
            } => write!(f, "PAYMENT_CLAIMED {sender} {amount} {}", nonce.short()),
            Self::BatchSettled {
                batch_id,
                vouchers,
                total,
                ..
            } => write!(f, "BATCH_SETTLED {batch_id} vouchers={vouchers} total={total}"),
        }
    }
}

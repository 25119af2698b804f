//! Identifiers used throughout Micropay.
//!
//! Accounts are 20-byte EVM addresses, voucher nonces are opaque 32-byte
//! values, and settled batches are tagged with a UUIDv7.

use std::fmt;

use alloy_primitives::{Address, B256, keccak256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::NONCE_LEN;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// An account identity: pool key and signer identity at once.
pub type Account = Address;

// ---------------------------------------------------------------------------
// Nonce
// ---------------------------------------------------------------------------

/// Single-use voucher identifier, encoded as `bytes32` in the signed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Nonce(pub B256);

impl Nonce {
    #[must_use]
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(B256::new(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0.0
    }

    /// Derive a nonce the way payer tooling does it:
    /// `keccak256("<checksummed account><unix millis>")`.
    #[must_use]
    pub fn for_payer(account: Account, at: DateTime<Utc>) -> Self {
        Self(keccak256(format!("{account}{}", at.timestamp_millis())))
    }

    /// Random nonce for tests.
    #[cfg(feature = "test-helpers")]
    #[must_use]
    pub fn random() -> Self {
        Self::from_bytes(rand::random())
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.as_bytes()[..4])
    }
}

impl From<B256> for Nonce {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nonce:0x{}", hex::encode(self.as_bytes()))
    }
}

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Identifier of one claim batch. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

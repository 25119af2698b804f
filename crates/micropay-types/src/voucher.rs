//! # Voucher: the signed, single-use payment authorization
//!
//! A payer signs a [`ClaimMessage`] off-chain and hands the resulting
//! [`Voucher`] to the collector, who later redeems it in a claim batch.
//!
//! ## Canonical encoding
//!
//! ```text
//!   encoded      = abi.encode(address collector, uint256 amount, bytes32 nonce, address domain)
//!   message_hash = keccak256(encoded)
//!   digest       = keccak256("\x19Ethereum Signed Message:\n32" || message_hash)
//! ```
//!
//! The payer signs `digest` (an EIP-191 personal message over the 32-byte
//! `message_hash`). The collector and domain tag are bound into the message,
//! so a voucher is only redeemable by one collector on one engine instance.

use alloy_primitives::{Address, B256, Bytes, U256, eip191_hash_message, keccak256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::{Account, Nonce};

/// The tuple a payer signs: who may claim, how much, which nonce, which engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMessage {
    /// The collector allowed to redeem the voucher.
    pub collector: Address,
    /// Amount in the smallest indivisible unit.
    pub amount: U256,
    /// Single-use identifier.
    pub nonce: Nonce,
    /// The engine instance the voucher is bound to.
    pub domain: Address,
}

impl ClaimMessage {
    #[must_use]
    pub fn new(collector: Address, amount: U256, nonce: Nonce, domain: Address) -> Self {
        Self {
            collector,
            amount,
            nonce,
            domain,
        }
    }

    /// ABI encoding of `(collector, amount, nonce, domain)`: 128 bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        (self.collector, self.amount, self.nonce.0, self.domain).abi_encode_params()
    }

    /// `keccak256` of the ABI encoding. This is what the payer signs.
    #[must_use]
    pub fn hash(&self) -> B256 {
        keccak256(self.encode())
    }

    /// The EIP-191 digest actually covered by the signature.
    #[must_use]
    pub fn signing_digest(&self) -> B256 {
        eip191_hash_message(self.hash())
    }
}

/// A signed payment voucher as submitted by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// The payer whose pool is debited. Must match the recovered signer.
    pub sender: Account,
    /// Amount to move from the sender's pool to the collector.
    pub amount: U256,
    /// Single-use identifier.
    pub nonce: Nonce,
    /// 65-byte `r || s || v` signature over [`ClaimMessage::signing_digest`].
    pub signature: Bytes,
}

impl Voucher {
    /// Rebuild the message this voucher should have been signed over, for the
    /// given collector and engine domain.
    #[must_use]
    pub fn claim_message(&self, collector: Address, domain: Address) -> ClaimMessage {
        ClaimMessage::new(collector, self.amount, self.nonce, domain)
    }
}

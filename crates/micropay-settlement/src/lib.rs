//! # micropay-settlement
//!
//! **Settlement plane**: deposits into custody, voucher verification, replay
//! prevention, and atomic claim batches.
//!
//! ## Architecture
//!
//! A payer funds a pool once with [`SettlementEngine::deposit`], then signs
//! off-ledger vouchers. The collector later redeems any number of them with
//! [`SettlementEngine::claim_payments`], which:
//! 1. Authorizes the caller as the collector
//! 2. Verifies each voucher's signature against its declared sender
//! 3. Consumes each nonce exactly once
//! 4. Debits each sender's pool
//! 5. Pays the batch total out of custody in one transfer
//!
//! The batch either settles completely or has no effect at all.
//! [`CustodyConservation`] tracks deposit and claim history so pools can be
//! checked against it at any time.

pub mod custody;
pub mod engine;
pub mod shared;

pub use custody::CustodyConservation;
pub use engine::SettlementEngine;
pub use shared::SharedEngine;

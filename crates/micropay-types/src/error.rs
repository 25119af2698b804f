//! Error types for the Micropay settlement engine.
//!
//! All errors use the `MP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Authorization errors
//! - 2xx: Signature errors
//! - 3xx: Nonce errors
//! - 4xx: Pool / amount errors
//! - 5xx: Value store errors
//! - 6xx: Batch errors
//! - 8xx: Invariant errors
//! - 9xx: General / internal errors

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::Nonce;

/// Central error enum for all Micropay operations.
#[derive(Debug, Error)]
pub enum MicropayError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// Someone other than the collector tried to claim payments.
    #[error("MP_ERR_100: Unauthorized: {caller} is not the collector {collector}")]
    Unauthorized { caller: Address, collector: Address },

    // =================================================================
    // Signature Errors (2xx)
    // =================================================================
    /// The signature is malformed or does not recover to a valid signer.
    #[error("MP_ERR_200: Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// The signature recovered to someone other than the declared sender.
    #[error("MP_ERR_201: Sender mismatch: voucher declares {declared}, signature recovers {recovered}")]
    SenderMismatch {
        declared: Address,
        recovered: Address,
    },

    // =================================================================
    // Nonce Errors (3xx)
    // =================================================================
    /// The nonce was already consumed (replay or intra-batch duplicate).
    #[error("MP_ERR_300: Nonce already used: {0}")]
    NonceAlreadyUsed(Nonce),

    // =================================================================
    // Pool / Amount Errors (4xx)
    // =================================================================
    /// The pool does not hold enough to cover the debit.
    #[error("MP_ERR_400: Insufficient pool for {account}: need {needed}, have {available}")]
    InsufficientPool {
        account: Address,
        needed: U256,
        available: U256,
    },

    /// The amount is zero or otherwise rejected by policy.
    #[error("MP_ERR_401: Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: U256, reason: String },

    /// A pool credit would overflow 256 bits.
    #[error("MP_ERR_402: Pool overflow for {account}")]
    PoolOverflow { account: Address },

    // =================================================================
    // Value Store Errors (5xx)
    // =================================================================
    /// The external value store refused a transfer.
    #[error("MP_ERR_500: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // Batch Errors (6xx)
    // =================================================================
    /// The batch holds more vouchers than the configured limit.
    #[error("MP_ERR_600: Batch too large: {size} vouchers, limit {max}")]
    BatchTooLarge { size: usize, max: usize },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Custody conservation invariant violated. Critical safety alert.
    #[error("MP_ERR_800: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("MP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (zero addresses, bad limits, etc.).
    #[error("MP_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MicropayError>;

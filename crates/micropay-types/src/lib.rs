//! # micropay-types
//!
//! Shared types, errors, and configuration for the **Micropay** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Account`], [`Nonce`], [`BatchId`]
//! - **Voucher model**: [`Voucher`], [`ClaimMessage`]
//! - **Events**: [`LedgerEvent`]
//! - **Receipts**: [`ClaimReceipt`], [`AppliedVoucher`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`MicropayError`] with `MP_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod receipt;
pub mod voucher;

// Re-export all primary types at crate root for ergonomic imports:
//   use micropay_types::{Voucher, Nonce, MicropayError, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use receipt::*;
pub use voucher::*;

// The numeric and address primitives every crate works with.
pub use alloy_primitives::{Address, B256, Bytes, U256};

// Constants are accessed via `micropay_types::constants::FOO`
// (not re-exported to avoid name collisions).

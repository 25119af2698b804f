//! # micropay-ledger
//!
//! **Ledger plane**: the stateful and pure building blocks the settlement
//! engine orchestrates.
//!
//! ## Components
//!
//! 1. **signature**: recovers the signer of a claim message (pure, no state)
//! 2. **NonceRegistry**: append-only set of consumed voucher nonces
//! 3. **PoolLedger**: per-account deposited balances available for claims
//! 4. **ValueStore**: boundary to the external ledger that actually moves value
//! 5. **EventSink**: boundary to the append-only event log
//!
//! ## Batch staging
//!
//! Both stateful components hand out a staged view (`stage()`) that records a
//! batch's effects without touching committed state. The engine commits the
//! staged effects only once the whole batch has validated:
//!
//! ```text
//! PoolLedger.stage() ─┐
//!                     ├─ per voucher: verify → consume nonce → debit
//! NonceRegistry.stage()┘
//!     → ValueStore.transfer_to() → PoolLedger.apply_debits() → NonceRegistry.commit()
//! ```

pub mod event_sink;
pub mod nonce_registry;
pub mod pool_ledger;
pub mod signature;
pub mod value_store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use event_sink::{EventLog, EventSink};
pub use nonce_registry::{NonceBatch, NonceRegistry};
pub use pool_ledger::{PoolBatch, PoolLedger};
pub use signature::{recover_signer, recover_signer_from_digest};
pub use value_store::{InMemoryValueStore, ValueStore};

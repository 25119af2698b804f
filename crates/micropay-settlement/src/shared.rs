//! Thread-safe handle to a settlement engine.
//!
//! Concurrent claim batches must behave as if run one after another: two
//! batches carrying the same nonce can never both settle. The handle
//! serializes every operation behind one mutex, so each batch sees the
//! committed effects of every batch that finished before it.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use micropay_ledger::{EventLog, EventSink, ValueStore};
use micropay_types::{Account, ClaimReceipt, Nonce, Result, Voucher};
use parking_lot::Mutex;

use crate::engine::SettlementEngine;

/// Cloneable, `Send + Sync` wrapper around a [`SettlementEngine`].
pub struct SharedEngine<V, E = EventLog> {
    inner: Arc<Mutex<SettlementEngine<V, E>>>,
}

impl<V, E> Clone for SharedEngine<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: ValueStore, E: EventSink> SharedEngine<V, E> {
    #[must_use]
    pub fn new(engine: SettlementEngine<V, E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// See [`SettlementEngine::deposit`].
    pub fn deposit(&self, depositor: Account, amount: U256) -> Result<U256> {
        self.inner.lock().deposit(depositor, amount)
    }

    /// See [`SettlementEngine::claim_payments`].
    pub fn claim_payments(&self, caller: Address, vouchers: &[Voucher]) -> Result<ClaimReceipt> {
        self.inner.lock().claim_payments(caller, vouchers)
    }

    #[must_use]
    pub fn pool_balance(&self, account: Account) -> U256 {
        self.inner.lock().pool_balance(account)
    }

    #[must_use]
    pub fn is_nonce_used(&self, nonce: &Nonce) -> bool {
        self.inner.lock().is_nonce_used(nonce)
    }

    /// Run `f` with shared access to the engine, holding the lock.
    pub fn with<R>(&self, f: impl FnOnce(&SettlementEngine<V, E>) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Run `f` with exclusive access to the engine, holding the lock.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut SettlementEngine<V, E>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micropay_ledger::InMemoryValueStore;
    use micropay_ledger::testing::TestPayer;
    use micropay_types::{EngineConfig, MicropayError};

    const COLLECTOR: Address = Address::repeat_byte(0xc0);
    const DOMAIN: Address = Address::repeat_byte(0xd0);

    fn shared(payer: &TestPayer) -> SharedEngine<InMemoryValueStore> {
        let mut store = InMemoryValueStore::new();
        store.mint(payer.address(), U256::from(1000)).unwrap();
        store.approve(payer.address(), DOMAIN, U256::MAX);
        let engine =
            SettlementEngine::new(EngineConfig::new(COLLECTOR, DOMAIN), store, EventLog::new())
                .unwrap();
        SharedEngine::new(engine)
    }

    #[test]
    fn clones_share_state() {
        let payer = TestPayer::from_seed(1);
        let engine = shared(&payer);
        let other = engine.clone();

        engine.deposit(payer.address(), U256::from(50)).unwrap();
        assert_eq!(other.pool_balance(payer.address()), U256::from(50));
    }

    #[test]
    fn with_mut_funds_a_new_payer_under_the_lock() {
        let payer = TestPayer::from_seed(1);
        let engine = shared(&payer);
        let late = TestPayer::from_seed(2);

        engine.with_mut(|e| {
            let store = e.store_mut();
            store.mint(late.address(), U256::from(40)).unwrap();
            store.approve(late.address(), DOMAIN, U256::MAX);
        });
        engine.deposit(late.address(), U256::from(40)).unwrap();

        assert_eq!(engine.pool_balance(late.address()), U256::from(40));
        engine.with(|e| {
            assert_eq!(e.store().balance_of(late.address()), U256::ZERO);
            e.verify_custody().unwrap();
        });
    }

    #[test]
    fn racing_batches_with_same_nonce_settle_once() {
        let payer = TestPayer::from_seed(1);
        let engine = shared(&payer);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let voucher = payer.voucher(COLLECTOR, DOMAIN, 5, Nonce::random());
        let results: Vec<Result<ClaimReceipt>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let engine = engine.clone();
                    let batch = vec![voucher.clone()];
                    scope.spawn(move || engine.claim_payments(COLLECTOR, &batch))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let settled = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(settled, 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|err| matches!(
            err,
            MicropayError::NonceAlreadyUsed(n) if *n == voucher.nonce
        )));
        assert_eq!(engine.pool_balance(payer.address()), U256::from(95));
        engine.with(|e| {
            assert_eq!(e.store().balance_of(COLLECTOR), U256::from(5));
            e.verify_custody().unwrap();
        });
    }
}

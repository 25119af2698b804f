//! Settlement engine: deposits and atomic claim batches.
//!
//! A claim batch is applied voucher by voucher in submission order:
//! 1. Check the amount against policy (zero is rejected unless allowed)
//! 2. Recover the signer of `(collector, amount, nonce, domain)`; it must be
//!    the declared sender
//! 3. Consume the nonce (sees nonces consumed earlier in the same batch)
//! 4. Debit the sender's pool (sees earlier debits in the same batch)
//! 5. Add the amount to the running total
//!
//! Steps 3 and 4 run against staged views. Only when every voucher passes is
//! the total paid to the collector in one transfer, after which the staged
//! debits and nonces are committed and events are emitted. A failure anywhere
//! leaves pools, nonces, custody and the event log exactly as they were.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use chrono::Utc;
use micropay_ledger::{EventLog, EventSink, NonceRegistry, PoolLedger, ValueStore, recover_signer};
use micropay_types::{
    Account, AppliedVoucher, BatchId, ClaimReceipt, EngineConfig, LedgerEvent, MicropayError,
    Nonce, Result, Voucher,
};

use crate::custody::CustodyConservation;

/// Effects of a fully validated batch, not yet committed.
struct StagedBatch {
    applied: Vec<AppliedVoucher>,
    debits: HashMap<Account, U256>,
    consumed: Vec<Nonce>,
    total: U256,
}

/// The settlement engine for one deployment.
///
/// Exclusively owns the pool ledger and nonce registry. Every mutating call
/// takes `&mut self`, so a batch always runs against a consistent snapshot;
/// wrap the engine in [`crate::SharedEngine`] to share it across threads.
pub struct SettlementEngine<V, E = EventLog> {
    config: EngineConfig,
    pools: PoolLedger,
    nonces: NonceRegistry,
    custody: CustodyConservation,
    store: V,
    events: E,
}

impl<V: ValueStore, E: EventSink> SettlementEngine<V, E> {
    /// Create an engine with empty pools and no consumed nonces.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(config: EngineConfig, store: V, events: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pools: PoolLedger::new(),
            nonces: NonceRegistry::new(),
            custody: CustodyConservation::new(),
            store,
            events,
        })
    }

    /// Pull `amount` from `depositor` into custody and credit their pool.
    /// Returns the new pool balance.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is zero or `depositor` is the custody
    ///   account itself
    /// - `PoolOverflow` if the pool cannot hold `amount` more
    /// - `TransferFailed` if the value store refuses the pull
    pub fn deposit(&mut self, depositor: Account, amount: U256) -> Result<U256> {
        if amount.is_zero() {
            return Err(MicropayError::InvalidAmount {
                amount,
                reason: "deposit must be positive".into(),
            });
        }
        // A self-transfer into custody would credit the pool without moving value.
        if depositor == self.config.domain {
            return Err(MicropayError::InvalidAmount {
                amount,
                reason: "custody account cannot deposit into itself".into(),
            });
        }
        if self.pools.balance(depositor).checked_add(amount).is_none() {
            return Err(MicropayError::PoolOverflow { account: depositor });
        }

        self.store
            .transfer_from(depositor, self.config.domain, amount)?;
        let balance = self.pools.deposit(depositor, amount)?;
        self.custody.record_deposit(amount);

        self.events.emit(LedgerEvent::Deposited {
            account: depositor,
            amount,
            at: Utc::now(),
        });
        tracing::info!(
            account = %depositor,
            amount = %amount,
            pool = %balance,
            "Deposit credited"
        );
        Ok(balance)
    }

    /// Redeem a batch of vouchers for the collector, all or nothing.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the collector
    /// - `BatchTooLarge` if the batch exceeds `max_batch_size`
    /// - `InvalidAmount`, `InvalidSignature`, `SenderMismatch`,
    ///   `NonceAlreadyUsed`, `InsufficientPool` from the first failing voucher
    /// - `TransferFailed` if the aggregate payout is refused
    pub fn claim_payments(&mut self, caller: Address, vouchers: &[Voucher]) -> Result<ClaimReceipt> {
        let collector = self.config.collector;
        if caller != collector {
            tracing::warn!(caller = %caller, "Claim rejected: caller is not the collector");
            return Err(MicropayError::Unauthorized { caller, collector });
        }
        if vouchers.len() > self.config.max_batch_size {
            return Err(MicropayError::BatchTooLarge {
                size: vouchers.len(),
                max: self.config.max_batch_size,
            });
        }
        if vouchers.is_empty() {
            tracing::debug!("Empty claim batch, nothing to settle");
            return Ok(ClaimReceipt::empty(collector));
        }

        let batch_id = BatchId::new();
        let staged = self.stage_batch(vouchers).map_err(|(index, err)| {
            tracing::warn!(
                batch = %batch_id,
                index,
                error = %err,
                "Claim batch rejected"
            );
            err
        })?;

        if let Err(err) = self
            .store
            .transfer_to(self.config.domain, collector, staged.total)
        {
            tracing::warn!(
                batch = %batch_id,
                total = %staged.total,
                error = %err,
                "Claim batch payout refused"
            );
            return Err(err);
        }

        // Staged under exclusive access, so neither commit can fail here.
        self.pools.apply_debits(staged.debits)?;
        self.nonces.commit(staged.consumed)?;
        self.custody.record_claim(staged.total);

        let settled_at = Utc::now();
        for applied in &staged.applied {
            tracing::debug!(
                batch = %batch_id,
                sender = %applied.sender,
                nonce = %applied.nonce.short(),
                amount = %applied.amount,
                "Voucher claimed"
            );
            self.events.emit(LedgerEvent::PaymentClaimed {
                batch_id,
                sender: applied.sender,
                collector,
                nonce: applied.nonce,
                amount: applied.amount,
                at: settled_at,
            });
        }
        self.events.emit(LedgerEvent::BatchSettled {
            batch_id,
            collector,
            vouchers: staged.applied.len(),
            total: staged.total,
            at: settled_at,
        });

        tracing::info!(
            batch = %batch_id,
            vouchers = staged.applied.len(),
            total = %staged.total,
            "Claim batch settled"
        );

        Ok(ClaimReceipt {
            batch_id,
            collector,
            total: staged.total,
            applied: staged.applied,
            settled_at,
        })
    }

    /// Validate every voucher against staged views. On failure returns the
    /// index of the offending voucher with its error.
    fn stage_batch(
        &self,
        vouchers: &[Voucher],
    ) -> std::result::Result<StagedBatch, (usize, MicropayError)> {
        let mut pools = self.pools.stage();
        let mut nonces = self.nonces.stage();
        let mut applied = Vec::with_capacity(vouchers.len());
        let mut total = U256::ZERO;

        for (index, voucher) in vouchers.iter().enumerate() {
            let fail = |err| (index, err);

            self.verify_voucher(voucher).map_err(fail)?;
            nonces.consume(voucher.nonce).map_err(fail)?;
            pools.debit(voucher.sender, voucher.amount).map_err(fail)?;
            total = total.checked_add(voucher.amount).ok_or_else(|| {
                fail(MicropayError::Internal("batch total overflows".into()))
            })?;

            applied.push(AppliedVoucher {
                sender: voucher.sender,
                nonce: voucher.nonce,
                amount: voucher.amount,
            });
        }

        Ok(StagedBatch {
            applied,
            debits: pools.into_debits(),
            consumed: nonces.into_consumed(),
            total,
        })
    }

    /// Amount policy plus signer recovery for one voucher.
    fn verify_voucher(&self, voucher: &Voucher) -> Result<()> {
        if voucher.amount.is_zero() && !self.config.allow_zero_amount {
            return Err(MicropayError::InvalidAmount {
                amount: voucher.amount,
                reason: "zero-amount vouchers are not accepted".into(),
            });
        }

        let message = voucher.claim_message(self.config.collector, self.config.domain);
        let recovered = recover_signer(&message, &voucher.signature)?;
        if recovered != voucher.sender {
            return Err(MicropayError::SenderMismatch {
                declared: voucher.sender,
                recovered,
            });
        }
        Ok(())
    }

    /// Check custody conservation: pools match deposit/claim history and the
    /// custody account holds exactly the pooled total.
    pub fn verify_custody(&self) -> Result<()> {
        let pooled = self.pools.total_pooled();
        self.custody.verify(pooled)?;

        let held = self.store.balance_of(self.config.domain);
        if held != pooled {
            return Err(MicropayError::CustodyInvariantViolation {
                reason: format!("custody holds {held}, pools total {pooled}"),
            });
        }
        Ok(())
    }

    /// Pool available to `account`.
    #[must_use]
    pub fn pool_balance(&self, account: Account) -> U256 {
        self.pools.balance(account)
    }

    /// Whether `nonce` has been consumed by a settled batch.
    #[must_use]
    pub fn is_nonce_used(&self, nonce: &Nonce) -> bool {
        self.nonces.is_used(nonce)
    }

    /// Number of nonces consumed so far.
    #[must_use]
    pub fn used_nonce_count(&self) -> usize {
        self.nonces.len()
    }

    /// Sum of every pool.
    #[must_use]
    pub fn total_pooled(&self) -> U256 {
        self.pools.total_pooled()
    }

    #[must_use]
    pub fn collector(&self) -> Address {
        self.config.collector
    }

    #[must_use]
    pub fn domain(&self) -> Address {
        self.config.domain
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn events(&self) -> &E {
        &self.events
    }

    #[must_use]
    pub fn store(&self) -> &V {
        &self.store
    }

    /// Mutable access to the value store, for funding and approvals.
    pub fn store_mut(&mut self) -> &mut V {
        &mut self.store
    }

    #[must_use]
    pub fn custody(&self) -> &CustodyConservation {
        &self.custody
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use micropay_ledger::InMemoryValueStore;
    use micropay_ledger::testing::TestPayer;

    const COLLECTOR: Address = Address::repeat_byte(0xc0);
    const DOMAIN: Address = Address::repeat_byte(0xd0);

    fn engine_with(config: EngineConfig, payers: &[&TestPayer]) -> SettlementEngine<InMemoryValueStore> {
        let mut store = InMemoryValueStore::new();
        for payer in payers {
            store.mint(payer.address(), U256::from(1000)).unwrap();
            store.approve(payer.address(), DOMAIN, U256::MAX);
        }
        SettlementEngine::new(config, store, EventLog::new()).unwrap()
    }

    fn engine(payers: &[&TestPayer]) -> SettlementEngine<InMemoryValueStore> {
        engine_with(EngineConfig::new(COLLECTOR, DOMAIN), payers)
    }

    #[test]
    fn new_rejects_bad_config() {
        let config = EngineConfig::new(COLLECTOR, COLLECTOR);
        let result = SettlementEngine::new(config, InMemoryValueStore::new(), EventLog::new());
        assert!(matches!(result, Err(MicropayError::Configuration(_))));
    }

    #[test]
    fn deposit_credits_pool_and_custody() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);

        let pool = engine.deposit(payer.address(), U256::from(100)).unwrap();
        assert_eq!(pool, U256::from(100));
        assert_eq!(engine.pool_balance(payer.address()), U256::from(100));
        assert_eq!(engine.store().balance_of(DOMAIN), U256::from(100));
        assert_eq!(engine.store().balance_of(payer.address()), U256::from(900));
        assert_eq!(engine.events().deposits(), vec![(payer.address(), U256::from(100))]);
        engine.verify_custody().unwrap();
    }

    #[test]
    fn zero_deposit_rejected() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        let err = engine.deposit(payer.address(), U256::ZERO).unwrap_err();
        assert!(matches!(err, MicropayError::InvalidAmount { .. }));
        assert!(engine.events().is_empty());
    }

    #[test]
    fn custody_account_cannot_deposit() {
        let mut store = InMemoryValueStore::new();
        store.mint(DOMAIN, U256::from(100)).unwrap();
        store.approve(DOMAIN, DOMAIN, U256::MAX);
        let mut engine =
            SettlementEngine::new(EngineConfig::new(COLLECTOR, DOMAIN), store, EventLog::new())
                .unwrap();

        let err = engine.deposit(DOMAIN, U256::from(100)).unwrap_err();
        assert!(matches!(err, MicropayError::InvalidAmount { .. }));
        assert_eq!(engine.pool_balance(DOMAIN), U256::ZERO);
        assert_eq!(engine.store().balance_of(DOMAIN), U256::from(100));
        assert!(engine.events().is_empty());
        assert_eq!(engine.custody().total_deposits(), U256::ZERO);
    }

    #[test]
    fn deposit_without_allowance_fails_cleanly() {
        let payer = TestPayer::from_seed(1);
        let mut store = InMemoryValueStore::new();
        store.mint(payer.address(), U256::from(1000)).unwrap();
        let mut engine =
            SettlementEngine::new(EngineConfig::new(COLLECTOR, DOMAIN), store, EventLog::new())
                .unwrap();

        let err = engine.deposit(payer.address(), U256::from(100)).unwrap_err();
        assert!(matches!(err, MicropayError::TransferFailed { .. }));
        assert_eq!(engine.pool_balance(payer.address()), U256::ZERO);
        assert!(engine.events().is_empty());
        engine.verify_custody().unwrap();
    }

    #[test]
    fn solo_claim_settles() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let voucher = payer.voucher(COLLECTOR, DOMAIN, 5, Nonce::random());
        let receipt = engine.claim_payments(COLLECTOR, &[voucher.clone()]).unwrap();

        assert_eq!(receipt.total, U256::from(5));
        assert_eq!(receipt.applied.len(), 1);
        assert_eq!(engine.pool_balance(payer.address()), U256::from(95));
        assert!(engine.is_nonce_used(&voucher.nonce));
        assert_eq!(engine.store().balance_of(COLLECTOR), U256::from(5));
        engine.verify_custody().unwrap();
    }

    #[test]
    fn non_collector_unauthorized() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let voucher = payer.voucher(COLLECTOR, DOMAIN, 5, Nonce::random());
        let err = engine
            .claim_payments(payer.address(), &[voucher.clone()])
            .unwrap_err();
        assert!(matches!(err, MicropayError::Unauthorized { caller, .. } if caller == payer.address()));
        assert!(!engine.is_nonce_used(&voucher.nonce));
        assert_eq!(engine.pool_balance(payer.address()), U256::from(100));
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut engine = engine(&[]);
        let events_before = engine.events().len();
        let receipt = engine.claim_payments(COLLECTOR, &[]).unwrap();
        assert!(receipt.is_empty());
        assert_eq!(receipt.total, U256::ZERO);
        assert_eq!(engine.events().len(), events_before);
        assert_eq!(engine.store().balance_of(COLLECTOR), U256::ZERO);
    }

    #[test]
    fn zero_amount_rejected_by_default() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let voucher = payer.voucher(COLLECTOR, DOMAIN, 0, Nonce::random());
        let err = engine.claim_payments(COLLECTOR, &[voucher.clone()]).unwrap_err();
        assert!(matches!(err, MicropayError::InvalidAmount { .. }));
        assert!(!engine.is_nonce_used(&voucher.nonce));
    }

    #[test]
    fn zero_amount_accepted_when_allowed() {
        let payer = TestPayer::from_seed(1);
        let config = EngineConfig::new(COLLECTOR, DOMAIN).with_zero_amounts(true);
        let mut engine = engine_with(config, &[&payer]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let voucher = payer.voucher(COLLECTOR, DOMAIN, 0, Nonce::random());
        let receipt = engine.claim_payments(COLLECTOR, &[voucher.clone()]).unwrap();
        assert_eq!(receipt.total, U256::ZERO);
        assert!(engine.is_nonce_used(&voucher.nonce));
        assert_eq!(engine.pool_balance(payer.address()), U256::from(100));
        assert_eq!(engine.events().claims(), vec![(payer.address(), U256::ZERO)]);
    }

    #[test]
    fn batch_too_large_rejected() {
        let payer = TestPayer::from_seed(1);
        let config = EngineConfig::new(COLLECTOR, DOMAIN).with_max_batch_size(2);
        let mut engine = engine_with(config, &[&payer]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let vouchers: Vec<Voucher> = (0..3)
            .map(|_| payer.voucher(COLLECTOR, DOMAIN, 1, Nonce::random()))
            .collect();
        let err = engine.claim_payments(COLLECTOR, &vouchers).unwrap_err();
        assert!(matches!(err, MicropayError::BatchTooLarge { size: 3, max: 2 }));
        assert_eq!(engine.used_nonce_count(), 0);
    }

    #[test]
    fn sender_mismatch_detected() {
        let payer = TestPayer::from_seed(1);
        let impostor = TestPayer::from_seed(2);
        let mut engine = engine(&[&payer, &impostor]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        // Impostor signs, but names the funded payer as sender.
        let mut voucher = impostor.voucher(COLLECTOR, DOMAIN, 5, Nonce::random());
        voucher.sender = payer.address();
        let err = engine.claim_payments(COLLECTOR, &[voucher]).unwrap_err();
        assert!(matches!(
            err,
            MicropayError::SenderMismatch { declared, recovered }
                if declared == payer.address() && recovered == impostor.address()
        ));
        assert_eq!(engine.pool_balance(payer.address()), U256::from(100));
    }

    #[test]
    fn malformed_signature_rejected() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let mut voucher = payer.voucher(COLLECTOR, DOMAIN, 5, Nonce::random());
        voucher.signature = Bytes::from(voucher.signature[..64].to_vec());
        let err = engine.claim_payments(COLLECTOR, &[voucher]).unwrap_err();
        assert!(matches!(err, MicropayError::InvalidSignature { .. }));
    }

    #[test]
    fn insufficient_pool_rejected() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        engine.deposit(payer.address(), U256::from(10)).unwrap();

        let voucher = payer.voucher(COLLECTOR, DOMAIN, 11, Nonce::random());
        let err = engine.claim_payments(COLLECTOR, &[voucher]).unwrap_err();
        assert!(matches!(err, MicropayError::InsufficientPool { .. }));
        assert_eq!(engine.pool_balance(payer.address()), U256::from(10));
    }

    #[test]
    fn sequential_debits_compose_within_batch() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        engine.deposit(payer.address(), U256::from(10)).unwrap();

        let first = payer.voucher(COLLECTOR, DOMAIN, 6, Nonce::random());
        let second = payer.voucher(COLLECTOR, DOMAIN, 5, Nonce::random());
        let err = engine
            .claim_payments(COLLECTOR, &[first.clone(), second])
            .unwrap_err();
        assert!(matches!(
            err,
            MicropayError::InsufficientPool { available, .. } if available == U256::from(4)
        ));
        assert_eq!(engine.pool_balance(payer.address()), U256::from(10));
        assert!(!engine.is_nonce_used(&first.nonce));
    }

    #[test]
    fn voucher_for_other_collector_rejected() {
        let payer = TestPayer::from_seed(1);
        let mut engine = engine(&[&payer]);
        engine.deposit(payer.address(), U256::from(100)).unwrap();

        let voucher = payer.voucher(Address::repeat_byte(0xc1), DOMAIN, 5, Nonce::random());
        let err = engine.claim_payments(COLLECTOR, &[voucher]).unwrap_err();
        assert!(matches!(err, MicropayError::SenderMismatch { .. }));
    }
}

//! Pool ledger: per-account deposited balances.
//!
//! A pool only ever changes in two ways: a deposit credits it, a claim debits
//! it by exactly the claimed amount. Balances never go negative. All
//! mutations are atomic: either the full operation succeeds or the ledger is
//! unchanged.

use std::collections::HashMap;

use alloy_primitives::U256;
use micropay_types::{Account, MicropayError, Result};

/// Manages per-account pool balances.
///
/// The `PoolLedger` is the source of truth for what each payer has
/// available for voucher settlement.
#[derive(Debug, Default)]
pub struct PoolLedger {
    pools: HashMap<Account, U256>,
}

impl PoolLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
        }
    }

    /// Credit `amount` to `account`'s pool.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is zero
    /// - `PoolOverflow` if the balance would exceed 256 bits
    pub fn deposit(&mut self, account: Account, amount: U256) -> Result<U256> {
        if amount.is_zero() {
            return Err(MicropayError::InvalidAmount {
                amount,
                reason: "deposit must be positive".into(),
            });
        }
        let entry = self.pools.entry(account).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or(MicropayError::PoolOverflow { account })?;
        Ok(*entry)
    }

    /// Debit `amount` from `account`'s pool if it holds at least that much.
    ///
    /// # Errors
    /// Returns `InsufficientPool` if balance < amount; the pool is unchanged.
    pub fn debit(&mut self, account: Account, amount: U256) -> Result<U256> {
        let available = self.balance(account);
        if available < amount {
            return Err(MicropayError::InsufficientPool {
                account,
                needed: amount,
                available,
            });
        }
        let remaining = available - amount;
        self.pools.insert(account, remaining);
        Ok(remaining)
    }

    /// Open a staged view for one batch. Nothing is debited until the staged
    /// debits are passed to [`PoolLedger::apply_debits`].
    #[must_use]
    pub fn stage(&self) -> PoolBatch<'_> {
        PoolBatch {
            ledger: self,
            debits: HashMap::new(),
        }
    }

    /// Apply every staged debit, or none of them.
    ///
    /// # Errors
    /// Returns `InsufficientPool` for the first account that cannot cover its
    /// aggregated debit; the ledger is unchanged.
    pub fn apply_debits(&mut self, debits: HashMap<Account, U256>) -> Result<()> {
        for (account, amount) in &debits {
            let available = self.balance(*account);
            if available < *amount {
                return Err(MicropayError::InsufficientPool {
                    account: *account,
                    needed: *amount,
                    available,
                });
            }
        }
        let accounts = debits.len();
        for (account, amount) in debits {
            self.debit(account, amount)?;
        }
        tracing::debug!(accounts, "Staged debits applied");
        Ok(())
    }

    /// Current pool of `account`; zero if it never deposited.
    #[must_use]
    pub fn balance(&self, account: Account) -> U256 {
        self.pools.get(&account).copied().unwrap_or_default()
    }

    /// Sum of every pool.
    #[must_use]
    pub fn total_pooled(&self) -> U256 {
        self.pools
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }

    /// Number of accounts that have ever deposited.
    #[must_use]
    pub fn accounts(&self) -> usize {
        self.pools.len()
    }
}

/// Debits of an in-flight batch, layered over the committed ledger.
///
/// Each debit is checked against the committed balance minus everything the
/// batch already debited from the same account.
#[derive(Debug)]
pub struct PoolBatch<'a> {
    ledger: &'a PoolLedger,
    debits: HashMap<Account, U256>,
}

impl PoolBatch<'_> {
    /// Balance as seen by this batch.
    #[must_use]
    pub fn available(&self, account: Account) -> U256 {
        let staged = self.debits.get(&account).copied().unwrap_or_default();
        // staged never exceeds the committed balance
        self.ledger.balance(account).saturating_sub(staged)
    }

    /// Stage a debit. Returns the balance left for this account in the batch.
    ///
    /// # Errors
    /// Returns `InsufficientPool` if the batch-visible balance is below
    /// `amount`; nothing is staged.
    pub fn debit(&mut self, account: Account, amount: U256) -> Result<U256> {
        let available = self.available(account);
        if available < amount {
            return Err(MicropayError::InsufficientPool {
                account,
                needed: amount,
                available,
            });
        }
        let staged = self.debits.entry(account).or_default();
        *staged += amount;
        Ok(available - amount)
    }

    /// Aggregated debit per account.
    #[must_use]
    pub fn into_debits(self) -> HashMap<Account, U256> {
        self.debits
    }
}

//! Boundary to the external value ledger.
//!
//! The engine never moves value itself. Deposits pull value from a payer into
//! the engine's custody account with [`ValueStore::transfer_from`]; a settled
//! batch pays the collector out of custody with one
//! [`ValueStore::transfer_to`]. Any failure is reported as
//! [`MicropayError::TransferFailed`] and is fatal to the enclosing operation.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use micropay_types::{MicropayError, Result};

/// The fungible-value ledger the engine calls into.
pub trait ValueStore {
    /// Move `amount` from `holder` into `custodian`, authorized by a prior
    /// allowance from `holder` to `custodian`.
    fn transfer_from(&mut self, holder: Address, custodian: Address, amount: U256) -> Result<()>;

    /// Move `amount` out of `custodian` to `recipient`.
    fn transfer_to(&mut self, custodian: Address, recipient: Address, amount: U256) -> Result<()>;

    /// Current balance of `account`.
    fn balance_of(&self, account: Address) -> U256;
}

/// In-memory fungible token with balances and allowances.
///
/// An allowance of `U256::MAX` is unlimited and is never decremented.
#[derive(Debug, Default)]
pub struct InMemoryValueStore {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl InMemoryValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` out of thin air for `account`.
    pub fn mint(&mut self, account: Address, amount: U256) -> Result<()> {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.checked_add(amount).ok_or_else(|| MicropayError::TransferFailed {
            reason: format!("mint overflows balance of {account}"),
        })?;
        Ok(())
    }

    /// Let `spender` pull up to `amount` from `owner`.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Total value in circulation.
    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }

    fn move_value(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(MicropayError::TransferFailed {
                reason: format!("{from} holds {available}, needs {amount}"),
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| MicropayError::TransferFailed {
                reason: format!("transfer overflows balance of {to}"),
            })?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl ValueStore for InMemoryValueStore {
    fn transfer_from(&mut self, holder: Address, custodian: Address, amount: U256) -> Result<()> {
        let allowance = self.allowance(holder, custodian);
        if allowance < amount {
            return Err(MicropayError::TransferFailed {
                reason: format!("allowance {allowance} from {holder} below {amount}"),
            });
        }
        self.move_value(holder, custodian, amount)?;
        if allowance != U256::MAX {
            self.allowances
                .insert((holder, custodian), allowance - amount);
        }
        Ok(())
    }

    fn transfer_to(&mut self, custodian: Address, recipient: Address, amount: U256) -> Result<()> {
        self.move_value(custodian, recipient, amount)
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }
}

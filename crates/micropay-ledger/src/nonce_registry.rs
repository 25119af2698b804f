//! Nonce registry: prevents voucher replay.
//!
//! Like a blockchain nullifier set: once a voucher's nonce is consumed it is
//! never valid again, whoever signed it and whatever it pays. The set is
//! append-only and never shrinks. Storage layers persisting it must budget for
//! unbounded growth (one 32-byte entry per settled voucher).

use std::collections::HashSet;

use micropay_types::{MicropayError, Nonce, Result};

/// Append-only set of consumed voucher nonces.
#[derive(Debug, Default)]
pub struct NonceRegistry {
    used: HashSet<Nonce>,
}

impl NonceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
        }
    }

    /// Whether `nonce` has been consumed.
    pub fn is_used(&self, nonce: &Nonce) -> bool {
        self.used.contains(nonce)
    }

    /// Record `nonce` as consumed.
    ///
    /// # Errors
    /// Returns [`MicropayError::NonceAlreadyUsed`] if the nonce was already
    /// recorded. Callers are expected to have checked first.
    pub fn mark_used(&mut self, nonce: Nonce) -> Result<()> {
        if !self.used.insert(nonce) {
            return Err(MicropayError::NonceAlreadyUsed(nonce));
        }
        Ok(())
    }

    /// Open a staged view for one batch. Nothing is recorded until the
    /// staged nonces are passed to [`NonceRegistry::commit`].
    #[must_use]
    pub fn stage(&self) -> NonceBatch<'_> {
        NonceBatch {
            registry: self,
            pending: HashSet::new(),
            order: Vec::new(),
        }
    }

    /// Record every nonce of a staged batch, or none of them.
    ///
    /// # Errors
    /// Returns [`MicropayError::NonceAlreadyUsed`] for the first nonce that is
    /// already recorded or repeated in `nonces`; the registry is unchanged.
    pub fn commit(&mut self, nonces: Vec<Nonce>) -> Result<()> {
        let mut seen = HashSet::with_capacity(nonces.len());
        for nonce in &nonces {
            if self.used.contains(nonce) || !seen.insert(*nonce) {
                return Err(MicropayError::NonceAlreadyUsed(*nonce));
            }
        }
        let committed = nonces.len();
        self.used.extend(nonces);
        tracing::debug!(committed, total = self.used.len(), "Nonces committed");
        Ok(())
    }

    /// Number of nonces consumed so far.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// Nonces consumed by an in-flight batch, layered over the committed registry.
///
/// Checks see both committed nonces and nonces consumed earlier in the same
/// batch, so intra-batch duplicates are caught before anything commits.
#[derive(Debug)]
pub struct NonceBatch<'a> {
    registry: &'a NonceRegistry,
    pending: HashSet<Nonce>,
    order: Vec<Nonce>,
}

impl NonceBatch<'_> {
    /// Whether `nonce` is consumed, committed or staged.
    pub fn is_used(&self, nonce: &Nonce) -> bool {
        self.registry.is_used(nonce) || self.pending.contains(nonce)
    }

    /// Check-then-set within the batch.
    ///
    /// # Errors
    /// Returns [`MicropayError::NonceAlreadyUsed`] if the nonce is committed
    /// or was already consumed earlier in this batch.
    pub fn consume(&mut self, nonce: Nonce) -> Result<()> {
        if self.is_used(&nonce) {
            return Err(MicropayError::NonceAlreadyUsed(nonce));
        }
        self.pending.insert(nonce);
        self.order.push(nonce);
        Ok(())
    }

    /// Staged nonces in consumption order.
    #[must_use]
    pub fn into_consumed(self) -> Vec<Nonce> {
        self.order
    }
}

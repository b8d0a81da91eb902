//! Optimistic mutation state
//!
//! One cell per user-visible value. A mutation applies its optimistic
//! value immediately while keeping the prior one; confirmation swaps in
//! the authoritative value and failure restores the prior value
//! exactly. At most one mutation may be pending at a time, a second
//! `begin` is rejected rather than queued.

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone)]
pub struct OptimisticCell<T: Clone> {
    value: T,
    prior: Option<T>,
    state: MutationState,
}

impl<T: Clone> OptimisticCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            prior: None,
            state: MutationState::Idle,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == MutationState::Pending
    }

    /// Apply `optimistic` immediately, retaining the current value
    pub fn begin(&mut self, optimistic: T) -> Result<()> {
        if self.is_pending() {
            return Err(AdssimsimError::validation(
                "a mutation is already pending",
            ));
        }
        self.prior = Some(std::mem::replace(&mut self.value, optimistic));
        self.state = MutationState::Pending;
        Ok(())
    }

    /// Replace the optimistic value with the authoritative one
    pub fn commit(&mut self, authoritative: T) -> Result<()> {
        if !self.is_pending() {
            return Err(AdssimsimError::validation("no mutation to commit"));
        }
        self.value = authoritative;
        self.prior = None;
        self.state = MutationState::Committed;
        Ok(())
    }

    /// Restore the value held before `begin`, returning it
    pub fn rollback(&mut self) -> Result<T> {
        if !self.is_pending() {
            return Err(AdssimsimError::validation("no mutation to roll back"));
        }
        let prior = self
            .prior
            .take()
            .ok_or_else(|| AdssimsimError::validation("pending mutation lost its prior value"))?;
        self.value = prior.clone();
        self.state = MutationState::RolledBack;
        Ok(prior)
    }
}

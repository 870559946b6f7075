//! Observer persistence seam.
//!
//! The engine commits rule-state changes through a short transaction:
//! `begin` → `refresh` (re-read the observer to narrow the lost-update
//! window) → `set_rules` → `commit`, with `rollback` on any failure before
//! the commit. The discipline is optimistic, not serializable: two
//! concurrent calls for the same observer can still race, with a small,
//! bounded budget overrun as the worst case.

use mapwatch_core::{Observer, ObserverId, RuleConfig};

use crate::error::Result;

/// Read access plus transactional write access to observers.
pub trait ObserverStore: Send + Sync {
    /// Fetch an observer by id.
    fn get(&self, id: ObserverId) -> Result<Observer>;

    /// Open a write transaction.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;
}

/// One open write transaction against the observer store.
///
/// Dropping a transaction without committing discards its staged writes.
pub trait StoreTransaction {
    /// Re-read the observer's current stored record into `observer`.
    fn refresh(&mut self, observer: &mut Observer) -> Result<()>;

    /// Stage a replacement rule configuration for the observer.
    fn set_rules(&mut self, id: ObserverId, rules: RuleConfig) -> Result<()>;

    /// Apply all staged writes. On failure nothing is applied; the
    /// transaction is effectively rolled back.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all staged writes.
    fn rollback(self: Box<Self>) -> Result<()>;
}

//! Per-order async locks
//!
//! Status reconciliation for one order runs under its lock, so concurrent
//! webhook deliveries and client polls cannot interleave their
//! read-decide-write sequences.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct OrderLocks {
    /// order number -> lock
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `order_number`
    pub async fn lock(&self, order_number: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .inner
            .entry(order_number.to_owned())
            .or_default()
            .clone();
        mutex.lock_owned().await
    }

    /// Remove locks nobody holds or waits for; returns how many were dropped
    pub fn cleanup(&self) -> usize {
        let before = self.inner.len();
        // the map's own reference is the only one left for idle locks
        self.inner.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        before - self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

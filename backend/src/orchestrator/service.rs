//! Shared pool handle
//!
//! One writer at a time: every mutation holds the write lock for its whole
//! duration, queries hold the read lock and never see a half-applied write.

use crate::ledger::PaymentAsset;
use crate::orchestrator::engine::PoolEngine;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable, thread-safe handle to a [`PoolEngine`]
///
/// # Example
/// ```
/// use riskpool_core_rs::{InMemoryAsset, PoolConfig, PoolEngine, SharedPool};
///
/// let mut asset = InMemoryAsset::new();
/// asset.mint("ALICE", 500);
/// let pool = SharedPool::new(PoolEngine::new(PoolConfig::default(), asset).unwrap());
///
/// let handle = pool.clone();
/// std::thread::spawn(move || handle.write(|engine| engine.deposit("ALICE", 500, 1)))
///     .join()
///     .unwrap()
///     .unwrap();
///
/// assert_eq!(pool.read(|engine| engine.available_balance("ALICE")), 500);
/// ```
pub struct SharedPool<A> {
    inner: Arc<RwLock<PoolEngine<A>>>,
}

impl<A> Clone for SharedPool<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: PaymentAsset> SharedPool<A> {
    pub fn new(engine: PoolEngine<A>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Run a mutating operation under the write lock
    pub fn write<T>(&self, op: impl FnOnce(&mut PoolEngine<A>) -> T) -> T {
        let mut engine = self.inner.write();
        op(&mut engine)
    }

    /// Run a query under the read lock
    pub fn read<T>(&self, query: impl FnOnce(&PoolEngine<A>) -> T) -> T {
        let engine = self.inner.read();
        query(&engine)
    }
}

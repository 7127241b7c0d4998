//! Cluster-wide named mutex guarding sweeper cycles.
//!
//! Only one process instance may run a sweep at a time. The sweeper asks for
//! the lock without waiting: a busy lock means another instance is sweeping
//! and this cycle is skipped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::DraftError;

/// A held cluster lock. Must be released explicitly; dropping it also
/// releases, but without reporting errors.
#[async_trait]
pub trait ClusterLease: Send + fmt::Debug {
    /// Releases the lock.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the backing store fails to release.
    async fn release(self: Box<Self>) -> Result<(), DraftError>;
}

/// Try-acquire mutual exclusion scoped by a well-known name.
#[async_trait]
pub trait ClusterMutex: Send + Sync + fmt::Debug {
    /// Attempts to take the named lock without waiting.
    ///
    /// Returns `Ok(None)` if another holder has it.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the backing store is unreachable.
    async fn try_acquire(&self, name: &str) -> Result<Option<Box<dyn ClusterLease>>, DraftError>;
}

/// In-process named locks, for single-node runs and tests.
#[derive(Debug, Default)]
pub struct MemoryClusterMutex {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryClusterMutex {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
struct MemoryLease {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl ClusterLease for MemoryLease {
    async fn release(self: Box<Self>) -> Result<(), DraftError> {
        Ok(())
    }
}

#[async_trait]
impl ClusterMutex for MemoryClusterMutex {
    async fn try_acquire(&self, name: &str) -> Result<Option<Box<dyn ClusterLease>>, DraftError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(name.to_string()).or_default())
        };
        Ok(lock
            .try_lock_owned()
            .ok()
            .map(|guard| Box::new(MemoryLease { _guard: guard }) as Box<dyn ClusterLease>))
    }
}

/// Postgres transaction-scoped advisory lock.
///
/// The lease owns the transaction that took `pg_try_advisory_xact_lock`, so
/// the lock is released on commit, on rollback, and when a dropped lease's
/// connection rolls back.
#[derive(Debug, Clone)]
pub struct PgClusterMutex {
    pool: PgPool,
}

impl PgClusterMutex {
    /// Creates a mutex backed by the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct PgLease {
    tx: Transaction<'static, Postgres>,
    key: i64,
}

impl fmt::Debug for PgLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgLease")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClusterLease for PgLease {
    async fn release(self: Box<Self>) -> Result<(), DraftError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterMutex for PgClusterMutex {
    async fn try_acquire(&self, name: &str) -> Result<Option<Box<dyn ClusterLease>>, DraftError> {
        let key = advisory_key(name);
        let mut tx = self.pool.begin().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(key)
            .fetch_one(&mut *tx)
            .await?;
        if !acquired {
            tx.rollback().await?;
            return Ok(None);
        }
        Ok(Some(Box::new(PgLease { tx, key })))
    }
}

/// Maps a lock name to a stable 64-bit advisory key (FNV-1a).
///
/// Every instance must derive the same key from the same name, so this does
/// not use the randomly seeded std hasher.
#[must_use]
pub fn advisory_key(name: &str) -> i64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let hash = name
        .bytes()
        .fold(OFFSET, |acc, byte| (acc ^ u64::from(byte)).wrapping_mul(PRIME));
    i64::from_ne_bytes(hash.to_ne_bytes())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_is_busy_until_release() {
        let mutex = MemoryClusterMutex::new();
        let Ok(Some(lease)) = mutex.try_acquire("sweeper").await else {
            panic!("first acquire must succeed");
        };
        let Ok(busy) = mutex.try_acquire("sweeper").await else {
            panic!("acquire must not error");
        };
        assert!(busy.is_none());

        let Ok(()) = lease.release().await else {
            panic!("release failed");
        };
        let Ok(again) = mutex.try_acquire("sweeper").await else {
            panic!("acquire must not error");
        };
        assert!(again.is_some());
    }

    #[tokio::test]
    async fn names_are_independent() {
        let mutex = MemoryClusterMutex::new();
        let Ok(Some(_a)) = mutex.try_acquire("a").await else {
            panic!("a must be free");
        };
        let Ok(Some(_b)) = mutex.try_acquire("b").await else {
            panic!("b must be free");
        };
    }

    #[test]
    fn advisory_key_is_stable() {
        assert_eq!(advisory_key("draft-sweeper"), advisory_key("draft-sweeper"));
        assert_ne!(advisory_key("draft-sweeper"), advisory_key("draft-sweeper-2"));
    }
}

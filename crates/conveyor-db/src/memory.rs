//! In-memory driver with real transaction semantics.
//!
//! Deterministic stand-in for a networked store: the base session applies
//! writes directly, transactional sessions buffer writes until commit.
//! Terminal actions are counted so tests and diagnostics can assert
//! exactly-once semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::driver::Driver;
use crate::driver::DriverError;

/// Counts of transaction actions applied through a [`MemoryDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnCounters {
    /// Transactions opened.
    pub begins: u64,
    /// Transactions committed.
    pub commits: u64,
    /// Transactions rolled back.
    pub rollbacks: u64,
}

#[derive(Default)]
struct Shared {
    data: Mutex<HashMap<String, String>>,
    begins: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

enum WriteOp {
    Set { key: String, value: String },
    Delete { key: String },
}

struct TxnState {
    writes: Mutex<Vec<WriteOp>>,
    active: AtomicBool,
}

/// Session handle produced by [`MemoryDriver`].
///
/// Base sessions (`txn` absent) write straight to the shared map.
/// Transactional sessions buffer writes; reads through them observe the
/// session's own uncommitted writes first.
#[derive(Clone)]
pub struct MemorySession {
    shared: Arc<Shared>,
    txn: Option<Arc<TxnState>>,
}

impl MemorySession {
    /// Whether this session is bound to an open transaction.
    pub fn in_transaction(&self) -> bool {
        match &self.txn {
            Some(txn) => txn.active.load(Ordering::SeqCst),
            None => false,
        }
    }

    /// Read a key, observing this session's uncommitted writes.
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(txn) = &self.txn {
            let writes = txn.writes.lock().await;
            // Last buffered write for the key wins.
            for op in writes.iter().rev() {
                match op {
                    WriteOp::Set { key: k, value } if k == key => return Some(value.clone()),
                    WriteOp::Delete { key: k } if k == key => return None,
                    _ => {}
                }
            }
        }
        self.shared.data.lock().await.get(key).cloned()
    }

    /// Write a key through this session.
    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), DriverError> {
        let key = key.into();
        let value = value.into();
        match &self.txn {
            Some(txn) => {
                if !txn.active.load(Ordering::SeqCst) {
                    return Err(DriverError::TransactionClosed);
                }
                txn.writes.lock().await.push(WriteOp::Set { key, value });
            }
            None => {
                self.shared.data.lock().await.insert(key, value);
            }
        }
        Ok(())
    }

    /// Delete a key through this session.
    pub async fn delete(&self, key: impl Into<String>) -> Result<(), DriverError> {
        let key = key.into();
        match &self.txn {
            Some(txn) => {
                if !txn.active.load(Ordering::SeqCst) {
                    return Err(DriverError::TransactionClosed);
                }
                txn.writes.lock().await.push(WriteOp::Delete { key });
            }
            None => {
                self.shared.data.lock().await.remove(&key);
            }
        }
        Ok(())
    }
}

/// In-memory [`Driver`] with buffered transactions.
#[derive(Default)]
pub struct MemoryDriver {
    shared: Arc<Shared>,
}

impl MemoryDriver {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the begin/commit/rollback counters.
    pub fn counters(&self) -> TxnCounters {
        TxnCounters {
            begins: self.shared.begins.load(Ordering::SeqCst),
            commits: self.shared.commits.load(Ordering::SeqCst),
            rollbacks: self.shared.rollbacks.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Session = MemorySession;

    fn base_session(&self) -> MemorySession {
        MemorySession {
            shared: Arc::clone(&self.shared),
            txn: None,
        }
    }

    async fn begin(&self) -> Result<MemorySession, DriverError> {
        self.shared.begins.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            shared: Arc::clone(&self.shared),
            txn: Some(Arc::new(TxnState {
                writes: Mutex::new(Vec::new()),
                active: AtomicBool::new(true),
            })),
        })
    }

    async fn commit(&self, session: &MemorySession) -> Result<(), DriverError> {
        let txn = session.txn.as_ref().ok_or(DriverError::TransactionClosed)?;
        if !txn.active.swap(false, Ordering::SeqCst) {
            return Err(DriverError::TransactionClosed);
        }

        let mut writes = txn.writes.lock().await;
        let mut data = self.shared.data.lock().await;
        for op in writes.drain(..) {
            match op {
                WriteOp::Set { key, value } => {
                    data.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, session: &MemorySession) -> Result<(), DriverError> {
        let txn = session.txn.as_ref().ok_or(DriverError::TransactionClosed)?;
        if !txn.active.swap(false, Ordering::SeqCst) {
            return Err(DriverError::TransactionClosed);
        }

        txn.writes.lock().await.clear();
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

use crate::store::traits::{AttributeStore, StoreError, StoreItem};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Store that keeps every `batch_put` call in memory.
///
/// Stands in for the remote store in tests; can be switched into a failing
/// mode to exercise the drop path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    calls: Mutex<Vec<Vec<StoreItem>>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Items of each successful `batch_put`, in call order
    pub fn calls(&self) -> Vec<Vec<StoreItem>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every `batch_put` call, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn items(&self) -> Vec<StoreItem> {
        self.calls().into_iter().flatten().collect()
    }
}

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn ensure_domain(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Generic("domain unavailable".to_string()));
        }
        Ok(())
    }

    async fn batch_put(&self, items: Vec<StoreItem>) -> Result<(), StoreError> {
        let failing = self.failing.load(Ordering::SeqCst);
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if failing {
            return Err(StoreError::Rejected {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(items);
        Ok(())
    }
}

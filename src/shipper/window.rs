use chrono::Utc;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("granularity must be greater than 0, got {0}ms")]
    InvalidGranularity(u64),
}

/// Source of the current wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by_ms: i64) {
        self.now.fetch_add(by_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Length of a batching window.
///
/// Every record created inside the same `[expiry - G, expiry)` interval is
/// stamped with the same expiry, so the whole window is released at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Granularity(NonZeroU64);

impl Granularity {
    pub fn from_millis(millis: u64) -> Result<Self, WindowError> {
        NonZeroU64::new(millis)
            .map(Self)
            .ok_or(WindowError::InvalidGranularity(millis))
    }

    pub fn as_millis(&self) -> u64 {
        self.0.get()
    }

    /// Smallest multiple of the granularity strictly greater than `now_ms`.
    ///
    /// Saturates at `i64::MAX` when that multiple is not representable,
    /// which only happens for granularities in the hundreds of millions of
    /// years.
    pub fn next_expiry(&self, now_ms: i64) -> i64 {
        let g = i128::from(self.0.get());
        let expiry = (i128::from(now_ms).div_euclid(g) + 1) * g;
        i64::try_from(expiry).unwrap_or(i64::MAX)
    }
}

pub fn next_expiry(now_ms: i64, granularity_ms: u64) -> Result<i64, WindowError> {
    Ok(Granularity::from_millis(granularity_ms)?.next_expiry(now_ms))
}

/// Anything released from a [`DelayQueue`](super::delay_queue::DelayQueue)
/// once its window closes. Ordering is by expiry alone.
pub trait Delayed {
    fn expires_at_ms(&self) -> i64;

    /// Remaining delay; zero or negative once the window has closed
    fn delay_ms(&self, now_ms: i64) -> i64 {
        self.expires_at_ms() - now_ms
    }
}

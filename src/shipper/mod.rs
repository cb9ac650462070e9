pub mod batcher;
pub mod consumer;
pub mod delay_queue;
pub mod record;
pub mod shutdown;
pub mod window;
pub mod writer;

pub use record::{LogEvent, LogLevel, LogRecord};
pub use shutdown::ShutdownReport;
pub use writer::WriteStatsSnapshot;

use crate::config::types::Config;
use crate::store::traits::{AttributeStore, StoreError};
use consumer::Consumer;
use delay_queue::DelayQueue;
use shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;
use window::{Clock, Granularity, SystemClock, WindowError};
use writer::{AttributeWriter, TimeZoneError};

#[derive(Debug, Error)]
pub enum ShipperError {
    #[error("window error: {0}")]
    Window(#[from] WindowError),

    #[error("time zone error: {0}")]
    TimeZone(#[from] TimeZoneError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Cheap, cloneable producer side of a running shipper.
///
/// `enqueue` only stamps the event with its window and pushes it onto the
/// queue, so it is safe to call from logging hot paths and from any thread.
#[derive(Clone)]
pub struct ShipperHandle {
    queue: Arc<DelayQueue<LogRecord>>,
    granularity: Granularity,
    clock: Arc<dyn Clock>,
    origin: Option<String>,
    context: Option<String>,
}

impl ShipperHandle {
    /// Queue one event for the window that is open right now.
    ///
    /// A configured origin fills in events that carry none; a configured
    /// context replaces whatever the event carries.
    pub fn enqueue(&self, mut event: LogEvent) {
        if event.origin.is_none() {
            event.origin = self.origin.clone();
        }
        if self.context.is_some() {
            event.context = self.context.clone();
        }
        let record = LogRecord::windowed(event, self.granularity, self.clock.as_ref());
        self.queue.add(record);
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Records waiting for their window to close
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

/// A running shipper: the queue, its consumer task, and the writer behind it.
pub struct Shipper {
    handle: ShipperHandle,
    writer: Arc<AttributeWriter>,
    coordinator: ShutdownCoordinator,
}

impl Shipper {
    pub async fn start(config: &Config, store: Arc<dyn AttributeStore>) -> Result<Self, ShipperError> {
        Self::start_with_clock(config, store, Arc::new(SystemClock)).await
    }

    /// Check the destination, then spawn the consumer.
    ///
    /// Nothing is spawned when any step fails.
    pub async fn start_with_clock(
        config: &Config,
        store: Arc<dyn AttributeStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ShipperError> {
        let granularity = Granularity::from_millis(config.batching.granularity_ms)?;
        let time_zone = config.time_zone_setting()?;

        store.ensure_domain().await?;

        let queue = Arc::new(DelayQueue::new(clock.clone()));
        let writer = Arc::new(AttributeWriter::new(store).with_time_zone(time_zone));
        let cancel = CancellationToken::new();

        let consumer = Consumer::new(queue.clone(), writer.clone(), cancel.clone()).spawn();
        let coordinator = ShutdownCoordinator::new(
            queue.clone(),
            writer.clone(),
            cancel,
            consumer,
            Duration::from_millis(config.batching.shutdown_timeout_ms),
        );

        info!(
            domain = %config.destination.domain,
            granularity_ms = granularity.as_millis(),
            "Log shipper started"
        );

        Ok(Self {
            handle: ShipperHandle {
                queue,
                granularity,
                clock,
                origin: config.origin.clone(),
                context: config.context.clone(),
            },
            writer,
            coordinator,
        })
    }

    pub fn handle(&self) -> ShipperHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> WriteStatsSnapshot {
        self.writer.stats()
    }

    /// Stop the consumer and flush everything still queued
    pub async fn shutdown(self) -> ShutdownReport {
        let report = self.coordinator.run().await;
        let stats = self.writer.stats();
        info!(
            drained = report.drained,
            abandoned = report.abandoned,
            items_written = stats.items_written,
            items_dropped = stats.items_dropped,
            "Log shipper stopped"
        );
        report
    }
}

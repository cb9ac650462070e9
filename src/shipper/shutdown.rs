use crate::shipper::delay_queue::DelayQueue;
use crate::shipper::record::LogRecord;
use crate::shipper::writer::AttributeWriter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Outcome of the final drain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Records force-drained and handed to the writer
    pub drained: usize,

    /// True when the consumer could not be confirmed stopped and the drain
    /// was skipped
    pub abandoned: bool,
}

/// Stops the consumer and flushes whatever it left behind.
///
/// The consumer is cancelled and joined before the queue is touched, so the
/// two drain paths never overlap. The drain ignores record delays: at
/// shutdown waiting for windows to close would hold up process exit.
pub struct ShutdownCoordinator {
    queue: Arc<DelayQueue<LogRecord>>,
    writer: Arc<AttributeWriter>,
    cancel: CancellationToken,
    consumer: JoinHandle<()>,
    join_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(
        queue: Arc<DelayQueue<LogRecord>>,
        writer: Arc<AttributeWriter>,
        cancel: CancellationToken,
        consumer: JoinHandle<()>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            writer,
            cancel,
            consumer,
            join_timeout,
        }
    }

    /// Runs once; consuming `self` makes a second run impossible
    pub async fn run(self) -> ShutdownReport {
        self.cancel.cancel();

        match tokio::time::timeout(self.join_timeout, self.consumer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_panic() => {
                // A panicked task is gone for good, draining cannot race it
                error!(error = %e, "Log consumer panicked");
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Log consumer was aborted");
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    queued = self.queue.len(),
                    "Log consumer did not stop in time, skipping final drain"
                );
                return ShutdownReport {
                    drained: 0,
                    abandoned: true,
                };
            }
        }

        let mut records = Vec::with_capacity(self.queue.len());
        while !self.queue.is_empty() {
            match self.queue.force_pop() {
                Some(record) => records.push(record),
                None => break,
            }
        }

        let drained = records.len();
        info!(count = drained, "Flushing queued records on shutdown");
        self.writer.write_batch(&records).await;

        ShutdownReport {
            drained,
            abandoned: false,
        }
    }
}

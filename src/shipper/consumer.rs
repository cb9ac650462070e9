use crate::shipper::delay_queue::{DelayQueue, QueueError};
use crate::shipper::record::LogRecord;
use crate::shipper::writer::AttributeWriter;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Background loop moving closed windows from the queue to the writer.
///
/// Each pass blocks on [`DelayQueue::take`], gathers everything else that is
/// already releasable into the same batch, and hands the batch to the
/// writer. The loop ends only when the cancellation token fires; whatever is
/// still queued at that point belongs to the shutdown drain.
pub struct Consumer {
    queue: Arc<DelayQueue<LogRecord>>,
    writer: Arc<AttributeWriter>,
    cancel: CancellationToken,
}

impl Consumer {
    pub fn new(
        queue: Arc<DelayQueue<LogRecord>>,
        writer: Arc<AttributeWriter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            writer,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        info!("Log consumer started");

        loop {
            let first = match self.queue.take(&self.cancel).await {
                Ok(record) => record,
                Err(QueueError::Interrupted) => {
                    info!(queued = self.queue.len(), "Log consumer stopped");
                    return;
                }
            };

            let mut batch = vec![first];
            self.queue.drain_available(&mut batch);

            debug!(count = batch.len(), "Writing closed window");
            self.writer.write_batch(&batch).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipper::record::LogEvent;
    use crate::shipper::window::{Clock, ManualClock, SystemClock};
    use crate::store::memory::MemoryStore;
    use std::time::Duration;

    fn setup(clock: Arc<dyn Clock>) -> (Arc<DelayQueue<LogRecord>>, Arc<MemoryStore>, Arc<AttributeWriter>) {
        let queue = Arc::new(DelayQueue::new(clock));
        let store = Arc::new(MemoryStore::new());
        let writer = Arc::new(AttributeWriter::new(store.clone()));
        (queue, store, writer)
    }

    fn record(message: &str, expires_at_ms: i64) -> LogRecord {
        LogRecord::new(LogEvent::new(message, "INFO", 0), expires_at_ms)
    }

    #[tokio::test]
    async fn test_interrupted_before_first_take_writes_nothing() {
        let (queue, store, writer) = setup(Arc::new(ManualClock::new(1000)));
        queue.add(record("ready", 0));

        let cancel = CancellationToken::new();
        cancel.cancel();
        Consumer::new(queue.clone(), writer, cancel).run().await;

        assert_eq!(store.attempts(), 0);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_window_written_as_one_batch() {
        let (queue, store, writer) = setup(Arc::new(ManualClock::new(1000)));
        for i in 0..5 {
            queue.add(record(&format!("m{i}"), 1000));
        }
        // still open, must stay queued
        queue.add(record("later", 5000));

        let cancel = CancellationToken::new();
        let handle = Consumer::new(queue.clone(), writer, cancel.clone()).spawn();

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.call_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("consumer never wrote");

        cancel.cancel();
        handle.await.unwrap();

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 5);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_keeps_running_after_store_failure() {
        let clock = Arc::new(SystemClock);
        let (queue, store, writer) = setup(clock.clone());
        store.set_failing(true);
        queue.add(record("lost", clock.now_ms()));

        let cancel = CancellationToken::new();
        let handle = Consumer::new(queue.clone(), writer.clone(), cancel.clone()).spawn();

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.attempts() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first write never attempted");

        store.set_failing(false);
        queue.add(record("kept", clock.now_ms()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.call_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("consumer stopped after a failed write");

        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(store.items()[0].get("msg"), Some("kept"));
        assert_eq!(writer.stats().items_dropped, 1);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_stops_loop() {
        let clock = Arc::new(SystemClock);
        let (queue, store, writer) = setup(clock.clone());
        queue.add(record("next hour", clock.now_ms() + 3_600_000));

        let cancel = CancellationToken::new();
        let handle = Consumer::new(queue.clone(), writer, cancel.clone()).spawn();

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("consumer ignored cancellation")
            .unwrap();
        assert_eq!(store.attempts(), 0);
        assert_eq!(queue.len(), 1);
    }
}

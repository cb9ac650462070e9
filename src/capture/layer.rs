use crate::shipper::{LogEvent, LogLevel, ShipperHandle};
use std::collections::BTreeMap;
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Targets whose events are never shipped. The shipper's own logs and the
/// HTTP stack it writes through would otherwise feed back into the queue.
pub const DEFAULT_IGNORED_TARGETS: &[&str] = &["logship", "hyper", "reqwest", "h2", "rustls"];

/// `tracing` layer that enqueues every event on a [`ShipperHandle`].
///
/// The `message` field becomes the record message and every other field is
/// kept as metadata. The event target is used as the logger name and its
/// module path as the context.
pub struct ShipperLayer {
    handle: ShipperHandle,
    ignored_targets: Vec<String>,
}

impl ShipperLayer {
    pub fn new(handle: ShipperHandle) -> Self {
        Self {
            handle,
            ignored_targets: DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Also drop events from `target` and everything below it
    pub fn with_ignored_target(mut self, target: impl Into<String>) -> Self {
        self.ignored_targets.push(target.into());
        self
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|ignored| {
            target == ignored
                || target
                    .strip_prefix(ignored.as_str())
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }
}

impl<S> Layer<S> for ShipperLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if self.is_ignored(metadata.target()) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let level = LogLevel::from(metadata.level());
        let mut log_event = LogEvent::new(
            visitor.message.unwrap_or_default(),
            level.as_str(),
            self.handle.now_ms(),
        )
        .with_logger(metadata.target());
        if let Some(module_path) = metadata.module_path() {
            log_event = log_event.with_context(module_path);
        }
        log_event.metadata = visitor.fields;

        self.handle.enqueue(log_event);
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Config;
    use crate::shipper::window::ManualClock;
    use crate::shipper::Shipper;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    async fn start() -> (Shipper, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let shipper = Shipper::start_with_clock(
            &Config::default(),
            store.clone(),
            Arc::new(ManualClock::new(1500000000000)),
        )
        .await
        .unwrap();
        (shipper, store)
    }

    #[tokio::test]
    async fn test_event_fields_become_attributes() {
        let (shipper, store) = start().await;
        let subscriber = tracing_subscriber::registry().with(ShipperLayer::new(shipper.handle()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "app::db", user = "bob", attempt = 3, "connect failed after {} tries", 3);
        });

        shipper.shutdown().await;
        let items = store.items();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.get("msg"), Some("connect failed after 3 tries"));
        assert_eq!(item.get("level"), Some("WARN"));
        assert_eq!(item.get("logger"), Some("app::db"));
        assert_eq!(item.get("user"), Some("bob"));
        assert_eq!(item.get("attempt"), Some("3"));
        assert!(item.get("context").is_some());
    }

    #[tokio::test]
    async fn test_own_and_ignored_targets_are_skipped() {
        let (shipper, store) = start().await;
        let handle = shipper.handle();
        let layer = ShipperLayer::new(handle.clone()).with_ignored_target("noisy");
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "logship::shipper", "internal");
            tracing::info!(target: "hyper::client", "transport");
            tracing::info!(target: "noisy::inner", "chatter");
            tracing::info!(target: "noisyneighbor", "kept");
        });

        assert_eq!(handle.queued(), 1);
        shipper.shutdown().await;
        assert_eq!(store.items()[0].get("msg"), Some("kept"));
    }
}

use crate::shipper::batcher::Batcher;
use crate::shipper::record::LogRecord;
use crate::store::traits::{Attribute, AttributeStore, StoreItem};
use chrono::{Local, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Largest attribute name or value the store accepts, in UTF-8 bytes
pub const MAX_ATTR_SIZE_BYTES: usize = 1024;

/// Most items the store accepts in one batch put
pub const MAX_BATCH_PUT: usize = 25;

const TRUNCATE_STEP_CHARS: usize = 16;

pub const HOST_ATTR: &str = "host";
pub const CONTEXT_ATTR: &str = "context";
pub const LOGGER_ATTR: &str = "logger";
pub const MESSAGE_ATTR: &str = "msg";
pub const LEVEL_ATTR: &str = "level";
pub const TIME_ATTR: &str = "time";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown time zone '{0}'")]
pub struct TimeZoneError(pub String);

/// Zone used to render the `time` attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeZoneSetting {
    #[default]
    System,
    Zone(Tz),
}

impl FromStr for TimeZoneSetting {
    type Err = TimeZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("system") || s.eq_ignore_ascii_case("local") {
            return Ok(Self::System);
        }
        s.parse::<Tz>()
            .map(Self::Zone)
            .map_err(|_| TimeZoneError(s.to_string()))
    }
}

impl TimeZoneSetting {
    /// ISO-8601 with millisecond precision; `Z` suffix when the offset is zero
    pub fn format_millis(&self, timestamp_ms: i64) -> String {
        let Some(utc) = Utc.timestamp_millis_opt(timestamp_ms).single() else {
            return timestamp_ms.to_string();
        };

        let zoned = match self {
            Self::System => utc.with_timezone(&Local).fixed_offset(),
            Self::Zone(tz) => utc.with_timezone(tz).fixed_offset(),
        };

        zoned.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Shorten `value` until it fits in [`MAX_ATTR_SIZE_BYTES`].
///
/// UTF-8 is variable width, so instead of computing an exact cut this starts
/// at 1024 characters (or 16 below the length for shorter, multi-byte
/// strings) and backs off 16 characters at a time. Cuts always land on a
/// character boundary.
pub fn truncate_to_size(value: &str) -> &str {
    if value.len() <= MAX_ATTR_SIZE_BYTES {
        return value;
    }

    let char_count = value.chars().count();
    let mut next = if MAX_ATTR_SIZE_BYTES >= char_count {
        char_count.saturating_sub(TRUNCATE_STEP_CHARS)
    } else {
        MAX_ATTR_SIZE_BYTES
    };

    loop {
        let cut = char_prefix(value, next);
        if cut.len() <= MAX_ATTR_SIZE_BYTES {
            return cut;
        }
        next = next.saturating_sub(TRUNCATE_STEP_CHARS);
    }
}

fn char_prefix(value: &str, chars: usize) -> &str {
    match value.char_indices().nth(chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[derive(Debug, Default)]
struct WriteStats {
    items_written: AtomicU64,
    items_dropped: AtomicU64,
    failed_calls: AtomicU64,
}

/// Counters of what the writer sent and what it had to drop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStatsSnapshot {
    pub items_written: u64,
    pub items_dropped: u64,
    pub failed_calls: u64,
}

/// Turns records into store items and puts them in chunks of
/// [`MAX_BATCH_PUT`].
///
/// Writes are best effort: a failed put is logged, counted and dropped. It
/// is never retried, re-queued or returned to the caller.
pub struct AttributeWriter {
    store: Arc<dyn AttributeStore>,
    time_zone: TimeZoneSetting,
    stats: WriteStats,
}

impl AttributeWriter {
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self {
            store,
            time_zone: TimeZoneSetting::System,
            stats: WriteStats::default(),
        }
    }

    pub fn with_time_zone(mut self, time_zone: TimeZoneSetting) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn time_zone(&self) -> TimeZoneSetting {
        self.time_zone
    }

    pub fn stats(&self) -> WriteStatsSnapshot {
        WriteStatsSnapshot {
            items_written: self.stats.items_written.load(Ordering::Relaxed),
            items_dropped: self.stats.items_dropped.load(Ordering::Relaxed),
            failed_calls: self.stats.failed_calls.load(Ordering::Relaxed),
        }
    }

    /// Build the store item for one record under a fresh random key.
    ///
    /// Metadata keys that collide with the fixed attribute names are written
    /// as extra attributes; what the store makes of that is up to the store.
    pub fn to_item(&self, record: &LogRecord) -> StoreItem {
        let mut attributes = Vec::with_capacity(6 + record.metadata().len());

        push_attr(&mut attributes, HOST_ATTR, record.origin());
        push_attr(&mut attributes, CONTEXT_ATTR, record.context());
        push_attr(&mut attributes, LOGGER_ATTR, record.logger());
        push_attr(&mut attributes, MESSAGE_ATTR, Some(record.message()));
        push_attr(&mut attributes, LEVEL_ATTR, Some(record.level()));
        let time = self.time_zone.format_millis(record.timestamp_ms());
        push_attr(&mut attributes, TIME_ATTR, Some(time.as_str()));

        for (key, value) in record.metadata() {
            push_attr(&mut attributes, key, Some(value.as_str()));
        }

        // The store has no auto-increment key
        StoreItem {
            name: Uuid::new_v4().to_string(),
            attributes,
        }
    }

    /// Put `records` to the store, one call per chunk, in order
    pub async fn write_batch(&self, records: &[LogRecord]) {
        if records.is_empty() {
            return;
        }

        let batcher = match Batcher::new(records, MAX_BATCH_PUT) {
            Ok(batcher) => batcher,
            Err(e) => {
                error!(error = %e, "Cannot chunk records for the store");
                return;
            }
        };

        for chunk in batcher {
            let items: Vec<StoreItem> = chunk.iter().map(|record| self.to_item(record)).collect();
            let count = items.len() as u64;

            match self.store.batch_put(items).await {
                Ok(()) => {
                    self.stats.items_written.fetch_add(count, Ordering::Relaxed);
                    debug!(count = count, "Wrote batch to store");
                }
                Err(e) => {
                    self.stats.items_dropped.fetch_add(count, Ordering::Relaxed);
                    self.stats.failed_calls.fetch_add(1, Ordering::Relaxed);
                    warn!(count = count, error = %e, "Store write failed, dropping batch");
                }
            }
        }
    }
}

fn push_attr(attributes: &mut Vec<Attribute>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        attributes.push(Attribute::new(
            truncate_to_size(name),
            truncate_to_size(value),
        ));
    }
}

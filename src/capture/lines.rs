use crate::shipper::{LogEvent, LogLevel, ShipperHandle};
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use std::io;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::debug;

/// Splits a byte stream into lines.
///
/// A line ends at `\r` or `\n`, so `\r\n` yields one line and an empty one
/// that is dropped. Empty lines are never emitted. Bytes that are not valid
/// UTF-8 are replaced rather than rejected.
#[derive(Debug, Default)]
pub struct LineDecoder {
    // Bytes of `src` already searched for a terminator
    next_index: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_terminator(b: &u8) -> bool {
    *b == b'\n' || *b == b'\r'
}

impl Decoder for LineDecoder {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let offset = match src[self.next_index..].iter().position(is_terminator) {
                Some(offset) => offset,
                None => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            };

            let line = src.split_to(self.next_index + offset);
            src.advance(1);
            self.next_index = 0;

            if !line.is_empty() {
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(String::from_utf8_lossy(&rest).into_owned()))
    }
}

/// Enqueue every line of `reader` at `level` until EOF.
///
/// Returns the number of lines shipped. Each line is stamped with the
/// handle's clock when it is read.
pub async fn ship_lines<R>(
    reader: R,
    level: LogLevel,
    logger: Option<String>,
    handle: &ShipperHandle,
) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, LineDecoder::new());
    let mut shipped = 0;

    while let Some(line) = lines.next().await {
        let mut event = LogEvent::new(line?, level.as_str(), handle.now_ms());
        if let Some(logger) = &logger {
            event = event.with_logger(logger.clone());
        }
        handle.enqueue(event);
        shipped += 1;
    }

    debug!(shipped, level = %level, "Input stream ended");
    Ok(shipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Config;
    use crate::shipper::window::ManualClock;
    use crate::shipper::Shipper;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    fn decode_all(input: &[u8]) -> Vec<String> {
        let mut decoder = LineDecoder::new();
        let mut buf = BytesMut::from(input);
        let mut lines = Vec::new();
        while let Some(line) = decoder.decode(&mut buf).unwrap() {
            lines.push(line);
        }
        while let Some(line) = decoder.decode_eof(&mut buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_mixed_terminators_and_empty_lines() {
        let lines = decode_all(b"one\r\ntwo\n\n\rthree\rfour");
        assert_eq!(lines, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_only_terminators_yield_nothing() {
        assert!(decode_all(b"\n\r\n\r").is_empty());
        assert!(decode_all(b"").is_empty());
    }

    #[test]
    fn test_partial_line_waits_for_more_input() {
        let mut decoder = LineDecoder::new();
        let mut buf = BytesMut::from(&b"hel"[..]);
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"lo\nworld");
        assert_eq!(decoder.decode(&mut buf).unwrap(), Some("hello".to_string()));
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert_eq!(decoder.decode_eof(&mut buf).unwrap(), Some("world".to_string()));
        assert_eq!(decoder.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let lines = decode_all(b"ok\xff\n");
        assert_eq!(lines, vec!["ok\u{fffd}"]);
    }

    #[tokio::test]
    async fn test_ship_lines_enqueues_each_line() {
        let store = Arc::new(MemoryStore::new());
        let shipper = Shipper::start_with_clock(
            &Config::default(),
            store.clone(),
            Arc::new(ManualClock::new(0)),
        )
        .await
        .unwrap();
        let handle = shipper.handle();

        let input: &[u8] = b"first\nsecond\n\nthird";
        let shipped = ship_lines(input, LogLevel::Error, Some("cron".to_string()), &handle)
            .await
            .unwrap();
        assert_eq!(shipped, 3);
        assert_eq!(handle.queued(), 3);

        shipper.shutdown().await;
        let items = store.items();
        let mut messages: Vec<&str> = items.iter().filter_map(|i| i.get("msg")).collect();
        messages.sort();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert!(items.iter().all(|i| i.get("level") == Some("ERROR")));
        assert!(items.iter().all(|i| i.get("logger") == Some("cron")));
    }
}

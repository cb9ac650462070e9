use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatcherError {
    #[error("batch size must be greater than 0")]
    InvalidBatchSize,
}

/// Walks a slice in fixed-size chunks without copying it.
///
/// The slice is borrowed for the batcher's lifetime, so the source cannot be
/// mutated while batches are being handed out.
#[derive(Debug)]
pub struct Batcher<'a, T> {
    items: &'a [T],
    batch_size: usize,
    idx: usize,
}

impl<'a, T> Batcher<'a, T> {
    pub fn new(items: &'a [T], batch_size: usize) -> Result<Self, BatcherError> {
        if batch_size < 1 {
            return Err(BatcherError::InvalidBatchSize);
        }

        Ok(Self {
            items,
            batch_size,
            idx: 0,
        })
    }

    /// Next view of up to `batch_size` items, or None once exhausted
    pub fn next_batch(&mut self) -> Option<&'a [T]> {
        if self.idx >= self.items.len() {
            return None;
        }

        let next_idx = (self.idx + self.batch_size).min(self.items.len());
        let batch = &self.items[self.idx..next_idx];
        self.idx = next_idx;
        Some(batch)
    }
}

impl<'a, T> Iterator for Batcher<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_batch_size_rejected() {
        let items = [1, 2, 3];
        assert_eq!(
            Batcher::new(&items, 0).unwrap_err(),
            BatcherError::InvalidBatchSize
        );
    }

    #[test]
    fn test_exact_multiple() {
        let items: Vec<u32> = (0..50).collect();
        let mut batcher = Batcher::new(&items, 25).unwrap();

        assert_eq!(batcher.next_batch().unwrap().len(), 25);
        assert_eq!(batcher.next_batch().unwrap().len(), 25);
        assert!(batcher.next_batch().is_none());
        // stays exhausted
        assert!(batcher.next_batch().is_none());
    }

    #[test]
    fn test_short_last_batch() {
        let items: Vec<u32> = (0..30).collect();
        let sizes: Vec<usize> = Batcher::new(&items, 25).unwrap().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![25, 5]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let items: Vec<u32> = Vec::new();
        let mut batcher = Batcher::new(&items, 3).unwrap();
        assert!(batcher.next_batch().is_none());
    }

    #[test]
    fn test_batch_larger_than_input() {
        let items = ["a", "b"];
        let batches: Vec<&[&str]> = Batcher::new(&items, 10).unwrap().collect();
        assert_eq!(batches, vec![&items[..]]);
    }

    #[test]
    fn test_concatenation_preserves_order() {
        for n in 0..40usize {
            for b in 1..12usize {
                let items: Vec<usize> = (0..n).collect();
                let batches: Vec<&[usize]> = Batcher::new(&items, b).unwrap().collect();

                assert_eq!(batches.len(), n.div_ceil(b));
                if let Some((last, full)) = batches.split_last() {
                    assert!(full.iter().all(|batch| batch.len() == b));
                    assert!(!last.is_empty() && last.len() <= b);
                }

                let joined: Vec<usize> = batches.concat();
                assert_eq!(joined, items);
            }
        }
    }

    #[test]
    fn test_batches_are_views_into_source() {
        let items = vec![10, 20, 30];
        let first = Batcher::new(&items, 2).unwrap().next_batch().unwrap();
        assert!(std::ptr::eq(first.as_ptr(), items.as_ptr()));
    }
}

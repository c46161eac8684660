use std::ops::RangeInclusive;

use alloy::primitives::BlockNumber;

/// Splits an inclusive block span into consecutive windows of at most `window` blocks, oldest
/// first.
#[derive(Debug, Clone)]
pub struct RangeIterator {
    next_start: BlockNumber,
    end: BlockNumber,
    window: u64,
    remaining: u64,
}

impl RangeIterator {
    /// Windows over `blocks`. An empty span yields nothing.
    ///
    /// # Panics
    ///
    /// Panics if `window` is 0.
    #[must_use]
    pub fn new(blocks: RangeInclusive<BlockNumber>, window: u64) -> Self {
        assert!(window >= 1, "window must be at least 1");
        let (start, end) = blocks.into_inner();
        let remaining = if start > end { 0 } else { (end - start) / window + 1 };
        Self { next_start: start, end, window, remaining }
    }

    /// Number of windows not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for RangeIterator {
    type Item = RangeInclusive<BlockNumber>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let start = self.next_start;
        let end = start.saturating_add(self.window - 1).min(self.end);
        self.next_start = end.saturating_add(1);

        Some(start..=end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

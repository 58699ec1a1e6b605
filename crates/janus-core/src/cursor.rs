//! Indexer cursor: turns a checkpoint and a chain head into the next delta.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::types::Epoch;

/// The indexer's position relative to the chain head.
///
/// The cursor knows:
/// - Which epoch was last fully indexed
/// - The confirmation depth (how many epochs behind head count as final)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Last fully indexed epoch.
    pub height: Epoch,
    /// Epochs to stay behind the head.
    pub confirmation_depth: Epoch,
}

impl Cursor {
    pub fn new(height: Epoch, confirmation_depth: Epoch) -> Self {
        Self {
            height,
            confirmation_depth,
        }
    }

    /// Highest epoch considered final for a given head.
    pub fn safe_head(&self, head: Epoch) -> Epoch {
        head - self.confirmation_depth
    }

    /// The inclusive epoch range still to index, or `None` if caught up.
    pub fn next_range(&self, head: Epoch) -> Option<RangeInclusive<Epoch>> {
        let safe_head = self.safe_head(head);
        if self.height >= safe_head {
            return None;
        }
        Some(self.height + 1..=safe_head)
    }

    /// Number of final epochs not yet indexed.
    pub fn lag(&self, head: Epoch) -> Epoch {
        (self.safe_head(head) - self.height).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_range_behind_safe_head() {
        let cursor = Cursor::new(0, 20);
        assert_eq!(cursor.safe_head(25), 5);
        assert_eq!(cursor.next_range(25), Some(1..=5));
        assert_eq!(cursor.lag(25), 5);
    }

    #[test]
    fn caught_up_yields_nothing() {
        let cursor = Cursor::new(100, 20);
        assert_eq!(cursor.next_range(120), None); // safe head == checkpoint
        assert_eq!(cursor.next_range(110), None); // safe head below checkpoint
        assert_eq!(cursor.lag(110), 0);
    }

    #[test]
    fn single_epoch_delta() {
        let cursor = Cursor::new(100, 20);
        assert_eq!(cursor.next_range(121), Some(101..=101));
    }
}

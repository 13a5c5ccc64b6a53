//! Bounded trail of recent status snapshots.

use std::collections::VecDeque;

use crate::status::DeviceStatus;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_LEN: usize = 20;

/// FIFO ring of `DeviceStatus` copies; the oldest entry is evicted when the
/// ring is full.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    entries: VecDeque<DeviceStatus>,
    capacity: usize,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LEN)
    }
}

impl HistoryRing {
    /// `capacity` is clamped to at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, status: DeviceStatus) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(status);
    }

    /// Copies of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<DeviceStatus> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusCode;
    use proptest::prelude::*;

    fn at(ts: f64) -> DeviceStatus {
        DeviceStatus {
            status: StatusCode::Heating,
            timestamp: ts,
            temperature: 60.0,
            remaining_time: 1.0,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut ring = HistoryRing::with_capacity(3);
        for ts in 0..5 {
            ring.push(at(ts as f64));
        }
        let stamps: Vec<f64> = ring.snapshot().iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut ring = HistoryRing::with_capacity(2);
        ring.push(at(1.0));
        let snap = ring.snapshot();
        ring.push(at(2.0));
        ring.push(at(3.0));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].timestamp, 1.0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut ring = HistoryRing::with_capacity(0);
        ring.push(at(1.0));
        ring.push(at(2.0));
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.snapshot()[0].timestamp, 2.0);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity_and_keeps_order(cap in 1usize..40, n in 0usize..200) {
            let mut ring = HistoryRing::with_capacity(cap);
            for i in 0..n {
                ring.push(at(i as f64));
            }
            let snap = ring.snapshot();
            prop_assert_eq!(snap.len(), n.min(cap));
            prop_assert!(snap.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
            if let Some(last) = snap.last() {
                prop_assert_eq!(last.timestamp, (n - 1) as f64);
            }
        }
    }
}

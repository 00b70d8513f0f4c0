//! Bounded per-item sample queues.
//!
//! Entries leave the queue only through [`SampleQueue::pop_one`] or
//! capacity pressure; there is no time-based eviction.

use crate::value::Sample;
use std::collections::VecDeque;

/// Which entry is dropped when a push would exceed capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiscardPolicy {
    /// Drop the head (oldest) entry to make room for the new one.
    #[default]
    DiscardOldest,
    /// Refuse the incoming entry; the head stays untouched.
    DiscardNewest,
}

/// A bounded FIFO of samples awaiting delivery.
#[derive(Debug, Clone)]
pub struct SampleQueue {
    entries: VecDeque<Sample>,
    capacity: usize,
    policy: DiscardPolicy,
    discarded: u64,
}

impl SampleQueue {
    /// Creates an empty queue. A capacity of zero is treated as one.
    pub fn new(capacity: usize, policy: DiscardPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            policy,
            discarded: 0,
        }
    }

    /// Appends a sample, applying the overflow policy at capacity.
    pub fn push(&mut self, sample: Sample) {
        if self.entries.len() >= self.capacity {
            match self.policy {
                DiscardPolicy::DiscardOldest => {
                    self.entries.pop_front();
                    self.discarded += 1;
                }
                DiscardPolicy::DiscardNewest => {
                    self.discarded += 1;
                    return;
                }
            }
        }
        self.entries.push_back(sample);
    }

    /// Removes and returns the head entry.
    pub fn pop_one(&mut self) -> Option<Sample> {
        self.entries.pop_front()
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

    pub fn policy(&self) -> DiscardPolicy {
        self.policy
    }

    /// Number of samples lost to capacity pressure since creation.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Changes capacity and policy. Shrinking drops excess entries from
    /// the head (oldest first); growing keeps existing entries.
    pub fn set_capacity(&mut self, capacity: usize, policy: DiscardPolicy) {
        let capacity = capacity.max(1);
        while self.entries.len() > capacity {
            self.entries.pop_front();
            self.discarded += 1;
        }
        self.capacity = capacity;
        self.policy = policy;
    }
}

#[cfg(test)]
mod tests {
    use super::{DiscardPolicy, SampleQueue};
    use crate::value::{DataValue, Sample, Variant};
    use proptest::prelude::*;

    fn sample(value: f64) -> Sample {
        Sample::new(DataValue::new(Variant::Float(value)))
    }

    fn values(queue: &SampleQueue) -> Vec<f64> {
        let mut queue = queue.clone();
        let mut out = Vec::new();
        while let Some(sample) = queue.pop_one() {
            match sample.value.value {
                Variant::Float(v) => out.push(v),
                _ => unreachable!(),
            }
        }
        out
    }

    #[test]
    fn discard_oldest_keeps_most_recent() {
        let mut queue = SampleQueue::new(2, DiscardPolicy::DiscardOldest);
        queue.push(sample(5.0));
        queue.push(sample(6.0));
        queue.push(sample(7.0));
        assert_eq!(values(&queue), vec![6.0, 7.0]);
        assert_eq!(queue.discarded(), 1);
    }

    #[test]
    fn discard_newest_keeps_head() {
        let mut queue = SampleQueue::new(2, DiscardPolicy::DiscardNewest);
        queue.push(sample(5.0));
        queue.push(sample(6.0));
        queue.push(sample(7.0));
        assert_eq!(values(&queue), vec![5.0, 6.0]);
        assert_eq!(queue.discarded(), 1);
    }

    #[test]
    fn pop_is_fifo() {
        let mut queue = SampleQueue::new(3, DiscardPolicy::DiscardOldest);
        queue.push(sample(1.0));
        queue.push(sample(2.0));
        assert_eq!(queue.pop_one(), Some(sample(1.0)));
        assert_eq!(queue.pop_one(), Some(sample(2.0)));
        assert_eq!(queue.pop_one(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn shrink_drops_from_head() {
        let mut queue = SampleQueue::new(4, DiscardPolicy::DiscardOldest);
        for v in [1.0, 2.0, 3.0, 4.0] {
            queue.push(sample(v));
        }
        queue.set_capacity(2, DiscardPolicy::DiscardOldest);
        assert_eq!(values(&queue), vec![3.0, 4.0]);
        assert_eq!(queue.capacity(), 2);
        assert_eq!(queue.discarded(), 2);
    }

    #[test]
    fn grow_keeps_entries() {
        let mut queue = SampleQueue::new(2, DiscardPolicy::DiscardNewest);
        queue.push(sample(1.0));
        queue.push(sample(2.0));
        queue.set_capacity(5, DiscardPolicy::DiscardOldest);
        assert_eq!(values(&queue), vec![1.0, 2.0]);
        assert_eq!(queue.policy(), DiscardPolicy::DiscardOldest);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut queue = SampleQueue::new(0, DiscardPolicy::DiscardOldest);
        queue.push(sample(1.0));
        queue.push(sample(2.0));
        assert_eq!(queue.capacity(), 1);
        assert_eq!(values(&queue), vec![2.0]);
    }

    proptest! {
        // len() never exceeds capacity, and under discard-oldest the
        // retained entries are exactly the most recent `capacity` pushes.
        #[test]
        fn queue_bound_holds(pushes in prop::collection::vec(-1e6f64..1e6, 0..64), capacity in 1usize..8) {
            let mut queue = SampleQueue::new(capacity, DiscardPolicy::DiscardOldest);
            for &v in &pushes {
                queue.push(sample(v));
                prop_assert!(queue.len() <= capacity);
            }
            let expected: Vec<f64> = pushes
                .iter()
                .copied()
                .skip(pushes.len().saturating_sub(capacity))
                .collect();
            prop_assert_eq!(values(&queue), expected);
        }

        #[test]
        fn discard_newest_keeps_prefix(pushes in prop::collection::vec(-1e6f64..1e6, 0..64), capacity in 1usize..8) {
            let mut queue = SampleQueue::new(capacity, DiscardPolicy::DiscardNewest);
            for &v in &pushes {
                queue.push(sample(v));
                prop_assert!(queue.len() <= capacity);
            }
            let expected: Vec<f64> = pushes.iter().copied().take(capacity).collect();
            prop_assert_eq!(values(&queue), expected);
        }
    }
}

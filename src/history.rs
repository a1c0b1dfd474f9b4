use std::collections::{vec_deque, VecDeque};

use crate::sample::Sample;

/// Fixed-capacity window of the most recent samples, oldest first.
pub struct History {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl History {
    /// `capacity` must be at least 1; config validation guarantees this.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be at least 1");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, sample: Sample) {
        // Evict before inserting so len never exceeds capacity
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use proptest::prelude::*;

    fn sample(value: f64) -> Sample {
        Sample::new(NaiveTime::from_hms_opt(10, 0, 0).unwrap(), value)
    }

    fn values(history: &History) -> Vec<f64> {
        history.snapshot().iter().map(|s| s.value).collect()
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = History::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            history.append(sample(v));
        }
        assert_eq!(values(&history), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn capacity_one_keeps_latest() {
        let mut history = History::new(1);
        history.append(sample(1.0));
        history.append(sample(2.0));
        assert_eq!(values(&history), vec![2.0]);
    }

    #[test]
    fn starts_empty() {
        let history = History::new(5);
        assert!(history.is_empty());
        assert!(history.snapshot().is_empty());
        assert_eq!(history.capacity(), 5);
    }

    #[test]
    #[should_panic(expected = "at least 1")]
    fn zero_capacity_is_rejected() {
        History::new(0);
    }

    proptest! {
        #[test]
        fn keeps_last_n_in_arrival_order(
            capacity in 1usize..64,
            input in proptest::collection::vec(-1e6f64..1e6, 0..256),
        ) {
            let mut history = History::new(capacity);
            for (i, v) in input.iter().enumerate() {
                history.append(sample(*v));
                prop_assert!(history.len() <= capacity);
                prop_assert_eq!(history.len(), (i + 1).min(capacity));
            }
            let keep = input.len().min(capacity);
            let expected = input[input.len() - keep..].to_vec();
            prop_assert_eq!(values(&history), expected);
        }
    }
}

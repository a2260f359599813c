// Fixed-capacity sample history for one channel
//
// FIFO eviction with O(1) amortized append. The running minimum and maximum
// are kept in monotonic wedges so the display baseline never needs a full
// rescan, and an eviction of the current extreme re-derives it from the
// next candidate in the wedge.

use std::collections::VecDeque;

/// Ring buffer of the most recent `capacity` values of one channel
#[derive(Debug, Clone)]
pub struct ChannelRingBuffer {
    capacity: usize,
    values: VecDeque<f64>,
    /// Sequence number of `values[0]`
    head_seq: u64,
    /// Increasing values, front is the current minimum
    min_wedge: VecDeque<(u64, f64)>,
    /// Decreasing values, front is the current maximum
    max_wedge: VecDeque<(u64, f64)>,
    total_evicted: u64,
}

impl ChannelRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
            head_seq: 0,
            min_wedge: VecDeque::new(),
            max_wedge: VecDeque::new(),
            total_evicted: 0,
        }
    }

    /// Append a value, evicting the oldest one first when full
    pub fn append(&mut self, value: f64) {
        if self.capacity == 0 {
            self.total_evicted += 1;
            return;
        }

        if self.values.len() == self.capacity {
            self.evict_oldest();
        }

        let seq = self.head_seq + self.values.len() as u64;
        self.values.push_back(value);

        while matches!(self.min_wedge.back(), Some(&(_, v)) if v >= value) {
            self.min_wedge.pop_back();
        }
        self.min_wedge.push_back((seq, value));

        while matches!(self.max_wedge.back(), Some(&(_, v)) if v <= value) {
            self.max_wedge.pop_back();
        }
        self.max_wedge.push_back((seq, value));
    }

    fn evict_oldest(&mut self) {
        if self.values.pop_front().is_none() {
            return;
        }
        let seq = self.head_seq;
        if matches!(self.min_wedge.front(), Some(&(s, _)) if s == seq) {
            self.min_wedge.pop_front();
        }
        if matches!(self.max_wedge.front(), Some(&(s, _)) if s == seq) {
            self.max_wedge.pop_front();
        }
        self.head_seq += 1;
        self.total_evicted += 1;
    }

    /// Minimum over the retained window, `None` when empty
    pub fn min(&self) -> Option<f64> {
        self.min_wedge.front().map(|&(_, v)| v)
    }

    /// Maximum over the retained window, `None` when empty
    pub fn max(&self) -> Option<f64> {
        self.max_wedge.front().map(|&(_, v)| v)
    }

    /// `max - min`, zero when empty
    pub fn amplitude(&self) -> f64 {
        match (self.min(), self.max()) {
            (Some(min), Some(max)) => max - min,
            _ => 0.0,
        }
    }

    /// Ordered copy of the retained values, oldest first
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_evicted(&self) -> u64 {
        self.total_evicted
    }

    pub fn clear(&mut self) {
        self.head_seq += self.values.len() as u64;
        self.values.clear();
        self.min_wedge.clear();
        self.max_wedge.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_min(values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::min)
    }

    fn naive_max(values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::max)
    }

    #[test]
    fn test_holds_most_recent_values_in_order() {
        let mut buffer = ChannelRingBuffer::new(3);
        for v in 1..=5 {
            buffer.append(v as f64);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec![3.0, 4.0, 5.0]);
        assert_eq!(buffer.total_evicted(), 2);
    }

    #[test]
    fn test_eviction_at_full_capacity() {
        let mut buffer = ChannelRingBuffer::new(10_000);
        for i in 0..10_001 {
            buffer.append(i as f64);
        }

        assert_eq!(buffer.len(), 10_000);
        // the first retained value is the one appended second overall
        assert_eq!(buffer.iter().next(), Some(1.0));
        assert_eq!(buffer.last(), Some(10_000.0));
    }

    #[test]
    fn test_empty_buffer_has_no_extremes() {
        let buffer = ChannelRingBuffer::new(4);
        assert_eq!(buffer.min(), None);
        assert_eq!(buffer.max(), None);
        assert_eq!(buffer.amplitude(), 0.0);
    }

    #[test]
    fn test_minimum_rederived_after_evicting_it() {
        let mut buffer = ChannelRingBuffer::new(3);
        buffer.append(1.0);
        buffer.append(5.0);
        buffer.append(3.0);
        assert_eq!(buffer.min(), Some(1.0));
        assert_eq!(buffer.max(), Some(5.0));

        buffer.append(4.0); // evicts 1.0
        assert_eq!(buffer.min(), Some(3.0));

        buffer.append(2.0); // evicts 5.0
        assert_eq!(buffer.max(), Some(4.0));
        assert_eq!(buffer.min(), Some(2.0));
    }

    #[test]
    fn test_extremes_match_full_scan_over_long_run() {
        let mut buffer = ChannelRingBuffer::new(17);
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..2_000 {
            // xorshift, keeps the test deterministic without extra crates
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let value = (state % 1_000) as f64 / 10.0 - 50.0;
            buffer.append(value);

            let window = buffer.snapshot();
            assert_eq!(buffer.min(), naive_min(&window));
            assert_eq!(buffer.max(), naive_max(&window));
        }
    }

    #[test]
    fn test_clear_resets_window() {
        let mut buffer = ChannelRingBuffer::new(2);
        buffer.append(7.0);
        buffer.append(9.0);
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.min(), None);

        buffer.append(-1.0);
        assert_eq!(buffer.snapshot(), vec![-1.0]);
        assert_eq!(buffer.max(), Some(-1.0));
    }

    #[test]
    fn test_zero_capacity_never_retains() {
        let mut buffer = ChannelRingBuffer::new(0);
        buffer.append(1.0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.min(), None);
    }
}

//! Fixed-capacity top-K accumulator.
//!
//! A min-heap on weight: the root is the weakest kept entry, so pushing
//! past capacity evicts it in O(log K).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::NotNan;

#[derive(Debug, Clone)]
pub struct TopK<T> {
    capacity: usize,
    heap: BinaryHeap<Entry<T>>,
    // Insertion counter; among equal weights the earlier entry survives.
    seq: u64,
}

impl<T> TopK<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
            seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offers `(weight, value)`. Returns false if the weight is NaN or the
    /// entry did not make the cut.
    pub fn push(&mut self, weight: f64, value: T) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let Ok(weight) = NotNan::new(weight) else {
            return false;
        };
        let entry = Entry {
            weight,
            seq: self.seq,
            value,
        };
        self.seq += 1;

        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            return true;
        }
        let stronger = self
            .heap
            .peek()
            .is_some_and(|worst| entry.cmp(worst) == Ordering::Less);
        if !stronger {
            return false;
        }
        self.heap.pop();
        self.heap.push(entry);
        true
    }

    /// Kept entries, strongest first.
    pub fn into_sorted_vec(self) -> Vec<(f64, T)> {
        // Ascending in heap order is strongest-first.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.weight.into_inner(), e.value))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    weight: NotNan<f64>,
    seq: u64,
    value: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // "Greater" means weaker, so BinaryHeap's max is the eviction candidate.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_single_highest_weight() {
        let mut top = TopK::new(1);
        assert!(top.push(0.9, "a"));
        assert!(!top.push(0.5, "b"));
        assert!(!top.push(-0.8, "c"));
        assert_eq!(top.into_sorted_vec(), vec![(0.9, "a")]);
    }

    #[test]
    fn evicts_smallest_and_sorts_descending() {
        let mut top = TopK::new(3);
        for (w, id) in [(0.1, 1), (0.7, 2), (-0.4, 3), (0.3, 4), (0.95, 5)] {
            top.push(w, id);
        }
        assert_eq!(top.len(), 3);
        assert_eq!(top.into_sorted_vec(), vec![(0.95, 5), (0.7, 2), (0.3, 4)]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut top = TopK::new(2);
        top.push(0.5, 'a');
        top.push(0.5, 'b');
        top.push(0.5, 'c');
        assert_eq!(top.into_sorted_vec(), vec![(0.5, 'a'), (0.5, 'b')]);
    }

    #[test]
    fn nan_and_zero_capacity_are_ignored() {
        let mut top = TopK::new(2);
        assert!(!top.push(f64::NAN, 0));
        assert!(top.is_empty());

        let mut none: TopK<u32> = TopK::new(0);
        assert!(!none.push(1.0, 0));
        assert_eq!(none.len(), 0);
    }
}

//! Shuffle order for queue traversal.
//!
//! A [`ShuffleOrder`] is a bijection between play-order positions and queue
//! indices. The queue mirrors every mutation into it so relative order of
//! untouched items survives adds, removals and moves; only
//! [`ShuffleOrder::init`] and [`ShuffleOrder::reshuffle`] produce a fresh
//! permutation.
//!
//! Inserted indices are each placed at a uniformly random position. The
//! result is not a uniform shuffle of the enlarged set, which is acceptable
//! for playback and keeps inserts O(n).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct ShuffleOrder {
    /// Position in play order -> queue index.
    shuffled: Vec<usize>,
    /// Queue index -> position in play order.
    index_in_shuffled: Vec<usize>,
    rng: StdRng,
}

impl Default for ShuffleOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShuffleOrder {
    /// Creates an empty order seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates an empty order with a fixed seed (deterministic tests).
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            shuffled: Vec::new(),
            index_in_shuffled: Vec::new(),
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.shuffled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shuffled.is_empty()
    }

    /// Queue indices in play order.
    pub fn order(&self) -> &[usize] {
        &self.shuffled
    }

    /// Replaces the order with a Fisher–Yates permutation of `0..length`.
    pub fn init(&mut self, length: usize) {
        self.shuffled = (0..length).collect();
        self.shuffled.shuffle(&mut self.rng);
        self.rebuild_inverse();
    }

    /// Mirrors inserting `count` queue items at queue index `at`.
    pub fn insert(&mut self, at: usize, count: usize) {
        if count == 0 {
            return;
        }

        for index in self.shuffled.iter_mut() {
            if *index >= at {
                *index += count;
            }
        }

        for offset in 0..count {
            let position = self.rng.gen_range(0..=self.shuffled.len());
            self.shuffled.insert(position, at + offset);
        }

        self.rebuild_inverse();
    }

    /// Mirrors removing queue indices `from..to_exclusive`.
    pub fn remove(&mut self, from: usize, to_exclusive: usize) {
        if from >= to_exclusive {
            return;
        }

        let count = to_exclusive - from;
        self.shuffled
            .retain(|index| !(from..to_exclusive).contains(index));
        for index in self.shuffled.iter_mut() {
            if *index >= to_exclusive {
                *index -= count;
            }
        }

        self.rebuild_inverse();
    }

    /// Mirrors a queue move of the item at `from` to `to`.
    ///
    /// Play-order positions are kept; only the queue indices they refer to
    /// are remapped.
    pub fn move_index(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }

        for index in self.shuffled.iter_mut() {
            *index = remap_for_move(*index, from, to);
        }

        self.rebuild_inverse();
    }

    /// Produces a fresh permutation, optionally pinning an index to the
    /// first and/or last play-order position.
    ///
    /// When both pins name the same index, only the first-position pin applies.
    pub fn reshuffle(&mut self, keep_first: Option<usize>, keep_last: Option<usize>) {
        let length = self.shuffled.len();
        self.init(length);

        if let Some(index) = keep_first.filter(|index| *index < length) {
            let position = self.index_in_shuffled[index];
            self.shuffled.swap(0, position);
        }

        if let Some(index) = keep_last.filter(|index| *index < length) {
            if Some(index) != keep_first && length > 1 {
                let position = self
                    .shuffled
                    .iter()
                    .position(|candidate| *candidate == index)
                    .unwrap_or(length - 1);
                self.shuffled.swap(length - 1, position);
            }
        }

        self.rebuild_inverse();
    }

    /// Queue index played after `after`, or `None` at the end of the order.
    pub fn next_index(&self, after: usize) -> Option<usize> {
        let position = *self.index_in_shuffled.get(after)?;
        self.shuffled.get(position + 1).copied()
    }

    /// Queue index played before `before`, or `None` at the start of the order.
    pub fn previous_index(&self, before: usize) -> Option<usize> {
        let position = *self.index_in_shuffled.get(before)?;
        position
            .checked_sub(1)
            .and_then(|previous| self.shuffled.get(previous).copied())
    }

    pub fn first(&self) -> Option<usize> {
        self.shuffled.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.shuffled.last().copied()
    }

    /// Play-order position of a queue index.
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.index_in_shuffled.get(index).copied()
    }

    fn rebuild_inverse(&mut self) {
        self.index_in_shuffled = vec![0; self.shuffled.len()];
        for (position, index) in self.shuffled.iter().enumerate() {
            self.index_in_shuffled[*index] = position;
        }
    }
}

/// Where queue index `index` ends up after moving `from` to `to`.
pub(crate) fn remap_for_move(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if to < from && index >= to && index < from {
        index + 1
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijection(order: &ShuffleOrder, len: usize) {
        let mut seen = order.order().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (0..len).collect::<Vec<_>>());
        for (position, index) in order.order().iter().enumerate() {
            assert_eq!(order.position_of(*index), Some(position));
        }
    }

    #[test]
    fn init_produces_permutation() {
        let mut order = ShuffleOrder::with_seed(7);
        order.init(20);
        assert_bijection(&order, 20);
    }

    #[test]
    fn insert_shifts_existing_and_keeps_relative_order() {
        let mut order = ShuffleOrder::with_seed(1);
        order.init(5);
        let before: Vec<usize> = order.order().to_vec();

        order.insert(2, 3);
        assert_bijection(&order, 8);

        let survivors: Vec<usize> = order
            .order()
            .iter()
            .copied()
            .filter(|index| !(2..5).contains(index))
            .map(|index| if index >= 5 { index - 3 } else { index })
            .collect();
        assert_eq!(survivors, before);
    }

    #[test]
    fn remove_range_drops_and_shifts() {
        let mut order = ShuffleOrder::with_seed(3);
        order.init(6);
        let before: Vec<usize> = order.order().to_vec();

        order.remove(1, 3);
        assert_bijection(&order, 4);

        let expected: Vec<usize> = before
            .into_iter()
            .filter(|index| !(1..3).contains(index))
            .map(|index| if index >= 3 { index - 2 } else { index })
            .collect();
        assert_eq!(order.order(), expected.as_slice());
    }

    #[test]
    fn move_keeps_positions() {
        let mut order = ShuffleOrder::with_seed(9);
        order.init(5);
        let position_of_moved = order.position_of(1).unwrap();

        order.move_index(1, 3);
        assert_bijection(&order, 5);
        assert_eq!(order.position_of(3), Some(position_of_moved));
    }

    #[test]
    fn remap_for_move_matches_vec_semantics() {
        let mut items: Vec<usize> = (0..6).collect();
        let moved = items.remove(4);
        items.insert(1, moved);
        for (new_index, original) in items.iter().enumerate() {
            assert_eq!(remap_for_move(*original, 4, 1), new_index);
        }
    }

    #[test]
    fn reshuffle_pins_first_and_last() {
        let mut order = ShuffleOrder::with_seed(11);
        order.init(10);
        order.reshuffle(Some(4), Some(7));

        assert_eq!(order.first(), Some(4));
        assert_eq!(order.last(), Some(7));
        assert_bijection(&order, 10);
    }

    #[test]
    fn reshuffle_same_pin_prefers_first() {
        let mut order = ShuffleOrder::with_seed(5);
        order.init(4);
        order.reshuffle(Some(2), Some(2));
        assert_eq!(order.first(), Some(2));
    }

    #[test]
    fn next_and_previous_stop_at_boundaries() {
        let mut order = ShuffleOrder::with_seed(2);
        order.init(3);
        let first = order.first().unwrap();
        let last = order.last().unwrap();

        assert_eq!(order.previous_index(first), None);
        assert_eq!(order.next_index(last), None);
        assert_eq!(order.next_index(99), None);

        let second = order.next_index(first).unwrap();
        assert_eq!(order.previous_index(second), Some(first));
    }
}

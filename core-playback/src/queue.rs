//! # Queue Store
//!
//! Ordered items plus the current cursor.
//!
//! ## Overview
//!
//! Insertion order is canonical. Every mutation keeps `current_index`
//! pointing at the same logical item where it still exists, mirrors the
//! change into the [`ShuffleOrder`], and reports an [`ActiveItemChange`] only
//! when the effective current item changed. The store never touches the
//! renderer; the engine reacts to the returned changes.
//!
//! ## Invariants
//!
//! - `current_index` is `None` iff the queue is empty, else `< len`
//! - the shuffle order is always a permutation of `0..len`

use std::collections::HashSet;

use serde::Serialize;

use crate::config::RepeatMode;
use crate::error::QueueError;
use crate::shuffle::{remap_for_move, ShuffleOrder};
use crate::types::QueueItem;

pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Current item moved to a different item (or to nothing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveItemChange {
    pub previous_index: Option<usize>,
    pub previous_item: Option<QueueItem>,
    pub index: Option<usize>,
    pub item: Option<QueueItem>,
}

/// Outcome of cursor navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorMove {
    /// Nothing to move to.
    Unchanged,
    /// Target is the current item itself; play it again from the start.
    Restart,
    Changed(ActiveItemChange),
}

#[derive(Debug, Clone)]
pub struct QueueStore {
    items: Vec<QueueItem>,
    current: Option<usize>,
    last_index: Option<usize>,
    last_item: Option<QueueItem>,
    shuffle: ShuffleOrder,
    shuffle_enabled: bool,
    repeat_mode: RepeatMode,
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore {
    pub fn new() -> Self {
        Self::with_shuffle(ShuffleOrder::new())
    }

    /// Store with a deterministic shuffle order.
    pub fn with_shuffle_seed(seed: u64) -> Self {
        Self::with_shuffle(ShuffleOrder::with_seed(seed))
    }

    fn with_shuffle(shuffle: ShuffleOrder) -> Self {
        Self {
            items: Vec::new(),
            current: None,
            last_index: None,
            last_item: None,
            shuffle,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::Off,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_item(&self) -> Option<&QueueItem> {
        self.current.and_then(|index| self.items.get(index))
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    /// Queue indices in traversal order.
    pub fn play_order(&self) -> Vec<usize> {
        if self.shuffle_enabled {
            self.shuffle.order().to_vec()
        } else {
            (0..self.items.len()).collect()
        }
    }

    pub fn shuffle_order(&self) -> &ShuffleOrder {
        &self.shuffle
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Inserts `items` at `at` (default: append).
    ///
    /// Reports a change only when the queue was empty before.
    pub fn add(
        &mut self,
        items: Vec<QueueItem>,
        at: Option<usize>,
    ) -> QueueResult<Option<ActiveItemChange>> {
        let len = self.items.len();
        let at = at.unwrap_or(len);
        if at > len {
            return Err(QueueError::IndexOutOfBounds { index: at, len });
        }
        if items.is_empty() {
            return Ok(None);
        }

        let count = items.len();
        self.items.splice(at..at, items);
        self.shuffle.insert(at, count);

        match self.current {
            None => Ok(Some(self.set_current(Some(0)))),
            Some(current) if at <= current => {
                self.relocate(current + count);
                Ok(None)
            }
            Some(_) => Ok(None),
        }
    }

    pub fn remove(&mut self, index: usize) -> QueueResult<Option<ActiveItemChange>> {
        self.check_index(index)?;
        let current_removed = self.remove_at(index);
        Ok(self.finish_removal(current_removed))
    }

    /// Removes several indices at once.
    ///
    /// The whole set is validated before anything is removed; removals are
    /// applied in descending order and at most one change is reported.
    pub fn remove_many(&mut self, indices: &[usize]) -> QueueResult<Option<ActiveItemChange>> {
        let mut seen = HashSet::with_capacity(indices.len());
        for &index in indices {
            self.check_index(index)?;
            if !seen.insert(index) {
                return Err(QueueError::DuplicateIndex(index));
            }
        }

        let mut ordered = indices.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));

        let mut current_removed = false;
        for index in ordered {
            current_removed |= self.remove_at(index);
        }

        Ok(self.finish_removal(current_removed))
    }

    /// Moves the item at `from` to `to`.
    ///
    /// Neither endpoint may be the current index.
    pub fn move_item(&mut self, from: usize, to: usize) -> QueueResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;

        if Some(from) == self.current {
            return Err(QueueError::InvalidMove {
                from,
                to,
                reason: "cannot move the current item".to_string(),
            });
        }
        if Some(to) == self.current {
            return Err(QueueError::InvalidMove {
                from,
                to,
                reason: "cannot move an item onto the current index".to_string(),
            });
        }
        if from == to {
            return Ok(());
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.shuffle.move_index(from, to);

        if let Some(current) = self.current {
            self.relocate(remap_for_move(current, from, to));
        }
        Ok(())
    }

    pub fn skip_to(&mut self, index: usize) -> QueueResult<CursorMove> {
        self.check_index(index)?;
        if Some(index) == self.current {
            return Ok(CursorMove::Restart);
        }
        Ok(CursorMove::Changed(self.set_current(Some(index))))
    }

    /// Advances in play order. Wraps only with [`RepeatMode::Queue`].
    pub fn next(&mut self) -> CursorMove {
        self.navigate(self.peek_next())
    }

    /// Steps back in play order. Wraps only with [`RepeatMode::Queue`].
    pub fn previous(&mut self) -> CursorMove {
        self.navigate(self.peek_previous())
    }

    /// Index `next()` would move to.
    pub fn peek_next(&self) -> Option<usize> {
        let current = self.current?;
        let target = if self.shuffle_enabled {
            self.shuffle.next_index(current)
        } else {
            Some(current + 1).filter(|index| *index < self.items.len())
        };

        target.or_else(|| match self.repeat_mode {
            RepeatMode::Queue => self.first_in_play_order(),
            RepeatMode::Off | RepeatMode::Track => None,
        })
    }

    /// Index `previous()` would move to.
    pub fn peek_previous(&self) -> Option<usize> {
        let current = self.current?;
        let target = if self.shuffle_enabled {
            self.shuffle.previous_index(current)
        } else {
            current.checked_sub(1)
        };

        target.or_else(|| match self.repeat_mode {
            RepeatMode::Queue => self.last_in_play_order(),
            RepeatMode::Off | RepeatMode::Track => None,
        })
    }

    /// Drops every item after the current one in queue order.
    ///
    /// Returns how many items were removed.
    pub fn remove_upcoming(&mut self) -> usize {
        let Some(current) = self.current else {
            return 0;
        };

        let len = self.items.len();
        let start = current + 1;
        if start >= len {
            return 0;
        }

        self.items.truncate(start);
        self.shuffle.remove(start, len);
        len - start
    }

    /// Replaces the current item with `item`. Always a change.
    pub fn replace_current(&mut self, item: QueueItem) -> QueueResult<ActiveItemChange> {
        let current = self.current.ok_or(QueueError::EmptyQueue)?;
        self.items[current] = item;
        Ok(self.set_current(Some(current)))
    }

    /// Patches an item in place without touching the cursor.
    pub fn update_item(&mut self, index: usize, item: QueueItem) -> QueueResult<()> {
        self.check_index(index)?;
        self.items[index] = item;
        if Some(index) == self.current {
            self.relocate(index);
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Option<ActiveItemChange> {
        if self.items.is_empty() {
            return None;
        }
        self.items.clear();
        self.shuffle.init(0);
        Some(self.set_current(None))
    }

    /// Replaces the whole queue, starting at `start` (default 0).
    pub fn set_queue(
        &mut self,
        items: Vec<QueueItem>,
        start: Option<usize>,
    ) -> QueueResult<Option<ActiveItemChange>> {
        let len = items.len();
        let start = match (len, start) {
            (0, None) => None,
            (_, Some(index)) if index >= len => {
                return Err(QueueError::IndexOutOfBounds { index, len });
            }
            (_, start) => Some(start.unwrap_or(0)),
        };

        if self.items.is_empty() && len == 0 {
            return Ok(None);
        }

        self.items = items;
        self.shuffle.init(len);
        if self.shuffle_enabled {
            self.shuffle.reshuffle(start, None);
        }

        Ok(Some(self.set_current(start)))
    }

    /// Toggles shuffle. Enabling reshuffles with the current item first.
    pub fn set_shuffle_enabled(&mut self, enabled: bool) -> bool {
        if enabled == self.shuffle_enabled {
            return false;
        }
        if enabled {
            self.shuffle.reshuffle(self.current, None);
        }
        self.shuffle_enabled = enabled;
        true
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) -> bool {
        if mode == self.repeat_mode {
            return false;
        }
        self.repeat_mode = mode;
        true
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn check_index(&self, index: usize) -> QueueResult<()> {
        if index >= self.items.len() {
            return Err(QueueError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    /// Removes one index and re-homes the cursor. Returns whether the
    /// current item was the one removed.
    fn remove_at(&mut self, index: usize) -> bool {
        self.items.remove(index);
        self.shuffle.remove(index, index + 1);

        match self.current {
            Some(current) if current == index => {
                self.current = if self.items.is_empty() {
                    None
                } else {
                    Some(current % self.items.len())
                };
                true
            }
            Some(current) if index < current => {
                self.current = Some(current - 1);
                false
            }
            _ => false,
        }
    }

    fn finish_removal(&mut self, current_removed: bool) -> Option<ActiveItemChange> {
        if current_removed {
            Some(self.set_current(self.current))
        } else {
            if let Some(current) = self.current {
                self.relocate(current);
            }
            None
        }
    }

    fn navigate(&mut self, target: Option<usize>) -> CursorMove {
        match target {
            None => CursorMove::Unchanged,
            Some(index) if Some(index) == self.current => CursorMove::Restart,
            Some(index) => CursorMove::Changed(self.set_current(Some(index))),
        }
    }

    fn first_in_play_order(&self) -> Option<usize> {
        if self.shuffle_enabled {
            self.shuffle.first()
        } else {
            (!self.items.is_empty()).then_some(0)
        }
    }

    fn last_in_play_order(&self) -> Option<usize> {
        if self.shuffle_enabled {
            self.shuffle.last()
        } else {
            self.items.len().checked_sub(1)
        }
    }

    /// Moves the cursor to a different item and reports the change.
    fn set_current(&mut self, index: Option<usize>) -> ActiveItemChange {
        let previous_index = self.last_index;
        let previous_item = self.last_item.take();
        self.current = index;
        self.snapshot_current();

        ActiveItemChange {
            previous_index,
            previous_item,
            index: self.current,
            item: self.last_item.clone(),
        }
    }

    /// Same logical item at a new index.
    fn relocate(&mut self, index: usize) {
        self.current = Some(index);
        self.snapshot_current();
    }

    fn snapshot_current(&mut self) {
        self.last_index = self.current;
        self.last_item = self.current_item().cloned();
    }
}

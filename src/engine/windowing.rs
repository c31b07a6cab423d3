//! Window math and rendering key cycling.
//!
//! The render window is a row-aligned slice of the items array. Rendering keys
//! come from a fixed-size pool that rotates with the window, so an item that
//! stays rendered across a shift keeps its key and its host-side state.

use crate::config::MediaQuery;
use crate::model::EngineError;

/// Select the grid column count for a viewport width.
///
/// Rules are evaluated in order and the *last* rule with
/// `max_width >= viewport_width` wins, like a CSS cascade. Falls back to
/// `max_items_per_row`, then to a single column.
///
/// # Examples
///
/// ```
/// use infiniscroll::config::MediaQuery;
/// use infiniscroll::engine::compute_items_per_row;
///
/// let rules = [
///     MediaQuery { max_width: 1200, items_per_row: 3 },
///     MediaQuery { max_width: 700, items_per_row: 1 },
/// ];
/// assert_eq!(compute_items_per_row(&rules, Some(4), 1600), 4);
/// assert_eq!(compute_items_per_row(&rules, Some(4), 1000), 3);
/// assert_eq!(compute_items_per_row(&rules, Some(4), 500), 1);
/// ```
pub fn compute_items_per_row(
    media_queries: &[MediaQuery],
    max_items_per_row: Option<usize>,
    viewport_width: i64,
) -> usize {
    media_queries
        .iter()
        .filter(|rule| rule.max_width >= viewport_width)
        .last()
        .map(|rule| rule.items_per_row)
        .or(max_items_per_row)
        .unwrap_or(1)
        .max(1)
}

/// Round `index` down to the start of its row.
pub fn snap_down(index: usize, items_per_row: usize) -> usize {
    index - index % items_per_row.max(1)
}

/// Number of item rows after the window end (a trailing partial row counts).
pub(crate) fn rows_after_window(
    items_len: usize,
    render_start: usize,
    count_rendered: usize,
    items_per_row: usize,
) -> usize {
    items_len
        .saturating_sub(render_start + count_rendered)
        .div_ceil(items_per_row.max(1))
}

/// Fixed-size pool of rendering keys.
#[derive(Debug, Clone, Default)]
pub struct KeyPool {
    keys: Vec<String>,
    epoch: u64,
}

impl KeyPool {
    /// Create a pool of `size` fresh keys.
    pub fn new(size: usize) -> Self {
        let mut pool = Self::default();
        pool.regenerate(size);
        pool
    }

    /// Replace every key with a fresh one. Hosts remount everything.
    pub fn regenerate(&mut self, size: usize) {
        self.epoch += 1;
        let epoch = self.epoch;
        self.keys = (0..size).map(|slot| format!("k{epoch}-{slot}")).collect();
    }

    /// Keep the pool at `size` keys and rotate it by `offset_change`.
    ///
    /// Positive values rotate left (the window moved forward), negative values
    /// rotate right. Any magnitude is accepted; rotation is modulo the pool
    /// size. The pool is regenerated when its size differs from `size`.
    ///
    /// # Errors
    ///
    /// [`EngineError::KeyPoolExhausted`] when the pool cannot label
    /// `rendered_len` items.
    pub fn rebuild(
        &mut self,
        size: usize,
        rendered_len: usize,
        offset_change: i64,
    ) -> Result<(), EngineError> {
        if self.keys.len() != size {
            self.regenerate(size);
        }
        self.rotate(offset_change);
        self.ensure_covers(rendered_len)
    }

    /// Rotate without resizing. Positive values rotate left.
    pub fn rotate(&mut self, offset_change: i64) {
        if !self.keys.is_empty() {
            let shift = offset_change.rem_euclid(self.keys.len() as i64) as usize;
            self.keys.rotate_left(shift);
        }
    }

    /// Drop the key at `position` and recycle it at the end.
    ///
    /// Used when an item inside the window disappears: everything after it
    /// moves up one slot and keeps its key.
    pub fn retire(&mut self, position: usize) {
        if position < self.keys.len() {
            let key = self.keys.remove(position);
            self.keys.push(key);
        }
    }

    /// Check the pool can label `rendered_len` items.
    ///
    /// # Errors
    ///
    /// [`EngineError::KeyPoolExhausted`] otherwise.
    pub fn ensure_covers(&self, rendered_len: usize) -> Result<(), EngineError> {
        if self.keys.len() < rendered_len {
            return Err(EngineError::KeyPoolExhausted {
                keys: self.keys.len(),
                rendered: rendered_len,
            });
        }
        Ok(())
    }

    /// Key of a window slot.
    pub fn get(&self, slot: usize) -> Option<&str> {
        self.keys.get(slot).map(String::as_str)
    }

    /// All keys in slot order.
    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }

    /// Pool size.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the pool holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(max_width: i64, items_per_row: usize) -> MediaQuery {
        MediaQuery {
            max_width,
            items_per_row,
        }
    }

    #[test]
    fn last_matching_rule_wins() {
        // Both rules match a 300px viewport; the later one is applied
        let rules = [rule(400, 1), rule(800, 2)];
        assert_eq!(compute_items_per_row(&rules, None, 300), 2);
    }

    #[test]
    fn falls_back_to_max_items_then_one() {
        let rules = [rule(400, 1)];
        assert_eq!(compute_items_per_row(&rules, Some(5), 1000), 5);
        assert_eq!(compute_items_per_row(&rules, None, 1000), 1);
        assert_eq!(compute_items_per_row(&[], None, 1000), 1);
    }

    #[test]
    fn snap_down_aligns_to_row_start() {
        assert_eq!(snap_down(5, 3), 3);
        assert_eq!(snap_down(6, 3), 6);
        assert_eq!(snap_down(5, 1), 5);
        assert_eq!(snap_down(0, 4), 0);
    }

    #[test]
    fn rows_after_window_counts_partial_row() {
        // 10 items, window [0, 6) with 3 per row: 4 remain -> 2 rows
        assert_eq!(rows_after_window(10, 0, 6, 3), 2);
        assert_eq!(rows_after_window(6, 0, 6, 3), 0);
        assert_eq!(rows_after_window(4, 3, 6, 3), 0);
    }

    #[test]
    fn rebuild_rotates_left_for_forward_shift() {
        let mut pool = KeyPool::new(4);
        let before = pool.as_slice().to_vec();
        pool.rebuild(4, 4, 1).unwrap();
        assert_eq!(pool.get(0), Some(before[1].as_str()));
        assert_eq!(pool.get(3), Some(before[0].as_str()));
    }

    #[test]
    fn rebuild_rotates_right_for_backward_shift() {
        let mut pool = KeyPool::new(4);
        let before = pool.as_slice().to_vec();
        pool.rebuild(4, 4, -1).unwrap();
        assert_eq!(pool.get(0), Some(before[3].as_str()));
        assert_eq!(pool.get(1), Some(before[0].as_str()));
    }

    #[test]
    fn rebuild_handles_shifts_larger_than_pool() {
        let mut pool = KeyPool::new(4);
        let before = pool.as_slice().to_vec();
        pool.rebuild(4, 4, 9).unwrap();
        assert_eq!(pool.get(0), Some(before[1].as_str()));
        pool.rebuild(4, 4, -9).unwrap();
        assert_eq!(pool.as_slice(), before.as_slice());
    }

    #[test]
    fn rebuild_regenerates_on_size_change() {
        let mut pool = KeyPool::new(4);
        let before = pool.as_slice().to_vec();
        pool.rebuild(6, 6, 0).unwrap();
        assert_eq!(pool.len(), 6);
        assert!(pool.as_slice().iter().all(|k| !before.contains(k)));
    }

    #[test]
    fn rebuild_fails_when_pool_too_small() {
        let mut pool = KeyPool::new(2);
        let err = pool.rebuild(2, 3, 0).unwrap_err();
        assert_eq!(
            err,
            EngineError::KeyPoolExhausted {
                keys: 2,
                rendered: 3
            }
        );
    }

    #[test]
    fn retire_moves_key_to_end() {
        let mut pool = KeyPool::new(3);
        let before = pool.as_slice().to_vec();
        pool.retire(1);
        assert_eq!(
            pool.as_slice(),
            &[before[0].clone(), before[2].clone(), before[1].clone()]
        );
    }

    proptest! {
        /// Keys are never duplicated, whatever the rotation.
        #[test]
        fn prop_rotation_preserves_key_set(size in 1usize..40, shift in -200i64..200) {
            let mut pool = KeyPool::new(size);
            let mut before = pool.as_slice().to_vec();
            pool.rebuild(size, size, shift).unwrap();
            let mut after = pool.as_slice().to_vec();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }

        /// An item surviving a shift keeps its key.
        #[test]
        fn prop_surviving_slot_keeps_key(size in 2usize..40, shift in 1usize..40) {
            prop_assume!(shift < size);
            let mut pool = KeyPool::new(size);
            let before = pool.as_slice().to_vec();
            pool.rebuild(size, size, shift as i64).unwrap();
            for new_slot in 0..size - shift {
                prop_assert_eq!(pool.get(new_slot), Some(before[new_slot + shift].as_str()));
            }
        }
    }
}

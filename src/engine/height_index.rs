//! HeightIndex - O(log n) prefix sums over row heights via Fenwick tree
//!
//! The engine sums the heights of grid rows whenever the render window moves
//! (rows leaving the top), a relayout resolves (rows revealed above) or a
//! resize re-anchors the scroll position (rows before the anchor).
//!
//! # Complexity
//!
//! - `prefix_sum`: O(log n)
//! - `sum_range`: O(log n)
//! - `push`: O(log n) amortized
//! - `total`: O(log n)

use std::ops::Range;

/// Cumulative heights for a sequence of rows.
#[derive(Debug, Clone)]
pub struct HeightIndex {
    /// Fenwick tree backing storage (1-indexed internally, 0-indexed API)
    tree: Vec<isize>,
    /// Number of valid entries (len <= tree.len())
    len: usize,
}

impl HeightIndex {
    /// Creates an empty index with the given initial capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// # use infiniscroll::engine::height_index::HeightIndex;
    /// let index = HeightIndex::new(16);
    /// assert!(index.is_empty());
    /// assert_eq!(index.total(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            tree: vec![0; capacity],
            len: 0,
        }
    }

    /// Builds an index from row heights in order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use infiniscroll::engine::height_index::HeightIndex;
    /// let index = HeightIndex::from_heights([40, 60, 50]);
    /// assert_eq!(index.sum_range(0..2), 100);
    /// assert_eq!(index.total(), 150);
    /// ```
    pub fn from_heights(heights: impl IntoIterator<Item = i64>) -> Self {
        let heights: Vec<i64> = heights.into_iter().collect();
        let mut index = Self::new(heights.len());
        for height in heights {
            index.push(height);
        }
        index
    }

    // Height of a single entry.
    fn height(&self, index: usize) -> i64 {
        if index == 0 {
            self.prefix_sum(0)
        } else {
            self.prefix_sum(index) - self.prefix_sum(index - 1)
        }
    }

    /// Cumulative height up to and including `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn prefix_sum(&self, index: usize) -> i64 {
        assert!(
            index < self.len,
            "index {} out of bounds (len: {})",
            index,
            self.len
        );
        fenwick::array::prefix_sum(&self.tree, index) as i64
    }

    /// Summed height of the entries in `range`, clamped to the valid entries.
    pub fn sum_range(&self, range: Range<usize>) -> i64 {
        let end = range.end.min(self.len);
        if range.start >= end {
            return 0;
        }
        let upto_end = self.prefix_sum(end - 1);
        if range.start == 0 {
            upto_end
        } else {
            upto_end - self.prefix_sum(range.start - 1)
        }
    }

    /// Total height of all entries.
    pub fn total(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.prefix_sum(self.len - 1)
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends an entry.
    pub fn push(&mut self, height: i64) {
        if self.len >= self.tree.len() {
            self.grow();
        }
        let idx = self.len;
        self.len += 1;
        fenwick::array::update(&mut self.tree, idx, height as isize);
    }

    // Fenwick nodes past the old length never received updates, so a larger
    // tree has to be rebuilt from the entry heights.
    fn grow(&mut self) {
        let heights: Vec<i64> = (0..self.len).map(|i| self.height(i)).collect();
        self.tree = vec![0; self.tree.len().max(1) * 2];
        for (idx, height) in heights.into_iter().enumerate() {
            fenwick::array::update(&mut self.tree, idx, height as isize);
        }
    }
}

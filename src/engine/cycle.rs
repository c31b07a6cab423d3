//! Scroll-driven window shifting.
//!
//! Scrolling down, rows that have left the viewport at the top are recycled
//! to the bottom of the window. Scrolling up, rows below the viewport are
//! recycled to the top, where they are placed above the window until their
//! heights are known.

use super::height_index::HeightIndex;
use super::types::{Measure, RowBox};
use super::windowing::rows_after_window;
use super::{ScrollDirection, ScrollEngine};
use crate::model::{EngineError, Identify};
use tracing::debug;

impl<T: Identify> ScrollEngine<T> {
    /// Shift the window by whole rows according to the scroll direction.
    ///
    /// Does nothing while a relayout is pending or while any rendered item is
    /// unregistered or unmeasured.
    pub(super) fn cycle(&mut self, measure: &impl Measure<T::Id>) -> Result<(), EngineError> {
        if self.relayout_rows > 0 || self.resize.is_some() || self.remeasure {
            return Ok(());
        }
        let Some(rows) = self.measure_rows(measure) else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }
        match self.direction {
            ScrollDirection::Down => {
                if self.reveal_row_above_flush_window(&rows)? {
                    return Ok(());
                }
                self.cycle_down(&rows)
            }
            ScrollDirection::Up => self.cycle_up(&rows),
        }
    }

    fn cycle_down(&mut self, rows: &[RowBox]) -> Result<(), EngineError> {
        let behind = rows.iter().take_while(|row| row.bottom < 1).count();
        let available = rows_after_window(
            self.items.len(),
            self.render_start,
            self.count_rendered(),
            self.items_per_row,
        );
        let shift = behind.min(available);
        if shift == 0 {
            return Ok(());
        }

        let heights = HeightIndex::from_heights(rows.iter().map(|row| row.height));
        let moved = heights.sum_range(0..shift) + shift as i64 * self.config.row_gap;
        self.shift_window(shift as i64)?;

        // Pay back the upward transform before growing the spacer
        let consumed = (-self.translate_y).min(moved);
        self.translate_y += consumed;
        self.min_height += moved - consumed;

        debug!(
            rows = shift,
            moved,
            render_start = self.render_start,
            min_height = self.min_height,
            translate_y = self.translate_y,
            "Cycled window down"
        );
        Ok(())
    }

    fn cycle_up(&mut self, rows: &[RowBox]) -> Result<(), EngineError> {
        let last_visible_px = self.viewport.height - 1;
        let mut behind = rows
            .iter()
            .rev()
            .take_while(|row| row.top > last_visible_px)
            .count();
        let available = self.render_start / self.items_per_row;

        // Empty space above the window has to be filled even if nothing
        // below has left the viewport yet.
        if behind == 0 && available > 0 && rows[0].top >= 0 {
            behind = 1;
        }

        let shift = behind.min(available);
        if shift == 0 {
            return Ok(());
        }

        self.shift_window(-(shift as i64))?;
        self.relayout_rows = shift;

        debug!(
            rows = shift,
            render_start = self.render_start,
            "Cycled window up"
        );
        Ok(())
    }

    /// Reveal one row when the window sits at the list top with rows before it.
    ///
    /// A relayout drops the spacer, so the rows before the window have no
    /// scroll range left above the viewport and no upward scroll can reach
    /// them. The revealed row is resolved at the next commit, which pushes
    /// the scroll position down by its height. Scrolling up fills the gap
    /// through [`cycle_up`](Self::cycle_up) instead.
    fn reveal_row_above_flush_window(&mut self, rows: &[RowBox]) -> Result<bool, EngineError> {
        let flush = self.min_height + self.translate_y <= 0;
        if self.render_start == 0 || !flush || rows[0].top < 0 {
            return Ok(false);
        }
        self.shift_window(-1)?;
        self.relayout_rows = 1;
        debug!(
            render_start = self.render_start,
            "Revealed row above window at list top"
        );
        Ok(true)
    }

    /// Move `render_start` by whole rows and rotate the keys with it.
    fn shift_window(&mut self, rows: i64) -> Result<(), EngineError> {
        let offset_change = rows * self.items_per_row as i64;
        self.render_start = (self.render_start as i64 + offset_change).max(0) as usize;
        let rendered_len = self.rendered_range().len();
        self.keys
            .rebuild(self.count_rendered(), rendered_len, offset_change)?;
        self.needs_render = true;
        Ok(())
    }

    /// Measure every rendered row.
    ///
    /// `None` unless every rendered item is registered and measurable.
    pub(super) fn measure_rows(&self, measure: &impl Measure<T::Id>) -> Option<Vec<RowBox>> {
        let mut rows = Vec::new();
        for chunk in self.rendered_items().chunks(self.items_per_row) {
            let mut rects = Vec::with_capacity(chunk.len());
            for item in chunk {
                let id = item.item_id();
                if !self.registry.contains_key(&id) {
                    return None;
                }
                rects.push(measure.measure(&id)?);
            }
            rows.extend(RowBox::from_rects(rects));
        }
        Some(rows)
    }

    /// Heights of rendered rows `range`, measuring what is available.
    ///
    /// Items that cannot be measured contribute nothing; the caller decides
    /// whether that is an error.
    pub(super) fn row_heights(
        &self,
        measure: &impl Measure<T::Id>,
        rows: std::ops::Range<usize>,
    ) -> (HeightIndex, usize) {
        let mut missing = 0;
        let mut heights = HeightIndex::new(rows.len());
        for chunk in self
            .rendered_items()
            .chunks(self.items_per_row)
            .skip(rows.start)
            .take(rows.len())
        {
            let rects = chunk.iter().filter_map(|item| {
                let rect = measure.measure(&item.item_id());
                if rect.is_none() {
                    missing += 1;
                }
                rect
            });
            heights.push(RowBox::from_rects(rects).map_or(0, |row| row.height));
        }
        (heights, missing)
    }
}

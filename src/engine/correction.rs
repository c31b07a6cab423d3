//! Measurement and invariant-preserving scroll correction.
//!
//! Whenever the engine changes layout state that moves content on screen,
//! it moves the scroll position by the same amount so what the user looks
//! at stays put. Corrections are collected and applied in `commit`, after
//! the host has committed the layout they refer to.

use super::types::{ItemRect, Measure, Viewport, VisibleAnchor};
use super::windowing::{compute_items_per_row, snap_down};
use super::{Effect, ScrollDirection, ScrollEngine};
use crate::model::{EngineError, Identify};
use tracing::{debug, error, trace};

/// True if any part of `rect` lies inside a viewport of `viewport_height`.
///
/// A row of exactly one pixel at either edge counts as visible; zero-height
/// rects never do.
///
/// # Examples
///
/// ```
/// use infiniscroll::engine::{calc_intersecting, ItemRect};
///
/// assert!(calc_intersecting(&ItemRect::new(-99, 100, 10), 500));
/// assert!(!calc_intersecting(&ItemRect::new(-100, 100, 10), 500));
/// assert!(!calc_intersecting(&ItemRect::new(500, 100, 10), 500));
/// ```
pub fn calc_intersecting(rect: &ItemRect, viewport_height: i64) -> bool {
    rect.height > 0 && rect.bottom() >= 1 && rect.top <= viewport_height - 1
}

impl<T: Identify> ScrollEngine<T> {
    /// The host mounted an item's element.
    pub fn item_mounted(&mut self, id: T::Id) {
        if !self.mounted_batch.contains(&id) {
            self.mounted_batch.push(id);
        }
    }

    /// The host unmounted an item's element.
    pub fn item_unmounted(&mut self, id: &T::Id) {
        self.registry.remove(id);
        self.mounted_batch.retain(|pending| pending != id);
    }

    /// Native scroll event.
    ///
    /// # Errors
    ///
    /// [`EngineError::KeyPoolExhausted`] if shifting the window breaks the key pool.
    pub fn on_scroll(&mut self, y: i64, measure: &impl Measure<T::Id>) -> Result<(), EngineError> {
        if self.ignore_next_scroll {
            self.ignore_next_scroll = false;
            self.scroll_y = y;
            self.update_first_and_last_visible(measure);
            return Ok(());
        }

        self.auto_paused = false;
        if y > self.scroll_y {
            self.direction = ScrollDirection::Down;
        } else if y < self.scroll_y {
            self.direction = ScrollDirection::Up;
        }
        self.scroll_y = y;

        self.cycle(measure)?;
        self.update_first_and_last_visible(measure);
        Ok(())
    }

    /// Viewport resize.
    ///
    /// A resize that changes the column count or the width re-snaps the
    /// window to the new row grid and re-anchors the scroll position on the
    /// first visible item at the next commit. Repeating the same viewport is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// [`EngineError::KeyPoolExhausted`] if the regenerated key pool cannot
    /// cover the window.
    pub fn on_resize(&mut self, viewport: Viewport) -> Result<(), EngineError> {
        if viewport == self.viewport {
            return Ok(());
        }
        let previous = self.viewport;
        self.viewport = viewport;

        let items_per_row = compute_items_per_row(
            &self.config.media_queries,
            self.config.max_items_per_row,
            viewport.width,
        );
        if items_per_row == self.items_per_row && viewport.width == previous.width {
            trace!(height = viewport.height, "Viewport height changed");
            return Ok(());
        }

        let prev_items_per_row = self.items_per_row;
        self.items_per_row = items_per_row;
        self.render_start = snap_down(self.render_start, items_per_row);
        let rendered_len = self.rendered_range().len();
        self.keys.rebuild(self.count_rendered(), rendered_len, 0)?;

        debug!(
            width = viewport.width,
            prev_items_per_row,
            items_per_row,
            render_start = self.render_start,
            "Viewport resized"
        );
        self.begin_relayout(prev_items_per_row);
        Ok(())
    }

    /// Post-commit synchronization point.
    ///
    /// Call after the host has rendered the latest description and applied
    /// scroll effects. Verifies the mounts since the last commit, resolves
    /// pending relayouts, applies scroll corrections and, if none were
    /// needed, shifts the window.
    ///
    /// # Errors
    ///
    /// [`EngineError::KeyPoolExhausted`] if shifting the window breaks the key pool.
    pub fn commit(&mut self, measure: &impl Measure<T::Id>) -> Result<(), EngineError> {
        self.verify_mounted_batch(measure);
        if self.remeasure {
            self.remeasure_window(measure);
        }
        self.resolve_relayout(measure);
        self.fix_scroll_after_resize(measure);
        self.fix_negative_translate_y();

        let scrolled = self.apply_pending_scroll();
        if scrolled {
            // Rects are stale until the host has scrolled; visibility is
            // refreshed by the scroll event that follows.
            return Ok(());
        }
        self.cycle(measure)?;
        self.update_first_and_last_visible(measure);
        Ok(())
    }

    /// Set the scroll position without the resulting event counting as a user scroll.
    ///
    /// Returns `true` if a `ScrollTo` effect was emitted.
    pub(super) fn perform_invariant_scroll(&mut self, y: i64) -> bool {
        if y == self.scroll_y {
            return false;
        }
        trace!(from = self.scroll_y, to = y, "Invariant scroll");
        self.ignore_next_scroll = true;
        self.scroll_y = y;
        self.effects.push(Effect::ScrollTo { y });
        true
    }

    fn verify_mounted_batch(&mut self, measure: &impl Measure<T::Id>) {
        if self.mounted_batch.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.mounted_batch);
        let rendered: Vec<T::Id> = self.rendered_items().iter().map(|i| i.item_id()).collect();

        for id in batch {
            if !rendered.contains(&id) {
                error!(id = ?id, "Mounted item is not in the render window");
                continue;
            }
            match measure.measure(&id) {
                Some(rect) => {
                    if rect.height <= 0 {
                        error!(id = ?id, "Mounted item has no height");
                    }
                    self.registry.insert(id, rect);
                }
                None => error!(id = ?id, "Mounted item cannot be measured"),
            }
        }
    }

    fn remeasure_window(&mut self, measure: &impl Measure<T::Id>) {
        self.remeasure = false;
        let measured: Vec<(T::Id, Option<ItemRect>)> = self
            .rendered_items()
            .iter()
            .map(|item| {
                let id = item.item_id();
                let rect = measure.measure(&id);
                (id, rect)
            })
            .collect();
        for (id, rect) in measured {
            match rect {
                Some(rect) => {
                    self.registry.insert(id, rect);
                }
                None => error!(id = ?id, "Rendered item cannot be measured"),
            }
        }
    }

    /// Return rows revealed above the window to normal flow.
    ///
    /// Their summed heights are taken out of `translate_y` so nothing moves.
    /// Runs at the first commit after the shift whatever the scroll
    /// direction is by then.
    fn resolve_relayout(&mut self, measure: &impl Measure<T::Id>) {
        if self.relayout_rows == 0 {
            return;
        }
        let rows = self.relayout_rows;
        let (heights, missing) = self.row_heights(measure, 0..rows);
        if missing > 0 {
            error!(rows, missing, "Relayout rows committed without measurements");
        }
        let revealed = heights.total() + rows as i64 * self.config.row_gap;
        self.translate_y -= revealed;
        self.relayout_rows = 0;
        self.needs_render = true;
        debug!(rows, revealed, translate_y = self.translate_y, "Resolved relayout");
    }

    /// Re-anchor the scroll position after a resize relayout.
    fn fix_scroll_after_resize(&mut self, measure: &impl Measure<T::Id>) {
        let Some(resize) = self.resize.take() else {
            return;
        };
        let container_top = self.viewport.container_top;
        let base = if self.scroll_y > container_top {
            container_top
        } else {
            self.scroll_y
        };
        let mut target = base;

        let window = self.rendered_range();
        let anchor = resize
            .anchor
            .filter(|_| base == container_top)
            .filter(|anchor| window.contains(&anchor.index));
        if let Some(VisibleAnchor { index, rect }) = anchor {
            let anchor_row = (index - self.render_start) / self.items_per_row;
            let (heights, missing) = self.row_heights(measure, 0..anchor_row + 1);
            if missing > 0 {
                error!(missing, "Resized rows committed without measurements");
            }
            target += heights.sum_range(0..anchor_row) + anchor_row as i64 * self.config.row_gap;

            // Keep the same fraction of the anchor hidden above the viewport
            if rect.top < 0 && rect.height > 0 {
                let new_height = measure
                    .measure(&self.items[index].item_id())
                    .map_or(rect.height, |r| r.height);
                target += (-rect.top) * new_height / rect.height;
            }
        }

        debug!(
            prev_items_per_row = resize.prev_items_per_row,
            items_per_row = self.items_per_row,
            target,
            "Re-anchored scroll after resize"
        );
        self.pending_scroll.base = Some(target);
        self.pending_scroll.delta = 0;
        if self.render_start > 0 {
            // The rows before the window are revealed by a commit after the scroll lands
            self.needs_render = true;
        }
    }

    /// Keep the window's visual top non-negative.
    ///
    /// At the head of the list the geometry collapses to zero.
    fn fix_negative_translate_y(&mut self) {
        let window_top = self.min_height + self.translate_y;
        if self.render_start == 0 {
            if window_top != 0 || self.min_height != 0 {
                self.pending_scroll.delta -= window_top;
                self.min_height = 0;
                self.translate_y = 0;
                self.needs_render = true;
                debug!(window_top, "Collapsed geometry at list head");
            }
            return;
        }
        if window_top < 0 {
            let shortfall = -window_top;
            self.translate_y += shortfall;
            self.pending_scroll.delta += shortfall;
            self.needs_render = true;
            debug!(shortfall, translate_y = self.translate_y, "Fixed negative window top");
        }
    }

    fn apply_pending_scroll(&mut self) -> bool {
        let pending = std::mem::take(&mut self.pending_scroll);
        if pending.is_empty() {
            return false;
        }
        let target = pending.base.unwrap_or(self.scroll_y) + pending.delta;
        self.perform_invariant_scroll(target)
    }

    /// Recompute the visible range and react to it.
    fn update_first_and_last_visible(&mut self, measure: &impl Measure<T::Id>) {
        let viewport_height = self.viewport.height;
        let mut first = None;
        let mut last = None;
        for (slot, item) in self.rendered_items().iter().enumerate() {
            let Some(rect) = measure.measure(&item.item_id()) else {
                continue;
            };
            if calc_intersecting(&rect, viewport_height) {
                let index = self.render_start + slot;
                first.get_or_insert(VisibleAnchor { index, rect });
                last = Some(index);
            }
        }

        if first.is_some() {
            self.first_visible = first;
            self.last_visible = last;
        }
        self.offer_url();
        self.auto_trigger();
    }

    fn offer_url(&mut self) {
        if let Some(params) = self.url_params() {
            if let Some(params) = self.url.offer(params, self.clock) {
                self.effects.push(Effect::ReplaceUrl(params));
            }
        }
    }

    /// Queue automatic loads when either end of the items is on screen.
    fn auto_trigger(&mut self) {
        if self.auto_paused {
            return;
        }
        let Some(info) = self.cursor.info.as_ref() else {
            return;
        };
        let (has_more, has_new) = (info.has_more, info.has_new);
        let items_per_row = self.items_per_row;

        let last_row_start = snap_down(self.items.len().saturating_sub(1), items_per_row);
        let at_tail = self
            .last_visible
            .is_some_and(|last| !self.items.is_empty() && last >= last_row_start);
        if at_tail && has_more && !self.jobs.any(|k| k.is_page_load() || k.is_load_more()) {
            debug!("Last row visible, loading more");
            self.load_more();
        }

        let at_head = self
            .first_visible
            .is_some_and(|first| first.index < items_per_row);
        if at_head
            && has_new
            && self.loaded_with_query_params
            && !self.jobs.any(|k| k.is_page_load() || k.fetches_new())
        {
            debug!("First row visible, loading new");
            self.load_new();
        }
    }
}

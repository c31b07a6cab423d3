//! Deterministic stand-in for a browser rendering the list.
//!
//! Lays rendered items out like a CSS grid: flowing rows stack from the
//! window top (`container_top + min_height + translate_y`) separated by the
//! row gap, overlay rows stack upward above it. The document is as tall as
//! the container offset plus the spacer plus the flowing rows; the window
//! transform does not change it.

use super::Block;
use crate::engine::height_index::HeightIndex;
use crate::engine::{ItemRect, Measure, Placement, RenderDescription, Viewport};
use crate::integration::{Host, MountDiff};
use crate::model::{Identify, UrlParams};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;

/// Document-space box of a laid out item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DocRect {
    top: i64,
    height: i64,
}

/// Simulated presentation layer.
#[derive(Debug)]
pub struct SimulatedHost<T: Identify> {
    viewport: Viewport,
    scroll_y: i64,
    doc_height: i64,
    column_width: i64,
    layout: HashMap<T::Id, DocRect>,
    keys: HashSet<String>,
    elements_created: usize,
    url: Option<UrlParams>,
    zero_height: HashSet<T::Id>,
}

impl<T: Identify + Block> SimulatedHost<T> {
    /// An empty page scrolled to the top.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            scroll_y: 0,
            doc_height: viewport.container_top,
            column_width: viewport.width,
            layout: HashMap::new(),
            keys: HashSet::new(),
            elements_created: 0,
            url: None,
            zero_height: HashSet::new(),
        }
    }

    /// Change the viewport. The next render lays out with the new width.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.clamp_scroll();
    }

    /// Current viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Height of the whole document after the last render.
    pub fn doc_height(&self) -> i64 {
        self.doc_height
    }

    /// Largest reachable scroll position.
    pub fn max_scroll(&self) -> i64 {
        (self.doc_height - self.viewport.height).max(0)
    }

    /// Elements created because their key was not on screen before.
    pub fn elements_created(&self) -> usize {
        self.elements_created
    }

    /// Last URL state the engine published.
    pub fn url(&self) -> Option<&UrlParams> {
        self.url.as_ref()
    }

    /// Render `id` without height, as a broken stylesheet would.
    pub fn collapse(&mut self, id: T::Id) {
        self.zero_height.insert(id);
    }

    /// Document offset of an item's top edge.
    pub fn doc_top(&self, id: &T::Id) -> Option<i64> {
        self.layout.get(id).map(|rect| rect.top)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_y = self.scroll_y.clamp(0, self.max_scroll());
    }

    fn item_height(&self, item: &T) -> i64 {
        if self.zero_height.contains(&item.item_id()) {
            0
        } else {
            item.height_at(self.column_width)
        }
    }
}

impl<T: Identify + Block> Measure<T::Id> for SimulatedHost<T> {
    fn measure(&self, id: &T::Id) -> Option<ItemRect> {
        self.layout
            .get(id)
            .map(|rect| ItemRect::new(rect.top - self.scroll_y, rect.height, self.column_width))
    }
}

impl<T: Identify + Block> Host<T> for SimulatedHost<T> {
    fn render(&mut self, description: &RenderDescription<'_, T>) -> MountDiff<T::Id> {
        let container = description.container;
        let columns = container.columns.max(1) as i64;
        self.column_width = (self.viewport.width / columns).max(1);

        // Row number -> items, kept separately for flowing and overlay rows
        let mut flow: BTreeMap<usize, Vec<(T::Id, i64)>> = BTreeMap::new();
        let mut overlay: BTreeMap<usize, Vec<(T::Id, i64)>> = BTreeMap::new();
        let mut translate_y = 0;
        for rendered in &description.items {
            translate_y = rendered.style.translate_y;
            let entry = (rendered.item.item_id(), self.item_height(rendered.item));
            match rendered.style.placement {
                Placement::Grid { row, .. } => flow.entry(row).or_default().push(entry),
                Placement::Overlay { row, .. } => overlay.entry(row).or_default().push(entry),
            }
        }

        let gap = container.row_gap;
        let window_top = self.viewport.container_top + container.min_height + translate_y;
        let mut layout = HashMap::new();

        let flow_heights = HeightIndex::from_heights(flow.values().map(|row| row_height(row)));
        for (slot, row) in flow.values().enumerate() {
            let top = window_top + flow_heights.sum_range(0..slot) + slot as i64 * gap;
            place_row(&mut layout, row, top);
        }

        let overlay_heights = HeightIndex::from_heights(overlay.values().map(|row| row_height(row)));
        let overlay_rows = overlay_heights.len();
        for (slot, row) in overlay.values().enumerate() {
            let above = overlay_heights.sum_range(slot..overlay_rows)
                + (overlay_rows - slot) as i64 * gap;
            place_row(&mut layout, row, window_top - above);
        }

        let flow_rows = flow_heights.len() as i64;
        let flow_extent = flow_heights.total() + (flow_rows - 1).max(0) * gap;
        self.doc_height = self.viewport.container_top + container.min_height + flow_extent;

        let mut diff = MountDiff::default();
        for id in self.layout.keys() {
            if !layout.contains_key(id) {
                diff.unmounted.push(id.clone());
            }
        }
        for rendered in &description.items {
            let id = rendered.item.item_id();
            if !self.layout.contains_key(&id) {
                diff.mounted.push(id);
            }
        }

        let keys: HashSet<String> = description.items.iter().map(|i| i.key.to_string()).collect();
        self.elements_created += keys.difference(&self.keys).count();
        self.keys = keys;
        self.layout = layout;
        self.clamp_scroll();

        trace!(
            doc_height = self.doc_height,
            window_top,
            flow_rows,
            overlay_rows,
            "Simulated layout"
        );
        diff
    }

    fn scroll_to(&mut self, y: i64) -> i64 {
        self.scroll_y = y;
        self.clamp_scroll();
        self.scroll_y
    }

    fn scroll_y(&self) -> i64 {
        self.scroll_y
    }

    fn replace_url(&mut self, params: &UrlParams) {
        self.url = Some(params.clone());
    }
}

fn row_height<Id>(row: &[(Id, i64)]) -> i64 {
    row.iter().map(|(_, height)| *height).max().unwrap_or(0)
}

fn place_row<Id: Clone + Eq + std::hash::Hash>(
    layout: &mut HashMap<Id, DocRect>,
    row: &[(Id, i64)],
    top: i64,
) {
    for (id, height) in row {
        layout.insert(
            id.clone(),
            DocRect {
                top,
                height: *height,
            },
        );
    }
}

//! Core engine value types and the measurement capability.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Direction of the most recent user scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Towards the end of the list.
    #[default]
    Down,
    /// Towards the start of the list.
    Up,
}

/// Scroll viewport as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    /// Width in pixels. Drives the column count.
    pub width: i64,
    /// Height in pixels.
    pub height: i64,
    /// Document offset of the list container's top edge.
    pub container_top: i64,
}

impl Viewport {
    /// Create a viewport whose list container starts at the document top.
    pub fn new(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            container_top: 0,
        }
    }

    /// Same viewport with the container starting `container_top` pixels down.
    pub fn with_container_top(mut self, container_top: i64) -> Self {
        self.container_top = container_top;
        self
    }
}

/// Bounding box of a mounted item, relative to the viewport's top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ItemRect {
    /// Distance from the viewport top to the item's top edge (negative when above).
    pub top: i64,
    /// Rendered height.
    pub height: i64,
    /// Rendered width.
    pub width: i64,
}

impl ItemRect {
    /// Create a rect.
    pub fn new(top: i64, height: i64, width: i64) -> Self {
        Self { top, height, width }
    }

    /// Bottom edge relative to the viewport top.
    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }
}

/// Measurement capability injected by the presentation layer.
///
/// Returns `None` for items that are not mounted.
pub trait Measure<Id> {
    /// Current bounding box of the item's element.
    fn measure(&self, id: &Id) -> Option<ItemRect>;
}

impl<Id: Eq + Hash> Measure<Id> for HashMap<Id, ItemRect> {
    fn measure(&self, id: &Id) -> Option<ItemRect> {
        self.get(id).copied()
    }
}

/// Vertical extent of one grid row, derived from its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowBox {
    pub top: i64,
    pub bottom: i64,
    pub height: i64,
}

impl RowBox {
    /// Combine the rects of one row's items. Grid rows are as tall as their tallest item.
    pub fn from_rects(rects: impl IntoIterator<Item = ItemRect>) -> Option<Self> {
        rects.into_iter().fold(None, |row: Option<RowBox>, rect| {
            Some(match row {
                None => RowBox {
                    top: rect.top,
                    bottom: rect.bottom(),
                    height: rect.height,
                },
                Some(row) => RowBox {
                    top: row.top.min(rect.top),
                    bottom: row.bottom.max(rect.bottom()),
                    height: row.height.max(rect.height),
                },
            })
        })
    }
}

/// The first visible item, remembered as the anchor for relayouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibleAnchor {
    /// Index into the items array.
    pub index: usize,
    /// Rect at the time it was recorded.
    pub rect: ItemRect,
}

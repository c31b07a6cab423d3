//! Render description assembly.
//!
//! Pure derivation from engine state: which items to draw, with which keys
//! and grid placement, plus container sizing and the loading affordances.

use super::ScrollEngine;
use crate::model::Identify;
use serde::Serialize;
use std::fmt::Write as _;

/// Grid cell of a rendered item. Rows and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Placement {
    /// Normal grid flow. `row` counts from the first flowing row.
    Grid {
        /// Row within the flow.
        row: usize,
        /// Column within the row.
        column: usize,
    },
    /// Stacked above the first flowing row until measured.
    Overlay {
        /// Row within the overlay, counting down from the top.
        row: usize,
        /// Column within the row.
        column: usize,
    },
}

/// Per-item styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemStyle {
    /// Where the item sits in the grid.
    pub placement: Placement,
    /// Vertical transform shared by the whole window.
    pub translate_y: i64,
}

/// Styling of the list container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContainerStyle {
    /// Height reserved above the rendered rows.
    pub min_height: i64,
    /// Grid columns.
    pub columns: usize,
    /// Vertical gap between rows.
    pub row_gap: i64,
}

/// One rendered item.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedItem<'a, T> {
    /// Index into the items array.
    pub index: usize,
    /// Stable rendering key.
    pub key: &'a str,
    /// The item itself.
    pub item: &'a T,
    /// Placement and transform.
    pub style: ItemStyle,
}

/// Everything a presentation layer needs to draw the list.
#[derive(Debug, Clone, Serialize)]
pub struct RenderDescription<'a, T> {
    /// Window items in slot order.
    pub items: Vec<RenderedItem<'a, T>>,
    /// Spacer and grid settings.
    pub container: ContainerStyle,
    /// Newer items are being fetched.
    pub refreshing_new: bool,
    /// Older items are being fetched.
    pub refreshing_more: bool,
    /// Older items exist on the backend.
    pub has_more: bool,
    /// Newer items exist on the backend.
    pub has_new: bool,
    /// How many newer items exist.
    pub count_new: usize,
    /// Travel of an active pull gesture, 0 when idle.
    pub pull_distance: i64,
}

impl<T> RenderDescription<'_, T> {
    /// Compact text form, one line per item.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "container min_height={} columns={} gap={}",
            self.container.min_height, self.container.columns, self.container.row_gap
        );
        let _ = writeln!(
            out,
            "flags more={} new={} count_new={} refreshing_more={} refreshing_new={} pull={}",
            self.has_more,
            self.has_new,
            self.count_new,
            self.refreshing_more,
            self.refreshing_new,
            self.pull_distance
        );
        for item in &self.items {
            let placement = match item.style.placement {
                Placement::Grid { row, column } => format!("grid {row}/{column}"),
                Placement::Overlay { row, column } => format!("overlay {row}/{column}"),
            };
            let _ = writeln!(
                out,
                "#{} {} {} ty={}",
                item.index, item.key, placement, item.style.translate_y
            );
        }
        out
    }
}

impl<T: Identify> ScrollEngine<T> {
    /// Describe what to draw.
    pub fn render(&self) -> RenderDescription<'_, T> {
        let items_per_row = self.items_per_row;
        let relayout_rows = self.relayout_rows;
        let translate_y = self.translate_y;

        let items = self
            .rendered_items()
            .iter()
            .zip(self.keys.as_slice())
            .enumerate()
            .map(|(slot, (item, key))| {
                let row = slot / items_per_row;
                let column = slot % items_per_row + 1;
                let placement = if row < relayout_rows {
                    Placement::Overlay {
                        row: row + 1,
                        column,
                    }
                } else {
                    Placement::Grid {
                        row: row - relayout_rows + 1,
                        column,
                    }
                };
                RenderedItem {
                    index: self.render_start + slot,
                    key: key.as_str(),
                    item,
                    style: ItemStyle {
                        placement,
                        translate_y,
                    },
                }
            })
            .collect();

        let in_flight = self.jobs.in_flight().map(|f| &f.job.kind);
        let info = self.cursor.info.as_ref();
        RenderDescription {
            items,
            container: ContainerStyle {
                min_height: self.min_height,
                columns: items_per_row,
                row_gap: self.config.row_gap,
            },
            refreshing_new: in_flight.is_some_and(|kind| kind.fetches_new()),
            refreshing_more: in_flight.is_some_and(|kind| kind.is_load_more() || kind.is_page_load()),
            has_more: info.is_some_and(|i| i.has_more),
            has_new: info.is_some_and(|i| i.has_new),
            count_new: info.map_or(0, |i| i.count_new),
            pull_distance: self.pull.distance(),
        }
    }
}

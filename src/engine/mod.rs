//! Headless virtualized infinite-scroll engine.
//!
//! [`ScrollEngine`] owns the items array, the render window, the scroll
//! geometry and the pagination job queue. It performs no I/O: hosts feed it
//! events (`on_scroll`, `on_resize`, mount notifications, `commit`, gateway
//! responses) and drain [`Effect`]s telling them what to do next.
//!
//! # Geometry
//!
//! The rendered window sits below a spacer of `min_height` pixels and is
//! shifted by a `translate_y` transform. Its visual top inside the list
//! container is `min_height + translate_y`. Between updates
//! `translate_y <= 0` and the visual top is never negative.
//!
//! # Event order
//!
//! Within one pump, hosts render first, then apply the latest `ScrollTo`,
//! then call [`ScrollEngine::commit`]. Scroll corrections are computed only
//! in `commit`, against the freshly committed layout.

pub mod correction;
pub mod cycle;
pub mod height_index;
pub mod jobs;
pub mod pagination;
pub mod pull;
pub mod render;
pub mod types;
pub mod url_sync;
pub mod windowing;

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

pub use correction::calc_intersecting;
pub use jobs::{JobId, JobKind, JobOutcome, RequestId};
pub use pull::PullState;
pub use render::{ContainerStyle, ItemStyle, Placement, RenderDescription, RenderedItem};
pub use types::{ItemRect, Measure, ScrollDirection, Viewport, VisibleAnchor};
pub use windowing::{compute_items_per_row, snap_down, KeyPool};

use crate::config::EngineConfig;
use crate::model::{Identify, Ordering, PageArgs, PageInfo, QueryType, UrlParams};
use jobs::JobQueue;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, info};
use url_sync::UrlSync;

/// Instruction for the host, drained with [`ScrollEngine::take_effects`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Send a query to the pagination gateway and report the result through
    /// [`ScrollEngine::complete`].
    Query(PageRequest),
    /// Set the scroll position. The host must report the resulting scroll
    /// event through [`ScrollEngine::on_scroll`].
    ScrollTo {
        /// Target scroll position in document pixels.
        y: i64,
    },
    /// Replace the address bar query without navigation.
    ReplaceUrl(UrlParams),
    /// A job resolved.
    JobFinished {
        /// The job that resolved.
        job: JobId,
        /// How it ended.
        outcome: JobOutcome,
    },
    /// The render description changed. Always drained last.
    Rerender,
}

/// A gateway query the host has to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// Pass back to [`ScrollEngine::complete`] with the result.
    pub id: RequestId,
    /// Which query to run.
    pub query_type: QueryType,
    /// Offset, limit and anchor of the query.
    pub args: PageArgs,
}

/// Plain view of the engine state, for traces and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSnapshot {
    /// Index of the first rendered item.
    pub render_start: usize,
    /// Items actually rendered, short of the window size near the tail.
    pub rendered_len: usize,
    /// Items loaded.
    pub items_len: usize,
    /// Grid columns.
    pub items_per_row: usize,
    /// Spacer height above the window.
    pub min_height: i64,
    /// Window offset, never positive.
    pub translate_y: i64,
    /// Last scroll position the engine saw.
    pub scroll_y: i64,
    /// Direction of the last scroll.
    pub direction: ScrollDirection,
    /// Rows revealed above the window that still await measurement.
    pub relayout_rows: usize,
    /// Name of the job whose request is in flight.
    pub in_flight: Option<&'static str>,
    /// Jobs waiting behind the in-flight one.
    pub queued: usize,
    /// Rendering keys in window slot order.
    pub keys: Vec<String>,
}

/// Pagination cursor.
#[derive(Debug, Clone, Default)]
struct Cursor {
    anchor: Option<String>,
    more_offset: i64,
    info: Option<PageInfo>,
}

/// Relayout waiting for the next commit, after a resize or a column shift.
#[derive(Debug, Clone, Copy)]
struct PendingResize {
    prev_items_per_row: usize,
    anchor: Option<VisibleAnchor>,
}

/// Scroll correction collected until the next commit.
#[derive(Debug, Clone, Copy, Default)]
struct PendingScroll {
    base: Option<i64>,
    delta: i64,
}

impl PendingScroll {
    fn is_empty(&self) -> bool {
        self.base.is_none() && self.delta == 0
    }
}

/// Virtualized infinite-scroll state machine.
#[derive(Debug)]
pub struct ScrollEngine<T: Identify> {
    config: EngineConfig,
    viewport: Viewport,
    items_per_row: usize,

    items: Vec<T>,
    render_start: usize,
    keys: KeyPool,
    registry: HashMap<T::Id, ItemRect>,
    mounted_batch: Vec<T::Id>,

    min_height: i64,
    translate_y: i64,
    /// Leading rendered rows placed above the window until measured.
    relayout_rows: usize,
    remeasure: bool,
    resize: Option<PendingResize>,

    scroll_y: i64,
    direction: ScrollDirection,
    ignore_next_scroll: bool,
    pending_scroll: PendingScroll,
    first_visible: Option<VisibleAnchor>,
    last_visible: Option<usize>,

    cursor: Cursor,
    resume: Option<UrlParams>,
    loaded_with_query_params: bool,
    /// Automatic loads stay off after a failure until the user scrolls.
    auto_paused: bool,
    jobs: JobQueue<T::Id>,
    generation: u64,

    url: UrlSync,
    clock: Instant,
    pull: PullState,
    effects: Vec<Effect>,
    needs_render: bool,
}

impl<T: Identify> ScrollEngine<T> {
    /// Create an engine for a viewport. Nothing is loaded until [`mount`](Self::mount).
    pub fn new(config: EngineConfig, viewport: Viewport) -> Self {
        let items_per_row = compute_items_per_row(
            &config.media_queries,
            config.max_items_per_row,
            viewport.width,
        );
        let keys = KeyPool::new(items_per_row * config.page_size.max(1));
        let url = UrlSync::new(config.url_throttle);
        Self {
            config,
            viewport,
            items_per_row,
            items: Vec::new(),
            render_start: 0,
            keys,
            registry: HashMap::new(),
            mounted_batch: Vec::new(),
            min_height: 0,
            translate_y: 0,
            relayout_rows: 0,
            remeasure: false,
            resize: None,
            scroll_y: 0,
            direction: ScrollDirection::Down,
            ignore_next_scroll: false,
            pending_scroll: PendingScroll::default(),
            first_visible: None,
            last_visible: None,
            cursor: Cursor::default(),
            resume: None,
            loaded_with_query_params: false,
            auto_paused: false,
            jobs: JobQueue::default(),
            generation: 0,
            url,
            clock: Instant::now(),
            pull: PullState::Idle,
            effects: Vec::new(),
            needs_render: false,
        }
    }

    /// Resume from URL state on the first page load.
    pub fn resume_from(mut self, params: UrlParams) -> Self {
        self.resume = Some(params);
        self
    }

    /// Queue the initial page load.
    pub fn mount(&mut self) -> JobId {
        info!(
            page_size = self.config.page_size,
            items_per_row = self.items_per_row,
            resumed = self.resume.is_some(),
            "Mounting scroll engine"
        );
        self.page_load()
    }

    /// Queue a full page load replacing the items.
    pub fn page_load(&mut self) -> JobId {
        self.queue_job(JobKind::PageLoad)
    }

    /// Queue loading the next page.
    pub fn load_more(&mut self) -> JobId {
        self.queue_job(JobKind::LoadMore)
    }

    /// Queue loading newer items.
    pub fn load_new(&mut self) -> JobId {
        self.queue_job(JobKind::LoadNew)
    }

    /// Queue a refresh: count the new items, then fetch exactly that many.
    pub fn refresh(&mut self) -> JobId {
        self.queue_job(JobKind::Refresh)
    }

    /// Queue removing an item.
    pub fn remove_item(&mut self, id: T::Id) -> JobId {
        self.queue_job(JobKind::Remove(id))
    }

    /// Manual "load more" affordance.
    pub fn on_more(&mut self) -> JobId {
        self.load_more()
    }

    /// Manual "N new items" affordance.
    pub fn on_new(&mut self) -> JobId {
        self.refresh()
    }

    /// Change the sort order. Resets everything and reloads.
    pub fn set_orderings(&mut self, orderings: Vec<Ordering>) -> JobId {
        self.config.orderings = orderings;
        self.reset()
    }

    /// Change the page size. Resets everything and reloads.
    pub fn set_page_size(&mut self, page_size: usize) -> JobId {
        self.config.page_size = page_size.max(1);
        self.reset()
    }

    /// Drain pending effects. `Rerender` comes last.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        let mut effects = std::mem::take(&mut self.effects);
        if std::mem::take(&mut self.needs_render) {
            effects.push(Effect::Rerender);
        }
        effects
    }

    /// True when effects are waiting.
    pub fn has_effects(&self) -> bool {
        self.needs_render || !self.effects.is_empty()
    }

    /// Move the engine clock forward. Earlier instants are ignored.
    ///
    /// URL updates are throttled against this clock, so a host that never
    /// advances it only ever sees the first update of a burst.
    pub fn advance_clock(&mut self, now: Instant) {
        self.clock = self.clock.max(now);
    }

    /// Current engine time.
    pub fn clock(&self) -> Instant {
        self.clock
    }

    /// Advance the clock and emit a URL update held back by the throttle.
    pub fn flush_url(&mut self, now: Instant) {
        self.advance_clock(now);
        if let Some(params) = self.url.flush(self.clock) {
            self.effects.push(Effect::ReplaceUrl(params));
        }
    }

    /// Begin a pull gesture. Only starts while scrolled to the container top.
    pub fn pull_start(&mut self, y: i64) {
        if self.scroll_y <= self.viewport.container_top {
            self.pull = PullState::start(y);
        }
    }

    /// Follow a pull gesture.
    pub fn pull_move(&mut self, y: i64) {
        let next = self.pull.moved(y);
        if next != self.pull {
            self.pull = next;
            self.needs_render = true;
        }
    }

    /// Release a pull gesture. Queues a refresh when pulled far enough.
    pub fn pull_end(&mut self) -> Option<JobId> {
        let released = std::mem::take(&mut self.pull);
        if released == PullState::Idle {
            return None;
        }
        self.needs_render = true;
        if released.distance() >= self.config.pull_threshold {
            debug!(distance = released.distance(), "Pull released past threshold");
            Some(self.refresh())
        } else {
            None
        }
    }

    /// All loaded items, newest first.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// The rendered slice of the items.
    pub fn rendered_items(&self) -> &[T] {
        &self.items[self.rendered_range()]
    }

    /// Index of the first rendered item. Always on a row boundary.
    pub fn render_start(&self) -> usize {
        self.render_start
    }

    /// Grid columns for the current viewport.
    pub fn items_per_row(&self) -> usize {
        self.items_per_row
    }

    /// Window size: `items_per_row * page_size`.
    pub fn count_rendered(&self) -> usize {
        self.items_per_row * self.config.page_size
    }

    /// Spacer height standing in for the rows above the window.
    pub fn min_height(&self) -> i64 {
        self.min_height
    }

    /// Offset applied to the window on top of the spacer.
    pub fn translate_y(&self) -> i64 {
        self.translate_y
    }

    /// Last scroll position reported by the host.
    pub fn scroll_y(&self) -> i64 {
        self.scroll_y
    }

    /// Current viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Direction of the last scroll.
    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    /// Rendering keys in window slot order.
    pub fn keys(&self) -> &[String] {
        self.keys.as_slice()
    }

    /// Last page info received.
    pub fn page_info(&self) -> Option<&PageInfo> {
        self.cursor.info.as_ref()
    }

    /// Anchor token the pagination offsets are relative to.
    pub fn anchor(&self) -> Option<&str> {
        self.cursor.anchor.as_deref()
    }

    /// Offset of the next `LOAD_MORE` page relative to the anchor.
    pub fn more_offset(&self) -> i64 {
        self.cursor.more_offset
    }

    /// First item on screen and where it was, from the last measurement.
    pub fn first_visible(&self) -> Option<VisibleAnchor> {
        self.first_visible
    }

    /// Index of the last item on screen.
    pub fn last_visible(&self) -> Option<usize> {
        self.last_visible
    }

    /// True while rows revealed by an upward shift wait for measurement.
    pub fn has_pending_relayout(&self) -> bool {
        self.relayout_rows > 0 || self.resize.is_some()
    }

    /// True while the items come from a resumed URL state and newer items
    /// above them have not been loaded yet.
    pub fn loaded_with_query_params(&self) -> bool {
        self.loaded_with_query_params
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current URL state, once an anchor is known.
    pub fn url_params(&self) -> Option<UrlParams> {
        self.cursor.anchor.as_ref().map(|anchor| UrlParams {
            offset: self.render_start as i64,
            offset_relative_to: anchor.clone(),
            min_height: self.min_height,
            translate_y: self.translate_y,
        })
    }

    /// Copy of the state for traces and assertions.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            render_start: self.render_start,
            rendered_len: self.rendered_range().len(),
            items_len: self.items.len(),
            items_per_row: self.items_per_row,
            min_height: self.min_height,
            translate_y: self.translate_y,
            scroll_y: self.scroll_y,
            direction: self.direction,
            relayout_rows: self.relayout_rows,
            in_flight: self.jobs.in_flight().map(|f| f.job.kind.name()),
            queued: self.jobs.pending_len(),
            keys: self.keys.as_slice().to_vec(),
        }
    }

    fn rendered_range(&self) -> Range<usize> {
        let start = self.render_start.min(self.items.len());
        let end = (self.render_start + self.count_rendered()).min(self.items.len());
        start..end
    }

    /// Drop all layout state and re-measure the window at the next commit.
    ///
    /// The scroll position is re-anchored on the first visible item once the
    /// new layout is committed.
    fn begin_relayout(&mut self, prev_items_per_row: usize) {
        self.registry.clear();
        self.min_height = 0;
        self.translate_y = 0;
        self.relayout_rows = 0;
        self.remeasure = true;
        self.resize = Some(PendingResize {
            prev_items_per_row,
            anchor: self.first_visible,
        });
        self.needs_render = true;
    }
}

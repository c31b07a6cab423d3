//! Pagination jobs: dispatch, reconciliation, local removal and reset.
//!
//! # Request shapes
//!
//! | Job        | No anchor yet | Query                                   |
//! |------------|---------------|-----------------------------------------|
//! | `PageLoad` | `PAGE_LOAD`   | resume offset (or 0), one window        |
//! | `LoadMore` | `PAGE_LOAD`   | `LOAD_MORE` at `more_offset`, page fill |
//! | `LoadNew`  | `PAGE_LOAD`   | `LOAD_NEW` at `-n`                      |
//! | `Refresh`  | `PAGE_LOAD`   | count `0/1`, then `LOAD_NEW` for count  |

use super::jobs::{InFlight, Job, JobId, JobKind, JobOutcome, RequestStep};
use super::windowing::snap_down;
use super::{Effect, PageRequest, PendingScroll, ScrollDirection, ScrollEngine};
use crate::model::{EngineError, GatewayError, Identify, Page, PageArgs, PageInfo, QueryType};
use tracing::{debug, info, warn};

impl<T: Identify> ScrollEngine<T> {
    /// Report the gateway result for a [`Effect::Query`].
    ///
    /// Responses for unknown requests are ignored. Responses for requests
    /// sent before a reset are dropped and their job resolves as
    /// [`JobOutcome::Stale`]. Gateway failures are logged and resolve the job
    /// as [`JobOutcome::Failed`] without touching the items.
    ///
    /// # Errors
    ///
    /// [`EngineError::KeyPoolExhausted`] if the merged page breaks the key pool.
    pub fn complete(
        &mut self,
        request: super::RequestId,
        result: Result<Option<Page<T>>, GatewayError>,
    ) -> Result<(), EngineError> {
        let Some(in_flight) = self.jobs.finish(request) else {
            debug!(?request, "Ignoring response for unknown request");
            return Ok(());
        };
        let job_id = in_flight.job.id;

        let outcome = if in_flight.job.generation != self.generation {
            debug!(job = %job_id, "Dropping response from before reset");
            Some(JobOutcome::Stale)
        } else {
            match result {
                Err(err) => {
                    warn!(
                        job = %job_id,
                        query_type = ?in_flight.query_type,
                        %err,
                        "Pagination query failed"
                    );
                    Some(JobOutcome::Failed)
                }
                Ok(None) => {
                    warn!(
                        job = %job_id,
                        query_type = ?in_flight.query_type,
                        "Pagination query returned no page"
                    );
                    Some(JobOutcome::Failed)
                }
                Ok(Some(page)) => self.reconcile(&in_flight, page)?,
            }
        };

        if let Some(outcome) = outcome {
            if outcome == JobOutcome::Failed {
                self.auto_paused = true;
            }
            self.finish_job(job_id, outcome);
        }
        // Loading flags changed either way
        self.needs_render = true;
        self.run_jobs();
        Ok(())
    }

    pub(super) fn queue_job(&mut self, kind: JobKind<T::Id>) -> JobId {
        let name = kind.name();
        let id = self.jobs.push(kind, self.generation);
        debug!(job = %id, kind = name, "Queued job");
        self.run_jobs();
        id
    }

    /// Start queued jobs until one is waiting on the gateway.
    fn run_jobs(&mut self) {
        while let Some(job) = self.jobs.pop_ready() {
            if job.generation != self.generation {
                self.finish_job(job.id, JobOutcome::Stale);
                continue;
            }
            match &job.kind {
                JobKind::Remove(id) => {
                    let id = id.clone();
                    self.remove_now(&id);
                    self.finish_job(job.id, JobOutcome::Completed);
                }
                JobKind::Refresh => self.dispatch(job, RequestStep::RefreshCount),
                _ => self.dispatch(job, RequestStep::Single),
            }
        }
    }

    fn finish_job(&mut self, job: JobId, outcome: JobOutcome) {
        debug!(%job, ?outcome, "Job finished");
        self.effects.push(Effect::JobFinished { job, outcome });
    }

    /// Build the request for a job step and put it in flight.
    fn dispatch(&mut self, job: Job<T::Id>, step: RequestStep) {
        let (query_type, args, step) = if job.kind.is_page_load() || self.cursor.anchor.is_none() {
            let (query_type, args) = self.page_load_request();
            (query_type, args, RequestStep::Single)
        } else {
            let (offset, limit) = match (step, &job.kind) {
                (RequestStep::RefreshCount, _) => (0, 1),
                (RequestStep::RefreshFetch, _) => {
                    let count = self.refresh_count();
                    (-(count as i64), count)
                }
                (_, JobKind::LoadNew) => {
                    let count = self.load_new_count();
                    (-(count as i64), count)
                }
                _ => (self.cursor.more_offset, self.fill_limit()),
            };
            let (query_type, args) = self.classify(offset, limit);
            (query_type, args, step)
        };

        let request = self.jobs.next_request(self.generation);
        debug!(
            job = %job.id,
            ?query_type,
            offset = args.offset,
            limit = args.limit,
            "Sending pagination query"
        );
        self.effects.push(Effect::Query(PageRequest {
            id: request,
            query_type,
            args: args.clone(),
        }));
        self.jobs.start(InFlight {
            job,
            request,
            query_type,
            args,
            step,
        });
        self.needs_render = true;
    }

    fn page_load_request(&self) -> (QueryType, PageArgs) {
        let (offset, anchor) = match &self.resume {
            Some(params) => (params.offset, Some(params.offset_relative_to.clone())),
            None => (0, None),
        };
        let args = self.page_args(offset, self.count_rendered(), anchor);
        (QueryType::PageLoad, args)
    }

    /// Negative offsets ask for newer items.
    fn classify(&self, offset: i64, limit: usize) -> (QueryType, PageArgs) {
        let query_type = if offset < 0 {
            QueryType::LoadNew
        } else {
            QueryType::LoadMore
        };
        let args = self.page_args(offset, limit, self.cursor.anchor.clone());
        (query_type, args)
    }

    fn page_args(&self, offset: i64, limit: usize, anchor: Option<String>) -> PageArgs {
        PageArgs {
            offset,
            limit,
            count_new_limit: self.config.count_new_limit,
            orderings: self.config.orderings.clone(),
            count_loaded: self.items.len(),
            offset_relative_to: anchor,
        }
    }

    /// Enough items to end on a page boundary.
    fn fill_limit(&self) -> usize {
        let page_len = self.count_rendered().max(1);
        page_len - self.items.len() % page_len
    }

    fn load_new_count(&self) -> usize {
        let page_len = self.count_rendered().max(1);
        let known = self.cursor.info.as_ref().map_or(0, |info| info.count_new);
        let count = if known > 0 { known.min(page_len) } else { page_len };
        count.min(self.config.count_new_limit).max(1)
    }

    fn refresh_count(&self) -> usize {
        let known = self.cursor.info.as_ref().map_or(0, |info| info.count_new);
        known.min(self.config.count_new_limit).max(1)
    }

    /// Merge a successful response. `None` when the job continues with a
    /// follow-up request.
    fn reconcile(
        &mut self,
        in_flight: &InFlight<T::Id>,
        page: Page<T>,
    ) -> Result<Option<JobOutcome>, EngineError> {
        if in_flight.step == RequestStep::RefreshCount {
            let has_new = page.info.has_new && page.info.count_new > 0;
            if let Some(info) = self.cursor.info.as_mut() {
                info.has_new = page.info.has_new;
                info.count_new = page.info.count_new;
            }
            debug!(count_new = page.info.count_new, "Refresh count answered");
            if has_new {
                self.dispatch(in_flight.job.clone(), RequestStep::RefreshFetch);
                return Ok(None);
            }
            return Ok(Some(JobOutcome::Completed));
        }

        match in_flight.query_type {
            QueryType::PageLoad => self.apply_page_load(page)?,
            QueryType::LoadMore => self.apply_load_more(&in_flight.args, page),
            QueryType::LoadNew => self.apply_load_new(page),
        }
        Ok(Some(JobOutcome::Completed))
    }

    fn apply_page_load(&mut self, page: Page<T>) -> Result<(), EngineError> {
        let resumed = self.resume.take();
        let Page { nodes, info } = page;
        info!(
            items = nodes.len(),
            has_more = info.has_more,
            resumed = resumed.is_some(),
            "Page loaded"
        );

        self.items = nodes;
        self.render_start = 0;
        self.keys.regenerate(self.count_rendered());
        self.keys.ensure_covers(self.rendered_range().len())?;
        self.registry.clear();
        self.mounted_batch.clear();
        self.relayout_rows = 0;
        self.remeasure = false;
        self.resize = None;
        self.first_visible = None;
        self.last_visible = None;

        self.cursor.anchor = Some(info.next_offset_relative_to.clone()).filter(|a| !a.is_empty());
        self.cursor.more_offset = info.more_offset;
        self.cursor.info = Some(info);
        self.direction = ScrollDirection::Down;
        self.pending_scroll = PendingScroll::default();

        match resumed {
            Some(params) => {
                self.min_height = params.min_height.max(0);
                self.translate_y = params.translate_y.min(0);
                self.loaded_with_query_params = true;
            }
            None => {
                self.min_height = 0;
                self.translate_y = 0;
                self.loaded_with_query_params = false;
                let container_top = self.viewport.container_top;
                if self.scroll_y > container_top {
                    self.pending_scroll.base = Some(container_top);
                }
            }
        }
        self.needs_render = true;
        Ok(())
    }

    /// Append, skipping the part of the response already known.
    pub(super) fn apply_load_more(&mut self, args: &PageArgs, page: Page<T>) {
        let skip = (self.cursor.more_offset - args.offset).max(0) as usize;
        let received = page.nodes.len();
        let before = self.items.len();
        self.items.extend(page.nodes.into_iter().skip(skip));

        self.cursor.more_offset = self.cursor.more_offset.max(page.info.more_offset);
        self.cursor.info = Some(page.info);
        self.direction = ScrollDirection::Down;
        self.needs_render = true;
        debug!(
            received,
            skipped = skip.min(received),
            appended = self.items.len() - before,
            more_offset = self.cursor.more_offset,
            "Loaded more"
        );
    }

    /// Prepend, keeping the same logical items rendered.
    fn apply_load_new(&mut self, page: Page<T>) {
        let Page { nodes, info } = page;
        let added = nodes.len();
        let mut items = nodes;
        items.append(&mut self.items);
        self.items = items;

        if !info.next_offset_relative_to.is_empty() {
            self.cursor.anchor = Some(info.next_offset_relative_to.clone());
        }
        self.cursor.more_offset += added as i64;
        let info = match self.cursor.info.take() {
            Some(previous) => PageInfo {
                has_new: info.has_new,
                count_new: info.count_new,
                next_offset_relative_to: info.next_offset_relative_to,
                ..previous
            },
            None => info,
        };
        if !info.has_new {
            self.loaded_with_query_params = false;
        }
        self.cursor.info = Some(info);
        self.direction = ScrollDirection::Up;

        let logical = self.render_start + added;
        self.realign_window(logical);
        if let Some(anchor) = self.first_visible.as_mut() {
            anchor.index += added;
        }
        if let Some(last) = self.last_visible.as_mut() {
            *last += added;
        }
        self.needs_render = true;
        debug!(added, render_start = self.render_start, "Loaded new");
    }

    /// Point the window at `logical`, snapped to the row grid, keeping keys.
    ///
    /// Snapping changes the column of every rendered item, which needs a
    /// full relayout.
    fn realign_window(&mut self, logical: usize) {
        let snapped = snap_down(logical, self.items_per_row);
        self.render_start = snapped;
        self.keys.rotate(snapped as i64 - logical as i64);
        if snapped != logical {
            self.begin_relayout(self.items_per_row);
        }
    }

    /// Remove an item locally, keeping the same logical window.
    fn remove_now(&mut self, id: &T::Id) {
        let Some(index) = self.items.iter().position(|item| item.item_id() == *id) else {
            debug!(?id, "Nothing to remove");
            return;
        };
        let rect = self.registry.remove(id);
        let window = self.rendered_range();
        self.items.remove(index);
        self.cursor.more_offset -= 1;
        self.mounted_batch.retain(|pending| pending != id);

        if index < self.render_start {
            self.realign_window(self.render_start - 1);
        } else if window.contains(&index) {
            self.keys.retire(index - self.render_start);
            if self.items_per_row > 1 {
                self.remeasure = true;
            } else if self.first_visible.is_some_and(|anchor| index < anchor.index) {
                // Scrolled past: everything on screen moves up by the removed row
                let height = rect.map_or(0, |r| r.height);
                self.pending_scroll.delta -= height + self.config.row_gap;
            }
        }

        if let Some(anchor) = self.first_visible {
            if anchor.index > index {
                self.first_visible = Some(super::VisibleAnchor {
                    index: anchor.index - 1,
                    ..anchor
                });
            } else if anchor.index == index {
                self.first_visible = None;
            }
        }
        if let Some(last) = self.last_visible {
            if last >= index {
                self.last_visible = last.checked_sub(1);
            }
        }
        self.needs_render = true;
        debug!(index, items = self.items.len(), "Removed item");
    }

    /// Drop everything and reload. Queued jobs resolve as stale; a request
    /// already in flight is dropped when its response arrives.
    pub(super) fn reset(&mut self) -> JobId {
        self.generation += 1;
        info!(generation = self.generation, "Resetting scroll engine");
        for job in self.jobs.drain_pending() {
            self.finish_job(job.id, JobOutcome::Stale);
        }

        self.items.clear();
        self.render_start = 0;
        self.keys.regenerate(self.count_rendered());
        self.registry.clear();
        self.mounted_batch.clear();
        self.min_height = 0;
        self.translate_y = 0;
        self.relayout_rows = 0;
        self.remeasure = false;
        self.resize = None;
        self.first_visible = None;
        self.last_visible = None;
        self.direction = ScrollDirection::Down;
        self.pending_scroll = PendingScroll::default();
        self.cursor = super::Cursor::default();
        self.resume = None;
        self.loaded_with_query_params = false;
        self.auto_paused = false;
        self.url.clear();
        self.needs_render = true;

        self.queue_job(JobKind::PageLoad)
    }
}

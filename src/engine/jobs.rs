//! Pagination job queue.
//!
//! Jobs run strictly in FIFO order and at most one network request is in
//! flight. Local jobs (`Remove`) run inline when they reach the front.

use crate::model::{PageArgs, QueryType};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Handle returned when a job is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Work a job performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind<Id> {
    /// Replace the items with the first page (or the resumed page).
    PageLoad,
    /// Append the next page.
    LoadMore,
    /// Prepend newer items.
    LoadNew,
    /// Count the new items, then fetch exactly that many.
    Refresh,
    /// Drop one item locally.
    Remove(Id),
}

impl<Id> JobKind<Id> {
    /// Short name for logs and snapshots.
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::PageLoad => "page_load",
            JobKind::LoadMore => "load_more",
            JobKind::LoadNew => "load_new",
            JobKind::Refresh => "refresh",
            JobKind::Remove(_) => "remove",
        }
    }

    /// True for [`JobKind::PageLoad`].
    pub fn is_page_load(&self) -> bool {
        matches!(self, JobKind::PageLoad)
    }

    /// True for [`JobKind::LoadMore`].
    pub fn is_load_more(&self) -> bool {
        matches!(self, JobKind::LoadMore)
    }

    /// True for jobs that prepend newer items.
    pub fn fetches_new(&self) -> bool {
        matches!(self, JobKind::LoadNew | JobKind::Refresh)
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    /// The response was merged (or the local job ran).
    Completed,
    /// The gateway failed or returned nothing. Items are unchanged.
    Failed,
    /// A reset superseded the job; its response, if any, was dropped.
    Stale,
}

/// Identity of a request sent to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId {
    /// Engine generation the request belongs to.
    pub generation: u64,
    /// Sequence number within the engine's lifetime.
    pub seq: u64,
}

/// A queued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job<Id> {
    /// Handle given out when the job was queued.
    pub id: JobId,
    /// What the job does.
    pub kind: JobKind<Id>,
    /// Engine generation at queue time. Older generations are stale.
    pub generation: u64,
}

/// Step of the job whose request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStep {
    /// The only request of the job.
    Single,
    /// First half of a refresh: learn `count_new`.
    RefreshCount,
    /// Second half of a refresh: fetch the new items.
    RefreshFetch,
}

/// The single request currently awaiting a response.
#[derive(Debug, Clone)]
pub struct InFlight<Id> {
    /// Job the request serves.
    pub job: Job<Id>,
    /// Id the response must carry.
    pub request: RequestId,
    /// Query type sent.
    pub query_type: QueryType,
    /// Arguments sent.
    pub args: PageArgs,
    /// Which request of the job this is.
    pub step: RequestStep,
}

/// FIFO of pending jobs plus the in-flight slot.
#[derive(Debug)]
pub struct JobQueue<Id> {
    pending: VecDeque<Job<Id>>,
    in_flight: Option<InFlight<Id>>,
    next_job: u64,
    next_seq: u64,
}

impl<Id> Default for JobQueue<Id> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: None,
            next_job: 0,
            next_seq: 0,
        }
    }
}

impl<Id: Clone + PartialEq> JobQueue<Id> {
    /// Append a job and return its handle.
    pub fn push(&mut self, kind: JobKind<Id>, generation: u64) -> JobId {
        self.next_job += 1;
        let id = JobId(self.next_job);
        self.pending.push_back(Job {
            id,
            kind,
            generation,
        });
        id
    }

    /// Take the next job if no request is in flight.
    pub fn pop_ready(&mut self) -> Option<Job<Id>> {
        if self.in_flight.is_some() {
            return None;
        }
        self.pending.pop_front()
    }

    /// Allocate a request id.
    pub fn next_request(&mut self, generation: u64) -> RequestId {
        self.next_seq += 1;
        RequestId {
            generation,
            seq: self.next_seq,
        }
    }

    /// Occupy the in-flight slot.
    pub fn start(&mut self, in_flight: InFlight<Id>) {
        debug_assert!(self.in_flight.is_none(), "second request in flight");
        self.in_flight = Some(in_flight);
    }

    /// Release the in-flight slot if `request` matches it.
    pub fn finish(&mut self, request: RequestId) -> Option<InFlight<Id>> {
        match &self.in_flight {
            Some(current) if current.request == request => self.in_flight.take(),
            _ => None,
        }
    }

    /// Drop every queued job, returning them for outcome reporting.
    pub fn drain_pending(&mut self) -> Vec<Job<Id>> {
        self.pending.drain(..).collect()
    }

    /// The in-flight request, if any.
    pub fn in_flight(&self) -> Option<&InFlight<Id>> {
        self.in_flight.as_ref()
    }

    /// Number of jobs waiting behind the in-flight one.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True if a job matching `pred` is queued or in flight.
    pub fn any(&self, pred: impl Fn(&JobKind<Id>) -> bool) -> bool {
        self.in_flight.iter().any(|f| pred(&f.job.kind))
            || self.pending.iter().any(|j| pred(&j.kind))
    }
}

//! Pagination wire types exchanged with a [`PaginationGateway`](crate::gateway::PaginationGateway).

use serde::{Deserialize, Serialize};

/// Sort direction of one ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// One ordering clause passed through to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ordering {
    /// Name of the server-side index to sort by.
    pub index: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl Ordering {
    /// Create an ordering clause.
    pub fn new(index: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            index: index.into(),
            direction,
        }
    }
}

/// Kind of pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    /// Initial load: replaces the items wholesale.
    PageLoad,
    /// Forward pagination: appends at the tail.
    LoadMore,
    /// Backward pagination: prepends newer items.
    LoadNew,
}

/// Arguments of a pagination query.
///
/// `offset` is relative to the item identified by `offset_relative_to`
/// (or to the top of the sequence when no anchor is set). A negative offset
/// asks for items newer than the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageArgs {
    /// First requested position relative to the anchor.
    pub offset: i64,
    /// Maximum number of nodes to return.
    pub limit: usize,
    /// Upper bound for the server's `count_new` computation.
    pub count_new_limit: usize,
    /// Ordering clauses.
    pub orderings: Vec<Ordering>,
    /// Number of items the engine currently holds.
    pub count_loaded: usize,
    /// Opaque anchor token issued by the server.
    pub offset_relative_to: Option<String>,
}

/// Page metadata returned with every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// More items exist after the returned range.
    pub has_more: bool,
    /// Newer items exist before the returned anchor.
    pub has_new: bool,
    /// Number of newer items, capped by `count_new_limit`.
    pub count_new: usize,
    /// Offset of the next unseen item, relative to `next_offset_relative_to`.
    pub more_offset: i64,
    /// Anchor token subsequent requests should be relative to.
    pub next_offset_relative_to: String,
}

/// A page of items plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Returned items, in ascending logical order.
    pub nodes: Vec<T>,
    /// Page metadata.
    pub info: PageInfo,
}

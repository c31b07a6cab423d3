//! Pagination gateway abstraction.
//!
//! The engine never talks to a backend itself. It emits queries that a host
//! runs against a [`PaginationGateway`] and feeds the result back.

pub mod memory;

pub use memory::MemoryGateway;

use crate::model::{GatewayError, Page, PageArgs, QueryType};

/// Backend answering cursor-relative page queries.
///
/// `Ok(None)` means the backend answered without a page; the engine treats
/// it like a failure and leaves its items untouched.
pub trait PaginationGateway<T> {
    /// Fetch one page.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the backend cannot be reached or
    /// rejects the request.
    fn query(&mut self, args: &PageArgs, query_type: QueryType)
        -> Result<Option<Page<T>>, GatewayError>;
}

//! In-memory pagination gateway.
//!
//! Serves pages from a `Vec` using item ids as anchor tokens. Newest items
//! are at the front: [`MemoryGateway::prepend`] simulates items arriving
//! while the list is open.

use super::PaginationGateway;
use crate::model::{GatewayError, Identify, Page, PageArgs, PageInfo, QueryType};
use std::fmt::Display;
use tracing::trace;

/// Gateway over an in-memory sequence.
#[derive(Debug, Clone)]
pub struct MemoryGateway<T> {
    items: Vec<T>,
    fail_next: usize,
    calls: Vec<(QueryType, PageArgs)>,
}

impl<T> MemoryGateway<T>
where
    T: Identify + Clone,
    T::Id: Display,
{
    /// Serve `items`, newest first.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            fail_next: 0,
            calls: Vec::new(),
        }
    }

    /// Add newer items in front of everything served so far.
    pub fn prepend(&mut self, items: impl IntoIterator<Item = T>) {
        let mut front: Vec<T> = items.into_iter().collect();
        front.append(&mut self.items);
        self.items = front;
    }

    /// Remove an item from the backing sequence.
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let position = self.items.iter().position(|item| item.item_id() == *id)?;
        Some(self.items.remove(position))
    }

    /// Fail the next `count` queries with a transport error.
    pub fn fail_next(&mut self, count: usize) {
        self.fail_next = count;
    }

    /// Every query received, in order.
    pub fn calls(&self) -> &[(QueryType, PageArgs)] {
        &self.calls
    }

    /// The backing sequence.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    fn token(item: &T) -> String {
        item.item_id().to_string()
    }

    fn position_of(&self, token: &str) -> Option<usize> {
        self.items.iter().position(|item| Self::token(item) == token)
    }
}

impl<T> PaginationGateway<T> for MemoryGateway<T>
where
    T: Identify + Clone,
    T::Id: Display,
{
    fn query(
        &mut self,
        args: &PageArgs,
        query_type: QueryType,
    ) -> Result<Option<Page<T>>, GatewayError> {
        self.calls.push((query_type, args.clone()));
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(GatewayError::Transport("injected failure".to_string()));
        }

        let anchor = match &args.offset_relative_to {
            None => 0,
            Some(token) => self.position_of(token).ok_or_else(|| {
                GatewayError::InvalidResponse(format!("unknown anchor token {token}"))
            })?,
        };

        let len = self.items.len() as i64;
        let from = anchor as i64 + args.offset;
        let start = from.clamp(0, len) as usize;
        let end = (from + args.limit as i64).clamp(0, len) as usize;
        let nodes = self.items[start..end.max(start)].to_vec();

        let next_anchor = match query_type {
            QueryType::PageLoad | QueryType::LoadNew if !nodes.is_empty() => start,
            _ => anchor,
        };
        let next_offset_relative_to = self
            .items
            .get(next_anchor)
            .map(Self::token)
            .or_else(|| args.offset_relative_to.clone())
            .unwrap_or_default();
        let count_new = next_anchor.min(args.count_new_limit);

        trace!(
            ?query_type,
            start,
            end,
            next_anchor,
            "Serving page from memory"
        );

        Ok(Some(Page {
            nodes,
            info: PageInfo {
                has_more: end < self.items.len(),
                has_new: count_new > 0,
                count_new,
                more_offset: end as i64 - next_anchor as i64,
                next_offset_relative_to,
            },
        }))
    }
}

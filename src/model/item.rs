//! Item identity.

use std::fmt::Debug;
use std::hash::Hash;

/// Caller-supplied identity for list items.
///
/// The engine treats items as opaque records; the id is the only thing it
/// extracts from them. It keys the mounted-item registry and `remove_item`.
pub trait Identify {
    /// Stable identifier of an item.
    type Id: Clone + Eq + Hash + Debug;

    /// Returns the identifier of this item.
    fn item_id(&self) -> Self::Id;
}

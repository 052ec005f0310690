use crate::{Collection, Item, Result, StoreQuery};
use std::future::Future;

/// A backing store for items and collections.
///
/// Stores are cheap to clone and shared across requests. A store must return
/// the rows of a [StoreQuery] in exactly its order, starting strictly after
/// its seek position, and no more than its limit. Missing or null sort values
/// order after every other value when ascending.
pub trait Store: Clone + Send + Sync + 'static {
    /// Runs a translated search query.
    fn search(&self, query: &StoreQuery) -> impl Future<Output = Result<Vec<Item>>> + Send;

    /// Returns a single item, or `None` if there is no such item in that collection.
    fn item(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> impl Future<Output = Result<Option<Item>>> + Send;

    /// Returns a single collection, or `None` if it doesn't exist.
    fn collection(&self, id: &str) -> impl Future<Output = Result<Option<Collection>>> + Send;

    /// Returns all collections.
    fn collections(&self) -> impl Future<Output = Result<Vec<Collection>>> + Send;
}

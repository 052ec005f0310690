use crate::{Collection, Error, Item, Paging, Result, Store, StoreQuery};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A page of search results.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Page {
    /// The records of this page, in display order.
    pub items: Vec<Item>,

    /// The token for the next page, if there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// The token for the previous page, if there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,

    /// The page size that was asked for.
    pub limit: u64,
}

/// Runs a store query and builds a page with pagination tokens.
///
/// The store is asked for one more row than the page size; if it comes back,
/// there's another page in the query's direction.
///
/// On a forward page, `next` is set when the extra row exists, and `prev`
/// is set when the request carried a token. With `exact_prev`, a one-row
/// backward probe decides `prev` instead. On a backward page, `prev` is set
/// when the extra row exists and `next` is always set.
///
/// # Examples
///
/// ```
/// use stac_search::{Config, MemoryStore, Search, translate, execute};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let config = Config::default();
/// let request = Search::new().into_request(&config).unwrap();
/// let query = translate(&request, &config.extensions).unwrap();
/// let page = execute(&store, &query, false).await.unwrap();
/// assert!(page.items.is_empty());
/// assert!(page.next.is_none());
/// # })
/// ```
pub async fn execute<S: Store>(store: &S, query: &StoreQuery, exact_prev: bool) -> Result<Page> {
    let mut items = store.search(query).await?;
    let page_size = usize::try_from(query.page_size).unwrap_or(usize::MAX);
    let has_more = items.len() > page_size;
    items.truncate(page_size);
    debug!(
        returned = items.len(),
        has_more,
        paging = ?query.paging,
        "executed search"
    );

    let (next, prev) = match query.paging {
        Some(Paging::Prev) => {
            items.reverse();
            let next = items.last().map(|item| query.cursor(item, Paging::Next));
            let prev = items
                .first()
                .filter(|_| has_more)
                .map(|item| query.cursor(item, Paging::Prev));
            (next, prev)
        }
        paging => {
            let next = items
                .last()
                .filter(|_| has_more)
                .map(|item| query.cursor(item, Paging::Next));
            let prev = match (paging, items.first()) {
                (Some(_), Some(first)) => {
                    if exact_prev {
                        let probe = query.probe_before(first);
                        let before = store.search(&probe).await?;
                        (!before.is_empty()).then(|| query.cursor(first, Paging::Prev))
                    } else {
                        Some(query.cursor(first, Paging::Prev))
                    }
                }
                _ => None,
            };
            (next, prev)
        }
    };

    Ok(Page {
        items,
        next: next.map(|cursor| cursor.encode()),
        prev: prev.map(|cursor| cursor.encode()),
        limit: query.page_size,
    })
}

/// Fetches one item by id.
///
/// Returns [Error::ItemNotFound] if the store doesn't have it.
pub async fn item<S: Store>(store: &S, collection_id: &str, item_id: &str) -> Result<Item> {
    store
        .item(collection_id, item_id)
        .await?
        .ok_or_else(|| Error::ItemNotFound {
            collection_id: collection_id.to_string(),
            item_id: item_id.to_string(),
        })
}

/// Fetches one collection by id.
///
/// Returns [Error::CollectionNotFound] if the store doesn't have it.
pub async fn collection<S: Store>(store: &S, id: &str) -> Result<Collection> {
    store
        .collection(id)
        .await?
        .ok_or_else(|| Error::CollectionNotFound(id.to_string()))
}

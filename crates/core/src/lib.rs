//! Search translation and seek pagination for [STAC
//! API](https://github.com/radiantearth/stac-api-spec) servers.
//!
//! This crate **is**:
//!
//! - The request model for item search ([Search], [GetSearch], [SearchRequest])
//! - A translator from that model into a store-agnostic [StoreQuery]
//! - An executor that runs a [StoreQuery] against a [Store] and builds a [Page]
//!   with opaque, stateless pagination tokens
//! - A projector that applies the fields extension and attaches hypermedia links
//!
//! This crate **is not**:
//!
//! - An HTTP server. See `stac-search-server`.
//! - A database driver. See `stac-search-postgres`.
//!
//! # Searching
//!
//! ```
//! use stac_search::{Config, MemoryStore, Search, translate, execute};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! for id in ["a", "b", "c"] {
//!     let item = json!({
//!         "type": "Feature",
//!         "id": id,
//!         "collection": "c1",
//!         "geometry": null,
//!         "properties": {"datetime": "2023-01-01T00:00:00Z"},
//!         "links": [],
//!         "assets": {},
//!     });
//!     store.add_item(item.as_object().unwrap().clone()).unwrap();
//! }
//! let config = Config::default();
//! let request = Search::new().limit(2).into_request(&config).unwrap();
//! let query = translate(&request, &config.extensions).unwrap();
//! let page = execute(&store, &query, config.exact_prev).await.unwrap();
//! assert_eq!(page.items.len(), 2);
//! assert!(page.next.is_some());
//! assert!(page.prev.is_none());
//! # })
//! ```

#![warn(missing_docs, unused_qualifications)]

mod bbox;
mod config;
mod datetime;
mod error;
mod fields;
mod item_collection;
mod link;
mod memory;
mod page;
mod project;
mod query;
mod search;
mod sort;
mod store;
mod token;
mod translate;
mod url_builder;

pub use bbox::Bbox;
pub use config::{Config, DEFAULT_LIMIT, Extensions, MAX_LIMIT};
pub use datetime::{Interval, parse_rfc3339};
pub use error::{BoxError, Error, ErrorKind};
pub use fields::Fields;
pub use item_collection::{Context, ItemCollection};
pub use link::{GEOJSON, JSON, Link, PageRequest};
pub use memory::MemoryStore;
pub use page::{Page, collection, execute, item};
pub use project::{project_collection, project_item, project_page};
pub use query::{Comparison, Operator, Query};
pub use search::{GetItems, GetSearch, Search, SearchRequest};
pub use sort::{Direction, Sortby, compare_values};
pub use store::Store;
pub use token::{Cursor, Paging};
pub use translate::{Field, Order, Predicate, Seek, StoreQuery, translate};
pub use url_builder::UrlBuilder;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A STAC item, as a JSON object.
///
/// Items are never deserialized into a fixed structure because the fields
/// extension can remove any of their members.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// A STAC collection, as a JSON object.
pub type Collection = serde_json::Map<String, serde_json::Value>;

/// The STAC version written into generated documents.
pub const STAC_VERSION: &str = "1.0.0";

/// Return this crate's version.
///
/// # Examples
///
/// ```
/// println!("{}", stac_search::version());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

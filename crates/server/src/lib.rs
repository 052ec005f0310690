//! Serve a [STAC API](https://github.com/radiantearth/stac-api-spec) from any
//! [stac_search::Store].
//!
//! [Api] runs searches and builds responses; [routes::from_api] wraps it in
//! an [axum::Router].
//!
//! # Examples
//!
//! ```
//! use stac_search::MemoryStore;
//! use stac_search_server::{Api, routes};
//!
//! let api = Api::new(MemoryStore::new(), "http://localhost:7822").unwrap();
//! let router = routes::from_api(api);
//! ```

#![warn(missing_docs, unused_qualifications)]

mod api;
mod error;
pub mod routes;

pub use {
    api::{
        Api, COLLECTIONS_URI, CONTEXT_URI, CORE_URI, Collections, Conformance, FEATURES_URI,
        FIELDS_URIS, GEOJSON_URI, ITEM_SEARCH_URI, OGC_API_FEATURES_URI, QUERY_URIS, Root,
        SORT_URIS,
    },
    error::{Error, ErrorResponse},
};

/// The default address to serve on.
pub const DEFAULT_ADDR: &str = "127.0.0.1:7822";

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;

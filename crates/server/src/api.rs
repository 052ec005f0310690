use crate::Result;
use serde::Serialize;
use serde_json::Value;
use stac_search::{
    Collection, Config, Fields, GetItems, Item, ItemCollection, Link, PageRequest, STAC_VERSION,
    Search, Store, UrlBuilder, execute, project_collection, project_item, project_page,
    translate,
};
use url::Url;

/// The core conformance uri.
pub const CORE_URI: &str = "https://api.stacspec.org/v1.0.0/core";

/// The collections conformance uri.
pub const COLLECTIONS_URI: &str = "https://api.stacspec.org/v1.0.0/collections";

/// The STAC features conformance uri.
pub const OGC_API_FEATURES_URI: &str = "https://api.stacspec.org/v1.0.0/ogcapi-features";

/// The OGC API features core conformance uri.
pub const FEATURES_URI: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/core";

/// The GeoJSON conformance uri.
pub const GEOJSON_URI: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/geojson";

/// The item search conformance uri.
pub const ITEM_SEARCH_URI: &str = "https://api.stacspec.org/v1.0.0/item-search";

/// The query extension conformance uris.
pub const QUERY_URIS: [&str; 2] = [
    "https://api.stacspec.org/v1.0.0-rc.1/item-search#query",
    "https://api.stacspec.org/v1.0.0-rc.1/ogcapi-features#query",
];

/// The sort extension conformance uris.
pub const SORT_URIS: [&str; 2] = [
    "https://api.stacspec.org/v1.0.0/item-search#sort",
    "https://api.stacspec.org/v1.0.0/ogcapi-features#sort",
];

/// The fields extension conformance uris.
pub const FIELDS_URIS: [&str; 2] = [
    "https://api.stacspec.org/v1.0.0/item-search#fields",
    "https://api.stacspec.org/v1.0.0/ogcapi-features#fields",
];

/// The context extension conformance uri.
pub const CONTEXT_URI: &str = "https://api.stacspec.org/v1.0.0-rc.2/item-search#context";

/// A STAC API over a [Store].
#[derive(Clone, Debug)]
pub struct Api<S: Store> {
    /// The store.
    pub store: S,

    /// Search configuration.
    pub config: Config,

    /// The id of the landing page.
    pub id: String,

    /// The description of the landing page.
    pub description: String,

    /// Builds this API's URLs.
    pub url_builder: UrlBuilder,
}

/// The landing page.
#[derive(Debug, Clone, Serialize)]
pub struct Root {
    r#type: &'static str,

    /// The catalog id.
    pub id: String,

    /// The catalog description.
    pub description: String,

    /// The STAC version.
    pub stac_version: &'static str,

    /// The conformance classes.
    #[serde(rename = "conformsTo")]
    pub conforms_to: Vec<String>,

    /// Links to the API's endpoints and collections.
    pub links: Vec<Link>,
}

/// The conformance classes of the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conformance {
    /// The conformance class uris.
    #[serde(rename = "conformsTo")]
    pub conforms_to: Vec<String>,
}

/// All of the API's collections.
#[derive(Debug, Clone, Serialize)]
pub struct Collections {
    /// The collections.
    pub collections: Vec<Collection>,

    /// Links.
    pub links: Vec<Link>,
}

impl<S: Store> Api<S> {
    /// Creates a new API rooted at this url.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::MemoryStore;
    /// use stac_search_server::Api;
    ///
    /// let api = Api::new(MemoryStore::new(), "http://stac.test").unwrap();
    /// ```
    pub fn new(store: S, root: &str) -> Result<Api<S>> {
        Ok(Api {
            store,
            config: Config::default(),
            id: "stac-search".to_string(),
            description: "A STAC API".to_string(),
            url_builder: UrlBuilder::new(root)?,
        })
    }

    /// Sets this API's search configuration.
    pub fn config(mut self, config: Config) -> Api<S> {
        self.config = config;
        self
    }

    /// Sets this API's id.
    pub fn id(mut self, id: impl ToString) -> Api<S> {
        self.id = id.to_string();
        self
    }

    /// Sets this API's description.
    pub fn description(mut self, description: impl ToString) -> Api<S> {
        self.description = description.to_string();
        self
    }

    /// Returns the landing page.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::MemoryStore;
    /// use stac_search_server::Api;
    ///
    /// let api = Api::new(MemoryStore::new(), "http://stac.test").unwrap();
    /// # tokio_test::block_on(async {
    /// let root = api.root().await.unwrap();
    /// assert!(root.links.iter().any(|link| link.rel == "search"));
    /// # })
    /// ```
    pub async fn root(&self) -> Result<Root> {
        let url_builder = &self.url_builder;
        let mut links = vec![
            Link::new(url_builder.root(), "self").json(),
            Link::new(url_builder.root(), "root").json(),
            Link::new(url_builder.conformance(), "conformance")
                .json()
                .title("Conformance classes implemented by this API"),
            Link::new(url_builder.collections(), "data").json(),
            Link::new(url_builder.search(), "search")
                .geojson()
                .title("STAC search")
                .method("GET"),
            Link::new(url_builder.search(), "search")
                .geojson()
                .title("STAC search")
                .method("POST"),
        ];
        for collection in self.store.collections().await? {
            if let Some(id) = collection.get("id").and_then(Value::as_str) {
                let mut link = Link::new(url_builder.collection(id), "child").json();
                if let Some(title) = collection.get("title").and_then(Value::as_str) {
                    link = link.title(title);
                }
                links.push(link);
            }
        }
        Ok(Root {
            r#type: "Catalog",
            id: self.id.clone(),
            description: self.description.clone(),
            stac_version: STAC_VERSION,
            conforms_to: self.conformance().conforms_to,
            links,
        })
    }

    /// Returns the conformance classes.
    ///
    /// Extension classes are only listed if the extension is enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{Config, Extensions, MemoryStore};
    /// use stac_search_server::{Api, CORE_URI, CONTEXT_URI};
    ///
    /// let api = Api::new(MemoryStore::new(), "http://stac.test").unwrap();
    /// assert!(api.conformance().conforms_to.contains(&CONTEXT_URI.to_string()));
    ///
    /// let config = Config { extensions: Extensions::none(), ..Default::default() };
    /// let api = api.config(config);
    /// let conformance = api.conformance();
    /// assert!(conformance.conforms_to.contains(&CORE_URI.to_string()));
    /// assert!(!conformance.conforms_to.contains(&CONTEXT_URI.to_string()));
    /// ```
    pub fn conformance(&self) -> Conformance {
        let mut conforms_to: Vec<String> = [
            CORE_URI,
            COLLECTIONS_URI,
            OGC_API_FEATURES_URI,
            FEATURES_URI,
            GEOJSON_URI,
            ITEM_SEARCH_URI,
        ]
        .into_iter()
        .map(String::from)
        .collect();
        let extensions = &self.config.extensions;
        if extensions.query {
            conforms_to.extend(QUERY_URIS.into_iter().map(String::from));
        }
        if extensions.sort {
            conforms_to.extend(SORT_URIS.into_iter().map(String::from));
        }
        if extensions.fields {
            conforms_to.extend(FIELDS_URIS.into_iter().map(String::from));
        }
        if extensions.context {
            conforms_to.push(CONTEXT_URI.to_string());
        }
        Conformance { conforms_to }
    }

    /// Returns all collections.
    pub async fn collections(&self) -> Result<Collections> {
        let collections = self
            .store
            .collections()
            .await?
            .into_iter()
            .map(|collection| project_collection(collection, &self.url_builder))
            .collect();
        let url_builder = &self.url_builder;
        Ok(Collections {
            collections,
            links: vec![
                Link::new(url_builder.collections(), "self").json(),
                Link::new(url_builder.root(), "root").json(),
                Link::new(url_builder.root(), "parent").json(),
            ],
        })
    }

    /// Returns one collection.
    pub async fn collection(&self, id: &str) -> Result<Collection> {
        let collection = stac_search::collection(&self.store, id).await?;
        Ok(project_collection(collection, &self.url_builder))
    }

    /// Searches one collection's items.
    ///
    /// `url` is the full request url, used for the page's `self` and
    /// pagination links.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{GetItems, MemoryStore};
    /// use stac_search_server::Api;
    /// use serde_json::json;
    ///
    /// let store = MemoryStore::new();
    /// store.add_collection(json!({"type": "Collection", "id": "c1"}).as_object().unwrap().clone()).unwrap();
    /// let api = Api::new(store, "http://stac.test").unwrap();
    /// # tokio_test::block_on(async {
    /// let url = "http://stac.test/collections/c1/items".parse().unwrap();
    /// let items = api.items("c1", GetItems::default(), url).await.unwrap();
    /// assert!(items.items.is_empty());
    /// assert!(items.link("collection").is_some());
    /// # })
    /// ```
    pub async fn items(
        &self,
        collection_id: &str,
        items: GetItems,
        url: Url,
    ) -> Result<ItemCollection> {
        let _ = stac_search::collection(&self.store, collection_id).await?;
        let search = items.search_collection(collection_id)?;
        let mut item_collection = self.search(search, PageRequest::Get(url)).await?;
        let href = self.url_builder.collection(collection_id);
        item_collection
            .links
            .push(Link::new(&href, "collection").json());
        item_collection.links.push(Link::new(&href, "parent").json());
        Ok(item_collection)
    }

    /// Returns one item.
    pub async fn item(&self, collection_id: &str, item_id: &str) -> Result<Item> {
        let item = stac_search::item(&self.store, collection_id, item_id).await?;
        Ok(project_item(item, &Fields::default(), &self.url_builder))
    }

    /// Runs a search and returns one page of items.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{MemoryStore, PageRequest, Search};
    /// use stac_search_server::Api;
    ///
    /// let api = Api::new(MemoryStore::new(), "http://stac.test").unwrap();
    /// # tokio_test::block_on(async {
    /// let request = PageRequest::Get(api.url_builder.search().clone());
    /// let item_collection = api.search(Search::new(), request).await.unwrap();
    /// assert_eq!(item_collection.number_returned, 0);
    /// # })
    /// ```
    pub async fn search(&self, search: Search, request: PageRequest) -> Result<ItemCollection> {
        let search_request = search.into_request(&self.config)?;
        let query = translate(&search_request, &self.config.extensions)?;
        let page = execute(&self.store, &query, self.config.exact_prev).await?;
        Ok(project_page(
            page,
            &search_request.fields,
            &request,
            &self.url_builder,
            self.config.extensions.context,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::Api;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use stac_search::{Config, Extensions, GetItems, Item, MemoryStore, PageRequest, Search};

    fn item(id: &str) -> Item {
        json!({
            "type": "Feature",
            "id": id,
            "collection": "c1",
            "geometry": {"type": "Point", "coordinates": [-105.1, 41.1]},
            "properties": {"datetime": "2023-01-01T00:00:00Z", "platform": "landsat-8"},
            "links": [],
            "assets": {}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[fixture]
    fn api() -> Api<MemoryStore> {
        let store = MemoryStore::new();
        store
            .add_collection(
                json!({"type": "Collection", "id": "c1", "title": "Collection one"})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .unwrap();
        store.add_items((1..=3).map(|i| item(&format!("item-{i}")))).unwrap();
        Api::new(store, "http://stac.test").unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn root_has_children(api: Api<MemoryStore>) {
        let root = api.root().await.unwrap();
        let child = root.links.iter().find(|link| link.rel == "child").unwrap();
        assert_eq!(child.href, "http://stac.test/collections/c1");
        assert_eq!(child.title.as_deref(), Some("Collection one"));
        assert_eq!(root.conforms_to, api.conformance().conforms_to);
    }

    #[rstest]
    #[tokio::test]
    async fn collections(api: Api<MemoryStore>) {
        let collections = api.collections().await.unwrap();
        assert_eq!(collections.collections.len(), 1);
        assert_eq!(
            collections.collections[0]["links"][0]["href"],
            "http://stac.test/collections/c1"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn items_of_an_unknown_collection(api: Api<MemoryStore>) {
        let url = "http://stac.test/collections/c2/items".parse().unwrap();
        let error = api.items("c2", GetItems::default(), url).await.unwrap_err();
        assert_eq!(error.status(), http::StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[tokio::test]
    async fn items_paginate(api: Api<MemoryStore>) {
        let get_items = GetItems {
            limit: Some("2".to_string()),
            ..Default::default()
        };
        let url = "http://stac.test/collections/c1/items?limit=2".parse().unwrap();
        let items = api.items("c1", get_items, url).await.unwrap();
        assert_eq!(items.number_returned, 2);
        let next = items.link("next").unwrap();
        assert!(next.href.starts_with("http://stac.test/collections/c1/items?limit=2&token="));
        assert_eq!(items.link("parent").unwrap().href, "http://stac.test/collections/c1");
    }

    #[rstest]
    #[tokio::test]
    async fn item_by_id(api: Api<MemoryStore>) {
        let item = api.item("c1", "item-1").await.unwrap();
        assert_eq!(item["links"][0]["href"], "http://stac.test/collections/c1/items/item-1");
        let error = api.item("c1", "item-4").await.unwrap_err();
        assert_eq!(error.status(), http::StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[tokio::test]
    async fn disabled_fields_are_ignored(api: Api<MemoryStore>) {
        let search = Search::new().fields("-properties".parse().unwrap());
        let request = PageRequest::Get(api.url_builder.search().clone());
        let item_collection = api.search(search.clone(), request.clone()).await.unwrap();
        assert!(!item_collection.items[0].contains_key("properties"));
        assert!(item_collection.context.is_some());

        let api = api.config(Config {
            extensions: Extensions::none(),
            ..Default::default()
        });
        let item_collection = api.search(search, request).await.unwrap();
        assert!(item_collection.items[0].contains_key("properties"));
        assert!(item_collection.context.is_none());
    }
}

//! Routes for serving API endpoints.

use crate::{Api, Collections, Conformance, Result, Root};
use axum::{
    Json, Router,
    extract::{
        OriginalUri, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use http::{HeaderValue, header::CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use stac_search::{
    Collection, GEOJSON, GetItems, GetSearch, Item, ItemCollection, PageRequest, Search, Store,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// A JSON response with the GeoJSON media type.
#[derive(Debug)]
pub struct GeoJson<T>(pub T);

impl<T: Serialize> IntoResponse for GeoJson<T> {
    fn into_response(self) -> Response {
        (
            [(CONTENT_TYPE, HeaderValue::from_static(GEOJSON))],
            Json(self.0),
        )
            .into_response()
    }
}

/// Creates an [axum::Router] from an [Api].
///
/// # Examples
///
/// ```
/// use stac_search::MemoryStore;
/// use stac_search_server::{Api, routes};
///
/// let api = Api::new(MemoryStore::new(), "http://stac.test").unwrap();
/// let router = routes::from_api(api);
/// ```
pub fn from_api<S: Store>(api: Api<S>) -> Router {
    Router::new()
        .route("/", get(root::<S>))
        .route("/conformance", get(conformance::<S>))
        .route("/collections", get(collections::<S>))
        .route("/collections/{collection_id}", get(collection::<S>))
        .route("/collections/{collection_id}/items", get(items::<S>))
        .route(
            "/collections/{collection_id}/items/{item_id}",
            get(item::<S>),
        )
        .route("/search", get(get_search::<S>).post(post_search::<S>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

async fn root<S: Store>(State(api): State<Api<S>>) -> Result<Json<Root>> {
    api.root().await.map(Json)
}

async fn conformance<S: Store>(State(api): State<Api<S>>) -> Json<Conformance> {
    Json(api.conformance())
}

async fn collections<S: Store>(State(api): State<Api<S>>) -> Result<Json<Collections>> {
    api.collections().await.map(Json)
}

async fn collection<S: Store>(
    State(api): State<Api<S>>,
    Path(collection_id): Path<String>,
) -> Result<Json<Collection>> {
    api.collection(&collection_id).await.map(Json)
}

async fn items<S: Store>(
    State(api): State<Api<S>>,
    Path(collection_id): Path<String>,
    OriginalUri(uri): OriginalUri,
    items: std::result::Result<Query<GetItems>, QueryRejection>,
) -> Result<GeoJson<ItemCollection>> {
    let Query(items) = items?;
    let mut url = api.url_builder.items(&collection_id);
    url.set_query(uri.query());
    api.items(&collection_id, items, url).await.map(GeoJson)
}

async fn item<S: Store>(
    State(api): State<Api<S>>,
    Path((collection_id, item_id)): Path<(String, String)>,
) -> Result<GeoJson<Item>> {
    api.item(&collection_id, &item_id).await.map(GeoJson)
}

async fn get_search<S: Store>(
    State(api): State<Api<S>>,
    OriginalUri(uri): OriginalUri,
    search: std::result::Result<Query<GetSearch>, QueryRejection>,
) -> Result<GeoJson<ItemCollection>> {
    let Query(search) = search?;
    let search = Search::try_from(search)?;
    let mut url = api.url_builder.search().clone();
    url.set_query(uri.query());
    api.search(search, PageRequest::Get(url)).await.map(GeoJson)
}

async fn post_search<S: Store>(
    State(api): State<Api<S>>,
    search: std::result::Result<Json<Search>, JsonRejection>,
) -> Result<GeoJson<ItemCollection>> {
    let Json(search) = search?;
    let body = match serde_json::to_value(&search)? {
        Value::Object(body) => body,
        _ => Map::new(),
    };
    let request = PageRequest::Post {
        url: api.url_builder.search().clone(),
        body,
    };
    api.search(search, request).await.map(GeoJson)
}

#[cfg(test)]
mod tests {
    use crate::Api;
    use assert_json_diff::assert_json_eq;
    use axum::{Router, body::Body};
    use http::{Request, StatusCode, header::CONTENT_TYPE};
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};
    use stac_search::{Collection, Item, MemoryStore, Store, StoreQuery};
    use tower::ServiceExt;

    fn item(id: &str) -> Item {
        json!({
            "type": "Feature",
            "id": id,
            "collection": "c1",
            "geometry": {"type": "Point", "coordinates": [-105.1, 41.1]},
            "bbox": [-105.1, 41.1, -105.1, 41.1],
            "properties": {"datetime": "2023-01-01T00:00:00Z"},
            "links": [],
            "assets": {}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[fixture]
    fn router() -> Router {
        let store = MemoryStore::new();
        store
            .add_collection(
                json!({"type": "Collection", "id": "c1"})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .unwrap();
        store.add_items((1..=3).map(|i| item(&format!("item-{i}")))).unwrap();
        super::from_api(Api::new(store, "http://stac.test").unwrap())
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, value) = send(router, request).await;
        (status, value)
    }

    async fn post(router: Router, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let (status, _, value) = send(router, request).await;
        (status, value)
    }

    fn link<'a>(value: &'a Value, rel: &str) -> Option<&'a Value> {
        value["links"]
            .as_array()
            .unwrap()
            .iter()
            .find(|link| link["rel"] == rel)
    }

    fn ids(value: &Value) -> Vec<&str> {
        value["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|feature| feature["id"].as_str().unwrap())
            .collect()
    }

    #[rstest]
    #[tokio::test]
    async fn root(router: Router) {
        let (status, root) = get(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(root["type"], "Catalog");
        assert!(link(&root, "child").is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn conformance(router: Router) {
        let (status, conformance) = get(router, "/conformance").await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            conformance["conformsTo"]
                .as_array()
                .unwrap()
                .contains(&json!("https://api.stacspec.org/v1.0.0/item-search"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn collections(router: Router) {
        let (status, collections) = get(router.clone(), "/collections").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collections["collections"][0]["id"], "c1");
        let (status, collection) = get(router, "/collections/c1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collection["id"], "c1");
    }

    #[rstest]
    #[tokio::test]
    async fn get_search_pages(router: Router) {
        let request = Request::builder()
            .uri("/search?limit=2&fields=-geometry")
            .body(Body::empty())
            .unwrap();
        let (status, content_type, page) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/geo+json"));
        assert_eq!(ids(&page), vec!["item-1", "item-2"]);
        assert!(page["features"][0].get("geometry").is_none());
        assert!(link(&page, "prev").is_none());

        let next = link(&page, "next").unwrap()["href"].as_str().unwrap();
        let next = next.strip_prefix("http://stac.test").unwrap();
        assert!(next.starts_with("/search?limit=2&fields=-geometry&token="));
        let (status, page) = get(router.clone(), next).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&page), vec!["item-3"]);
        assert!(link(&page, "next").is_none());

        let prev = link(&page, "prev").unwrap()["href"].as_str().unwrap();
        let (_, page) = get(router, prev.strip_prefix("http://stac.test").unwrap()).await;
        assert_eq!(ids(&page), vec!["item-1", "item-2"]);
        assert!(link(&page, "prev").is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn post_search_pages(router: Router) {
        let (status, page) = post(router.clone(), "/search", json!({"limit": 2}).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        let next = link(&page, "next").unwrap();
        assert_eq!(next["method"], "POST");
        assert_eq!(next["body"]["limit"], 2);
        let (status, page) = post(router, "/search", next["body"].to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&page), vec!["item-3"]);
        assert_eq!(page["context"], json!({"returned": 1, "limit": 2}));
    }

    #[rstest]
    #[case("/search?limit=0", StatusCode::BAD_REQUEST, "ValidationError")]
    #[case("/search?bbox=1,2,3", StatusCode::BAD_REQUEST, "ValidationError")]
    #[case("/search?sortby=assets", StatusCode::BAD_REQUEST, "QueryTranslationError")]
    #[case("/search?token=bm90IGpzb24", StatusCode::BAD_REQUEST, "InvalidCursorError")]
    #[case("/collections/c2", StatusCode::NOT_FOUND, "NotFoundError")]
    #[case("/collections/c2/items", StatusCode::NOT_FOUND, "NotFoundError")]
    #[case("/collections/c1/items/item-4", StatusCode::NOT_FOUND, "NotFoundError")]
    #[tokio::test]
    async fn errors(
        router: Router,
        #[case] uri: &str,
        #[case] expected_status: StatusCode,
        #[case] expected_code: &str,
    ) {
        let (status, error) = get(router, uri).await;
        assert_eq!(status, expected_status);
        assert_eq!(error["code"], expected_code);
        assert!(error["description"].is_string());
    }

    #[rstest]
    #[tokio::test]
    async fn malformed_body(router: Router) {
        let (status, error) = post(router, "/search", "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], "ValidationError");
    }

    #[derive(Clone, Debug)]
    struct Unavailable;

    impl Store for Unavailable {
        async fn search(&self, _: &StoreQuery) -> stac_search::Result<Vec<Item>> {
            Err(stac_search::Error::StoreUnavailable(
                "connection refused on 10.0.0.1".into(),
            ))
        }

        async fn item(&self, _: &str, _: &str) -> stac_search::Result<Option<Item>> {
            Ok(None)
        }

        async fn collection(&self, _: &str) -> stac_search::Result<Option<Collection>> {
            Ok(None)
        }

        async fn collections(&self) -> stac_search::Result<Vec<Collection>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn store_unavailable() {
        let router = super::from_api(Api::new(Unavailable, "http://stac.test").unwrap());
        let (status, error) = get(router, "/search").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_json_eq!(
            error,
            json!({"code": "StoreUnavailableError", "description": "the store is unavailable"})
        );
    }
}

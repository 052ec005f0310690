use crate::{
    Collection, Comparison, Error, Item, Predicate, Result, Store, StoreQuery, compare_values,
};
use chrono::{DateTime, Utc};
use geo::Intersects;
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

/// A naive store that keeps everything in memory.
///
/// Useful for tests and small catalogs. Every search is a full scan.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<BTreeMap<String, Collection>>>,
    items: Arc<RwLock<Vec<Item>>>,
}

impl MemoryStore {
    /// Creates a new, empty memory store.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::MemoryStore;
    ///
    /// let store = MemoryStore::new();
    /// ```
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Adds a collection, replacing any collection with the same id.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::MemoryStore;
    /// use serde_json::json;
    ///
    /// let store = MemoryStore::new();
    /// let collection = json!({"type": "Collection", "id": "c1"});
    /// store.add_collection(collection.as_object().unwrap().clone()).unwrap();
    /// ```
    pub fn add_collection(&self, collection: Collection) -> Result<()> {
        let id = collection
            .get("id")
            .and_then(Value::as_str)
            .ok_or(Error::MissingMember("id"))?
            .to_string();
        let _ = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, collection);
        Ok(())
    }

    /// Adds an item, replacing any item with the same collection and id.
    pub fn add_item(&self, item: Item) -> Result<()> {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or(Error::MissingMember("id"))?
            .to_string();
        let collection = item.get("collection").cloned();
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.retain(|existing| {
            existing.get("id").and_then(Value::as_str) != Some(id.as_str())
                || existing.get("collection") != collection.as_ref()
        });
        items.push(item);
        Ok(())
    }

    /// Adds many items.
    pub fn add_items(&self, items: impl IntoIterator<Item = Item>) -> Result<()> {
        for item in items {
            self.add_item(item)?;
        }
        Ok(())
    }

    fn run(&self, query: &StoreQuery) -> Result<Vec<Item>> {
        let filter = Filter::new(&query.filters)?;
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<&Item> = items
            .iter()
            .filter(|item| filter.matches(item))
            .filter(|item| match &query.seek {
                Some(seek) => compare_to(query, item, &seek.values) == Ordering::Greater,
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| compare_to(query, a, &query.seek_values(b)));
        Ok(matches
            .into_iter()
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

impl Store for MemoryStore {
    async fn search(&self, query: &StoreQuery) -> Result<Vec<Item>> {
        self.run(query)
    }

    async fn item(&self, collection_id: &str, item_id: &str) -> Result<Option<Item>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items
            .iter()
            .find(|item| {
                item.get("id").and_then(Value::as_str) == Some(item_id)
                    && item.get("collection").and_then(Value::as_str) == Some(collection_id)
            })
            .cloned())
    }

    async fn collection(&self, id: &str) -> Result<Option<Collection>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections.get(id).cloned())
    }

    async fn collections(&self) -> Result<Vec<Collection>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections.values().cloned().collect())
    }
}

/// Compares an item against a tuple of seek values in the query's order.
fn compare_to(query: &StoreQuery, item: &Item, values: &[Value]) -> Ordering {
    for (order, value) in query.order.iter().zip(values) {
        let ordering = order
            .direction
            .apply(compare_values(&order.field.value(item), value));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Predicates with their geometries converted once per search.
struct Filter<'a> {
    predicates: &'a [Predicate],
    intersects: Vec<geo::Geometry>,
}

impl<'a> Filter<'a> {
    fn new(predicates: &'a [Predicate]) -> Result<Filter<'a>> {
        let mut intersects = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::Intersects(geometry) => {
                    intersects.push(geometry.clone().try_into().map_err(Box::new)?)
                }
                Predicate::Bbox(bbox) => intersects.extend(
                    bbox.rects()
                        .into_iter()
                        .map(geo::Geometry::Rect)
                        .collect::<Vec<_>>(),
                ),
                _ => {}
            }
        }
        Ok(Filter {
            predicates,
            intersects,
        })
    }

    fn matches(&self, item: &Item) -> bool {
        let spatial = self
            .predicates
            .iter()
            .any(|p| matches!(p, Predicate::Bbox(_) | Predicate::Intersects(_)));
        if spatial && !self.geometry_matches(item) {
            return false;
        }
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Collections(collections) => item
                .get("collection")
                .and_then(Value::as_str)
                .is_some_and(|collection| collections.iter().any(|c| c == collection)),
            Predicate::Ids(ids) => item
                .get("id")
                .and_then(Value::as_str)
                .is_some_and(|id| ids.iter().any(|i| i == id)),
            Predicate::Bbox(_) | Predicate::Intersects(_) => true,
            Predicate::Datetime(interval) => {
                datetime_range(item).is_some_and(|(start, end)| interval.overlaps(start, end))
            }
            Predicate::Comparison { field, op, value } => Comparison {
                field: field.to_string(),
                op: *op,
                value: value.clone(),
            }
            .matches(&field.value(item)),
        })
    }

    /// A bbox contributes one or two rectangles, any of which may match.
    /// A bbox and an intersects geometry never appear together.
    fn geometry_matches(&self, item: &Item) -> bool {
        let Some(geometry) = item
            .get("geometry")
            .filter(|geometry| !geometry.is_null())
            .and_then(|geometry| {
                serde_json::from_value::<geojson::Geometry>(geometry.clone()).ok()
            })
            .and_then(|geometry| geo::Geometry::<f64>::try_from(geometry).ok())
        else {
            return false;
        };
        self.intersects
            .iter()
            .any(|other| geometry.intersects(other))
    }
}

fn datetime_range(item: &Item) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let properties = item.get("properties")?;
    let get = |key: &str| {
        properties
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| crate::parse_rfc3339(s).ok())
    };
    let datetime = get("datetime");
    let start = datetime.or_else(|| get("start_datetime"))?;
    let end = get("end_datetime").or(datetime).unwrap_or(start);
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::{
        Bbox, Config, Extensions, Item, Search, Sortby, Store, StoreQuery, translate,
    };
    use geojson::{Geometry, Value as GeojsonValue};
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn item(id: &str, collection: &str, datetime: &str, x: f64, cloud_cover: Option<i64>) -> Item {
        let mut properties = json!({"datetime": datetime});
        if let Some(cloud_cover) = cloud_cover {
            properties["eo:cloud_cover"] = json!(cloud_cover);
        }
        json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": id,
            "collection": collection,
            "geometry": {"type": "Point", "coordinates": [x, 0.0]},
            "bbox": [x, 0.0, x, 0.0],
            "properties": properties,
            "links": [],
            "assets": {}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[fixture]
    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_items([
                item("a", "c1", "2023-01-01T00:00:00Z", 0.0, Some(50)),
                item("b", "c1", "2023-01-02T00:00:00Z", 10.0, None),
                item("c", "c1", "2023-01-02T00:00:00Z", 20.0, Some(10)),
                item("d", "c2", "2023-01-03T00:00:00Z", 179.5, Some(10)),
            ])
            .unwrap();
        store
    }

    fn query(search: Search) -> StoreQuery {
        let request = search.into_request(&Config::default()).unwrap();
        translate(&request, &Extensions::default()).unwrap()
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item["id"].as_str().unwrap()).collect()
    }

    #[rstest]
    #[tokio::test]
    async fn default_order(store: MemoryStore) {
        let items = store.search(&query(Search::new())).await.unwrap();
        assert_eq!(ids(&items), vec!["d", "b", "c", "a"]);
    }

    #[rstest]
    #[tokio::test]
    async fn limit_probe_row(store: MemoryStore) {
        let items = store.search(&query(Search::new().limit(2))).await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn nulls_last(store: MemoryStore) {
        let items = store
            .search(&query(Search::new().sortby(vec![Sortby::asc("eo:cloud_cover")])))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["c", "d", "a", "b"]);
        let items = store
            .search(&query(Search::new().sortby(vec![Sortby::desc("eo:cloud_cover")])))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["b", "a", "c", "d"]);
    }

    #[rstest]
    #[tokio::test]
    async fn collections_and_ids(store: MemoryStore) {
        let items = store
            .search(&query(
                Search::new()
                    .collections(vec!["c1".to_string()])
                    .ids(vec!["a".to_string(), "d".to_string()]),
            ))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["a"]);
    }

    #[rstest]
    #[tokio::test]
    async fn bbox(store: MemoryStore) {
        let items = store
            .search(&query(Search::new().bbox(Bbox::new(5., -1., 25., 1.))))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["b", "c"]);
        let items = store
            .search(&query(Search::new().bbox(Bbox::new(170., -1., -170., 1.))))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["d"]);
    }

    #[rstest]
    #[tokio::test]
    async fn intersects(store: MemoryStore) {
        let polygon = Geometry::new(GeojsonValue::Polygon(vec![vec![
            vec![-1., -1.],
            vec![11., -1.],
            vec![11., 1.],
            vec![-1., 1.],
            vec![-1., -1.],
        ]]));
        let items = store
            .search(&query(Search::new().intersects(polygon)))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["b", "a"]);
    }

    #[rstest]
    #[tokio::test]
    async fn datetime(store: MemoryStore) {
        let items = store
            .search(&query(Search::new().datetime("2023-01-02")))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["b", "c"]);
        let items = store
            .search(&query(Search::new().datetime("../2023-01-01T12:00:00Z")))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["a"]);
    }

    #[rstest]
    #[tokio::test]
    async fn query_extension(store: MemoryStore) {
        let q = json!({"eo:cloud_cover": {"lte": 10}, "collection": {"eq": "c1"}});
        let items = store
            .search(&query(Search::new().query(q.as_object().unwrap().clone())))
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["c"]);
    }

    #[rstest]
    #[tokio::test]
    async fn item_and_collection(store: MemoryStore) {
        assert!(store.item("c1", "a").await.unwrap().is_some());
        assert!(store.item("c2", "a").await.unwrap().is_none());
        assert!(store.collection("c1").await.unwrap().is_none());
        store
            .add_collection(json!({"id": "c1"}).as_object().unwrap().clone())
            .unwrap();
        assert!(store.collection("c1").await.unwrap().is_some());
        assert_eq!(store.collections().await.unwrap().len(), 1);
    }

    #[rstest]
    fn replaces_items(store: MemoryStore) {
        store
            .add_item(item("a", "c1", "2024-01-01T00:00:00Z", 0.0, None))
            .unwrap();
        let a = tokio_test::block_on(store.item("c1", "a")).unwrap().unwrap();
        assert_eq!(a["properties"]["datetime"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn item_without_id() {
        let _ = MemoryStore::new()
            .add_item(json!({"type": "Feature"}).as_object().unwrap().clone())
            .unwrap_err();
    }
}

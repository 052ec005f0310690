//! Projection of store records into response documents.

use crate::{
    Collection, Context, Fields, Item, ItemCollection, Link, Page, PageRequest, UrlBuilder,
};
use serde_json::Value;

/// Applies the fields extension to an item and attaches its links.
///
/// Stored links with an inferred rel (`self`, `parent`, `collection`,
/// `root`, `item`) are dropped and regenerated. Links are attached unless
/// `links` is excluded.
///
/// # Examples
///
/// ```
/// use stac_search::{Fields, UrlBuilder, project_item};
/// use serde_json::json;
///
/// let url_builder = UrlBuilder::new("http://stac.test").unwrap();
/// let item = json!({
///     "type": "Feature",
///     "id": "an-id",
///     "collection": "c1",
///     "geometry": null,
///     "properties": {"datetime": "2023-01-01T00:00:00Z"},
///     "links": [{"href": "./an-id.json", "rel": "self"}],
/// });
/// let fields: Fields = "-geometry".parse().unwrap();
/// let item = project_item(item.as_object().unwrap().clone(), &fields, &url_builder);
/// assert!(!item.contains_key("geometry"));
/// assert_eq!(item["links"][0]["href"], "http://stac.test/collections/c1/items/an-id");
/// ```
pub fn project_item(mut item: Item, fields: &Fields, url_builder: &UrlBuilder) -> Item {
    let mut links = take_links(&mut item);
    let collection = item
        .get("collection")
        .and_then(Value::as_str)
        .map(String::from);
    let id = item.get("id").and_then(Value::as_str).map(String::from);
    let mut generated = Vec::new();
    if let (Some(collection), Some(id)) = (collection.as_deref(), id.as_deref()) {
        generated.push(Link::new(url_builder.item(collection, id), "self").geojson());
    }
    if let Some(collection) = collection.as_deref() {
        let href = url_builder.collection(collection);
        generated.push(Link::new(&href, "parent").json());
        generated.push(Link::new(&href, "collection").json());
    }
    generated.push(Link::new(url_builder.root(), "root").json());
    generated.append(&mut links);

    let mut item = fields.apply(item);
    if !fields.excludes("links") {
        let _ = item.insert("links".to_string(), to_value(generated));
    }
    item
}

/// Attaches a collection's links.
///
/// # Examples
///
/// ```
/// use stac_search::{UrlBuilder, project_collection};
/// use serde_json::json;
///
/// let url_builder = UrlBuilder::new("http://stac.test").unwrap();
/// let collection = json!({"type": "Collection", "id": "c1"});
/// let collection = project_collection(collection.as_object().unwrap().clone(), &url_builder);
/// assert_eq!(collection["links"].as_array().unwrap().len(), 4);
/// ```
pub fn project_collection(mut collection: Collection, url_builder: &UrlBuilder) -> Collection {
    let mut links = take_links(&mut collection);
    let mut generated = Vec::new();
    if let Some(id) = collection.get("id").and_then(Value::as_str) {
        generated.push(Link::new(url_builder.collection(id), "self").json());
        generated.push(Link::new(url_builder.root(), "parent").json());
        generated.push(Link::new(url_builder.items(id), "items").geojson());
    }
    generated.push(Link::new(url_builder.root(), "root").json());
    generated.append(&mut links);
    let _ = collection.insert("links".to_string(), to_value(generated));
    collection
}

/// Builds the response envelope for a page of results.
///
/// The envelope gets `self` and `root` links, and `next` and `prev` links
/// carrying the page's tokens.
pub fn project_page(
    page: Page,
    fields: &Fields,
    request: &PageRequest,
    url_builder: &UrlBuilder,
    context: bool,
) -> ItemCollection {
    let items: Vec<Item> = page
        .items
        .into_iter()
        .map(|item| project_item(item, fields, url_builder))
        .collect();
    let mut item_collection = ItemCollection::new(items);
    item_collection.links.push(request.self_link());
    item_collection
        .links
        .push(Link::new(url_builder.root(), "root").json());
    if let Some(next) = page.next.as_deref() {
        item_collection.links.push(request.paging_link("next", next));
    }
    if let Some(prev) = page.prev.as_deref() {
        item_collection.links.push(request.paging_link("prev", prev));
    }
    if context {
        item_collection.context = Some(Context {
            returned: item_collection.number_returned,
            limit: page.limit,
        });
    }
    item_collection
}

/// Removes the links from a document, dropping inferred ones and any that
/// don't parse.
fn take_links(object: &mut serde_json::Map<String, Value>) -> Vec<Link> {
    match object.remove("links") {
        Some(Value::Array(links)) => links
            .into_iter()
            .filter_map(|link| serde_json::from_value::<Link>(link).ok())
            .filter(|link| !link.is_inferred())
            .collect(),
        _ => Vec::new(),
    }
}

fn to_value(links: Vec<Link>) -> Value {
    serde_json::to_value(links).unwrap_or_else(|_| Value::Array(Vec::new()))
}

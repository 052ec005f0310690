use crate::{Item, Link};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ITEM_COLLECTION_TYPE: &str = "FeatureCollection";

fn item_collection_type() -> String {
    ITEM_COLLECTION_TYPE.to_string()
}

/// The response envelope of a search: a GeoJSON FeatureCollection with links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemCollection {
    #[serde(default = "item_collection_type")]
    r#type: String,

    /// A possibly-empty array of Item objects.
    #[serde(rename = "features")]
    pub items: Vec<Item>,

    /// An array of Links related to this ItemCollection.
    pub links: Vec<Link>,

    /// The number of Items being returned.
    #[serde(rename = "numberReturned")]
    pub number_returned: u64,

    /// The search-related metadata for the ItemCollection.
    ///
    /// Part of the [context extension](https://github.com/stac-api-extensions/context).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,

    /// Additional fields.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

/// The search-related metadata for the [ItemCollection].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Context {
    /// The count of results returned by this response.
    pub returned: u64,

    /// The maximum number of results to which the result was limited.
    pub limit: u64,
}

impl ItemCollection {
    /// Creates a new item collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::ItemCollection;
    ///
    /// let item_collection = ItemCollection::new(Vec::new());
    /// assert_eq!(item_collection.number_returned, 0);
    /// ```
    pub fn new(items: Vec<Item>) -> ItemCollection {
        ItemCollection {
            r#type: item_collection_type(),
            number_returned: items.len() as u64,
            items,
            links: Vec::new(),
            context: None,
            additional_fields: Map::new(),
        }
    }

    /// Returns the link with this rel, if there is one.
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == rel)
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, ItemCollection};
    use crate::Link;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn serialize() {
        let mut item_collection = ItemCollection::new(vec![
            json!({"id": "a"}).as_object().unwrap().clone(),
        ]);
        item_collection.links.push(Link::new("http://stac.test/search", "self").geojson());
        item_collection.context = Some(Context {
            returned: 1,
            limit: 10,
        });
        assert_json_eq!(
            serde_json::to_value(&item_collection).unwrap(),
            json!({
                "type": "FeatureCollection",
                "features": [{"id": "a"}],
                "links": [{"href": "http://stac.test/search", "rel": "self", "type": "application/geo+json"}],
                "numberReturned": 1,
                "context": {"returned": 1, "limit": 10}
            })
        );
        assert!(item_collection.link("self").is_some());
        assert!(item_collection.link("next").is_none());
    }
}

use crate::{Error, Item, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt::Display, str::FromStr};

/// Include/exclude fields from item collections.
///
/// Paths are dotted, e.g. `properties.eo:cloud_cover`. When a path is both
/// included and excluded, it is excluded.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fields {
    /// Fields to include.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Fields to exclude.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Members that are kept when only some fields are included.
const ALWAYS_INCLUDED: [&str; 3] = ["id", "type", "collection"];

impl Fields {
    /// Returns true if this includes and excludes nothing.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Returns true if this path, or one of its parents, is excluded.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Fields;
    ///
    /// let fields: Fields = "-properties".parse().unwrap();
    /// assert!(fields.excludes("properties.datetime"));
    /// assert!(!fields.excludes("id"));
    /// ```
    pub fn excludes(&self, path: &str) -> bool {
        self.exclude.iter().any(|excluded| is_prefix(excluded, path))
    }

    /// Applies these fields to an item.
    ///
    /// When `include` is not empty, only included paths are kept, plus `id`,
    /// `type`, and `collection`. Excluded paths are then removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Fields;
    /// use serde_json::json;
    ///
    /// let fields: Fields = "properties.datetime,-properties.datetime,geometry".parse().unwrap();
    /// let item = json!({
    ///     "id": "an-id",
    ///     "type": "Feature",
    ///     "geometry": null,
    ///     "properties": {"datetime": "2023-01-01T00:00:00Z", "foo": "bar"},
    /// });
    /// let item = fields.apply(item.as_object().unwrap().clone());
    /// assert_eq!(
    ///     serde_json::Value::Object(item),
    ///     json!({"id": "an-id", "type": "Feature", "geometry": null})
    /// );
    /// ```
    pub fn apply(&self, item: Item) -> Item {
        let mut item = if self.include.is_empty() {
            item
        } else {
            let mut projected = Map::new();
            for path in ALWAYS_INCLUDED
                .iter()
                .copied()
                .chain(self.include.iter().map(String::as_str))
            {
                if self.excludes(path) {
                    continue;
                }
                if let Some(value) = get(&item, path) {
                    insert(&mut projected, path, value.clone());
                }
            }
            projected
        };
        for path in &self.exclude {
            remove(&mut item, path);
        }
        item
    }
}

impl FromStr for Fields {
    type Err = Error;

    fn from_str(s: &str) -> Result<Fields> {
        let mut fields = Fields::default();
        for field in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(field) = field.strip_prefix('-') {
                check(field, s)?;
                fields.exclude.push(field.to_string());
            } else {
                let field = field.strip_prefix('+').unwrap_or(field);
                check(field, s)?;
                fields.include.push(field.to_string());
            }
        }
        Ok(fields)
    }
}

impl Display for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self
            .include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|field| format!("-{field}")))
            .collect();
        f.write_str(&fields.join(","))
    }
}

fn check(field: &str, s: &str) -> Result<()> {
    if field.is_empty()
        || field.starts_with(['+', '-'])
        || field.split('.').any(str::is_empty)
        || field.contains(char::is_whitespace)
    {
        Err(Error::InvalidFields(s.to_string()))
    } else {
        Ok(())
    }
}

fn is_prefix(prefix: &str, path: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn get<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        Some((head, rest)) => map.get(head)?.as_object().and_then(|map| get(map, rest)),
        None => map.get(path),
    }
}

fn insert(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        Some((head, rest)) => {
            let child = map
                .entry(head)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = child {
                insert(child, rest, value);
            }
        }
        None => {
            let _ = map.insert(path.to_string(), value);
        }
    }
}

fn remove(map: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = map.get_mut(head) {
                remove(child, rest);
            }
        }
        None => {
            let _ = map.remove(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Fields;
    use crate::Item;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    #[fixture]
    fn item() -> Item {
        json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": "an-id",
            "collection": "a-collection",
            "geometry": {"type": "Point", "coordinates": [-105.1, 41.1]},
            "bbox": [-105.1, 41.1, -105.1, 41.1],
            "properties": {
                "datetime": "2023-01-01T00:00:00Z",
                "eo:cloud_cover": 10,
                "platform": "landsat-8"
            },
            "links": [],
            "assets": {"data": {"href": "./data.tif"}}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[rstest]
    #[case("", vec![], vec![])]
    #[case("id,+type,-geometry", vec!["id", "type"], vec!["geometry"])]
    #[case("properties.eo:cloud_cover, -assets", vec!["properties.eo:cloud_cover"], vec!["assets"])]
    fn parse(#[case] s: &str, #[case] include: Vec<&str>, #[case] exclude: Vec<&str>) {
        let fields: Fields = s.parse().unwrap();
        assert_eq!(fields.include, include);
        assert_eq!(fields.exclude, exclude);
    }

    #[rstest]
    #[case("-")]
    #[case("+")]
    #[case("--id")]
    #[case("properties..datetime")]
    fn parse_invalid(#[case] s: &str) {
        let _ = s.parse::<Fields>().unwrap_err();
    }

    #[rstest]
    fn empty_is_identity(item: Item) {
        assert_eq!(Fields::default().apply(item.clone()), item);
    }

    #[rstest]
    fn include_keeps_identity_members(item: Item) {
        let fields: Fields = "properties.eo:cloud_cover".parse().unwrap();
        assert_eq!(
            Value::Object(fields.apply(item)),
            json!({
                "type": "Feature",
                "id": "an-id",
                "collection": "a-collection",
                "properties": {"eo:cloud_cover": 10}
            })
        );
    }

    #[rstest]
    fn exclude_wins(item: Item) {
        let fields: Fields = "properties,-properties.platform,-properties.eo:cloud_cover"
            .parse()
            .unwrap();
        let item = fields.apply(item);
        assert_eq!(
            item["properties"],
            json!({"datetime": "2023-01-01T00:00:00Z"})
        );
        let fields: Fields = "assets,-assets".parse().unwrap();
        let item = fields.apply(item);
        assert!(!item.contains_key("assets"));
    }

    #[rstest]
    fn exclude_identity_member(item: Item) {
        let fields: Fields = "geometry,-collection".parse().unwrap();
        let item = fields.apply(item);
        assert!(!item.contains_key("collection"));
        assert!(item.contains_key("id"));
        assert!(item.contains_key("geometry"));
    }

    #[rstest]
    fn exclude_only(item: Item) {
        let fields: Fields = "-geometry,-properties.platform,-not.a.path".parse().unwrap();
        let item = fields.apply(item);
        assert!(!item.contains_key("geometry"));
        assert!(item.contains_key("bbox"));
        assert!(item["properties"].get("platform").is_none());
        assert!(item["properties"].get("datetime").is_some());
    }

    #[test]
    fn excludes() {
        let fields: Fields = "-properties.eo".parse().unwrap();
        assert!(fields.excludes("properties.eo"));
        assert!(!fields.excludes("properties.eo:cloud_cover"));
    }

    #[test]
    fn display() {
        let fields: Fields = "+id,-geometry".parse().unwrap();
        assert_eq!(fields.to_string(), "id,-geometry");
    }
}

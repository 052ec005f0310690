//! Translation of a [SearchRequest] into a store-agnostic [StoreQuery].

use crate::{
    Bbox, Cursor, Direction, Error, Extensions, Interval, Item, Operator, Paging, Query, Result,
    SearchRequest, Sortby, parse_rfc3339,
};
use chrono::SecondsFormat;
use geojson::Geometry;
use serde_json::Value;
use std::{fmt::Display, str::FromStr};
use tracing::debug;

/// Top-level item members that can't be sorted or queried on.
const UNSUPPORTED_FIELDS: [&str; 8] = [
    "geometry",
    "bbox",
    "assets",
    "links",
    "type",
    "stac_version",
    "stac_extensions",
    "properties",
];

/// A field that can be sorted and queried on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// The item id.
    Id,

    /// The item's collection id.
    Collection,

    /// The item's datetime, falling back to `start_datetime`.
    Datetime,

    /// A member of the item's properties.
    Property(String),
}

/// One term of a store query's ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// The field.
    pub field: Field,

    /// The direction.
    pub direction: Direction,
}

/// A seek position: return only records strictly after these values in the
/// query's ordering.
///
/// There is one value per [Order] term, in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct Seek {
    /// The values of the record at the seek position.
    pub values: Vec<Value>,
}

/// A single filter. A record must match every predicate of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The record's collection is one of these.
    Collections(Vec<String>),

    /// The record's id is one of these.
    Ids(Vec<String>),

    /// The record's geometry intersects this bounding box.
    Bbox(Bbox),

    /// The record's geometry intersects this geometry.
    Intersects(Geometry),

    /// The record's datetime, or its `start_datetime`/`end_datetime` range, overlaps this interval.
    Datetime(Interval),

    /// A query extension comparison.
    Comparison {
        /// The field.
        field: Field,

        /// The operator.
        op: Operator,

        /// The operand, normalized for the field.
        value: Value,
    },
}

/// A store-executable query: filters, a total ordering, an optional seek
/// position, and a row limit.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    /// Filters, all of which must match.
    pub filters: Vec<Predicate>,

    /// The ordering, always including collection and id so that it's total.
    ///
    /// When paging backwards every term is already reversed.
    pub order: Vec<Order>,

    /// Where to start, if paging.
    pub seek: Option<Seek>,

    /// The number of rows to fetch, one more than the page size.
    pub limit: u64,

    /// The number of records to return.
    pub page_size: u64,

    /// The paging direction of the request's token, if it had one.
    pub paging: Option<Paging>,
}

/// Translates a search request into a store query.
///
/// The query extension and the sort extension are only honored if enabled;
/// otherwise they're dropped from the request.
///
/// # Examples
///
/// ```
/// use stac_search::{Config, Direction, Field, Search, translate};
///
/// let config = Config::default();
/// let request = Search::new().limit(5).into_request(&config).unwrap();
/// let query = translate(&request, &config.extensions).unwrap();
/// assert_eq!(query.limit, 6);
/// assert_eq!(query.order[0].field, Field::Datetime);
/// assert_eq!(query.order[0].direction, Direction::Descending);
/// assert_eq!(query.order[1].field, Field::Collection);
/// assert_eq!(query.order[2].field, Field::Id);
/// ```
pub fn translate(request: &SearchRequest, extensions: &Extensions) -> Result<StoreQuery> {
    let mut filters = Vec::new();
    if !request.collections.is_empty() {
        filters.push(Predicate::Collections(request.collections.clone()));
    }
    if !request.ids.is_empty() {
        filters.push(Predicate::Ids(request.ids.clone()));
    }
    if let Some(bbox) = request.bbox {
        filters.push(Predicate::Bbox(bbox));
    }
    if let Some(intersects) = request.intersects.clone() {
        filters.push(Predicate::Intersects(intersects));
    }
    if let Some(datetime) = request.datetime {
        filters.push(Predicate::Datetime(datetime));
    }
    if let Some(query) = request.query.as_ref() {
        if extensions.query {
            for comparison in Query::from_map(query)?.comparisons {
                let field: Field = comparison.field.parse()?;
                let value = field.normalize_operand(comparison.op, comparison.value)?;
                filters.push(Predicate::Comparison {
                    field,
                    op: comparison.op,
                    value,
                });
            }
        } else {
            debug!("query extension is disabled, dropping query");
        }
    }

    let sortby = if extensions.sort {
        request.sortby.as_slice()
    } else {
        if !request.sortby.is_empty() {
            debug!("sort extension is disabled, dropping sortby");
        }
        &[]
    };
    let mut order = if sortby.is_empty() {
        vec![Order {
            field: Field::Datetime,
            direction: Direction::Descending,
        }]
    } else {
        sortby.iter().map(Order::try_from).collect::<Result<Vec<_>>>()?
    };
    // Item ids are only unique within a collection.
    for field in [Field::Collection, Field::Id] {
        if !order.iter().any(|order| order.field == field) {
            order.push(Order {
                field,
                direction: Direction::Ascending,
            });
        }
    }

    let (seek, paging) = match request.token.as_deref() {
        Some(token) => {
            let cursor = Cursor::decode(token)?;
            let seek = seek(&order, cursor.keys, cursor.id)?;
            if cursor.paging == Paging::Prev {
                order.iter_mut().for_each(|order| order.direction = order.direction.reverse());
            }
            (Some(seek), Some(cursor.paging))
        }
        None => (None, None),
    };

    let query = StoreQuery {
        filters,
        order,
        seek,
        limit: request.limit.saturating_add(1),
        page_size: request.limit,
        paging,
    };
    debug!(?query, "translated search");
    Ok(query)
}

fn seek(order: &[Order], keys: Vec<Value>, id: String) -> Result<Seek> {
    let expected = order.iter().filter(|order| order.field != Field::Id).count();
    if keys.len() != expected {
        return Err(Error::InvalidCursor(format!(
            "expected {expected} sort values, got {}",
            keys.len()
        )));
    }
    let mut keys = keys.into_iter();
    let mut values = Vec::with_capacity(order.len());
    for order in order {
        let value = if order.field == Field::Id {
            Value::String(id.clone())
        } else {
            order
                .field
                .normalize_key(keys.next().unwrap_or_default())?
        };
        values.push(value);
    }
    Ok(Seek { values })
}

impl StoreQuery {
    /// Returns the seek values of a record under this query's ordering.
    pub fn seek_values(&self, item: &Item) -> Vec<Value> {
        self.order.iter().map(|order| order.field.value(item)).collect()
    }

    /// Returns a cursor positioned at this record.
    pub fn cursor(&self, item: &Item, paging: Paging) -> Cursor {
        let keys = self
            .order
            .iter()
            .filter(|order| order.field != Field::Id)
            .map(|order| order.field.value(item))
            .collect();
        let id = match Field::Id.value(item) {
            Value::String(id) => id,
            _ => String::new(),
        };
        Cursor::new(paging, keys, id)
    }

    /// Returns a one-row query that finds whether anything comes before this record.
    pub fn probe_before(&self, item: &Item) -> StoreQuery {
        let values = self.seek_values(item);
        StoreQuery {
            filters: self.filters.clone(),
            order: self
                .order
                .iter()
                .map(|order| Order {
                    field: order.field.clone(),
                    direction: order.direction.reverse(),
                })
                .collect(),
            seek: Some(Seek { values }),
            limit: 1,
            page_size: 1,
            paging: None,
        }
    }
}

impl Field {
    /// Returns this field's value for an item, or null if it doesn't have one.
    ///
    /// Datetimes are normalized to UTC with microsecond precision, so they
    /// order correctly as strings. A datetime that isn't RFC 3339 is null.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Field;
    /// use serde_json::json;
    ///
    /// let item = json!({
    ///     "id": "an-id",
    ///     "properties": {"datetime": "2023-01-01T02:00:00+02:00", "eo:cloud_cover": 10}
    /// });
    /// let item = item.as_object().unwrap();
    /// assert_eq!(Field::Datetime.value(item), json!("2023-01-01T00:00:00.000000Z"));
    /// assert_eq!(Field::Property("eo:cloud_cover".into()).value(item), json!(10));
    /// assert_eq!(Field::Collection.value(item), json!(null));
    ///
    /// let item = json!({"id": "an-id", "properties": {"datetime": "2023-01-01"}});
    /// assert_eq!(Field::Datetime.value(item.as_object().unwrap()), json!(null));
    /// ```
    pub fn value(&self, item: &Item) -> Value {
        match self {
            Field::Id => item.get("id").cloned().unwrap_or_default(),
            Field::Collection => item.get("collection").cloned().unwrap_or_default(),
            Field::Datetime => {
                let properties = item.get("properties");
                properties
                    .and_then(|p| p.get("datetime"))
                    .filter(|v| !v.is_null())
                    .or_else(|| properties.and_then(|p| p.get("start_datetime")))
                    .and_then(Value::as_str)
                    .and_then(|datetime| parse_rfc3339(datetime).ok())
                    .map(|datetime| Value::String(normalize_datetime(datetime)))
                    .unwrap_or_default()
            }
            Field::Property(name) => item
                .get("properties")
                .and_then(|p| p.get(name))
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Returns the name of this field as a request would spell it.
    pub fn name(&self) -> &str {
        match self {
            Field::Id => "id",
            Field::Collection => "collection",
            Field::Datetime => "datetime",
            Field::Property(name) => name,
        }
    }

    fn normalize_operand(&self, op: Operator, value: Value) -> Result<Value> {
        let invalid = |value: Value| Error::InvalidOperand {
            field: self.name().to_string(),
            op: op.to_string(),
            value,
        };
        match self {
            Field::Property(_) => Ok(value),
            Field::Id | Field::Collection => {
                let all_strings = match &value {
                    Value::Array(values) => values.iter().all(Value::is_string),
                    value => value.is_string(),
                };
                if all_strings {
                    Ok(value)
                } else {
                    Err(invalid(value))
                }
            }
            Field::Datetime => {
                if op.is_string_match() {
                    return Err(invalid(value));
                }
                let normalize = |value: &Value| {
                    value
                        .as_str()
                        .and_then(|s| parse_rfc3339(s).ok())
                        .map(|datetime| Value::String(normalize_datetime(datetime)))
                };
                let normalized = match &value {
                    Value::Array(values) => values
                        .iter()
                        .map(normalize)
                        .collect::<Option<Vec<_>>>()
                        .map(Value::Array),
                    value => normalize(value),
                };
                normalized.ok_or_else(|| invalid(value))
            }
        }
    }

    fn normalize_key(&self, key: Value) -> Result<Value> {
        let invalid = || Error::InvalidCursor(format!("invalid sort value for {self}"));
        match (self, key) {
            (_, Value::Null) => Ok(Value::Null),
            (Field::Datetime, Value::String(s)) => parse_rfc3339(&s)
                .map(|datetime| Value::String(normalize_datetime(datetime)))
                .map_err(|_| invalid()),
            (Field::Datetime, _) => Err(invalid()),
            (Field::Id | Field::Collection, Value::String(s)) => Ok(Value::String(s)),
            (Field::Id | Field::Collection, _) => Err(invalid()),
            (Field::Property(_), key) => Ok(key),
        }
    }
}

fn normalize_datetime(datetime: chrono::DateTime<chrono::Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl FromStr for Field {
    type Err = Error;

    /// Resolves a request field name.
    ///
    /// `properties.` prefixes are optional.
    fn from_str(s: &str) -> Result<Field> {
        let s = s.trim();
        match s {
            "id" => Ok(Field::Id),
            "collection" => Ok(Field::Collection),
            "datetime" | "properties.datetime" => Ok(Field::Datetime),
            _ if s.is_empty() || UNSUPPORTED_FIELDS.contains(&s) => {
                Err(Error::UnsupportedField(s.to_string()))
            }
            _ => {
                let name = s.strip_prefix("properties.").unwrap_or(s);
                if name.is_empty() {
                    Err(Error::UnsupportedField(s.to_string()))
                } else {
                    Ok(Field::Property(name.to_string()))
                }
            }
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<&Sortby> for Order {
    type Error = Error;

    fn try_from(sortby: &Sortby) -> Result<Order> {
        Ok(Order {
            field: sortby.field.parse()?,
            direction: sortby.direction,
        })
    }
}

use crate::{Bbox, Config, Error, Fields, Interval, Result, Sortby};
use geojson::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// The parameters of an item search, as posted to `/search`.
///
/// The core parameters are defined by OGC API - Features, and STAC adds a few
/// for convenience. Unknown members are kept in `additional_fields` so they
/// can be echoed back in `POST` pagination links.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct Search {
    /// Array of one or more Collection IDs that each matching Item must be in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,

    /// Array of Item ids to return.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,

    /// Requested bounding box.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Bbox>,

    /// Searches items by performing intersection between their geometry and provided GeoJSON geometry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersects: Option<Geometry>,

    /// Single date+time, or a range ('/' separator), formatted to RFC 3339,
    /// section 5.6, or a partial date (`2023`, `2023-06`, `2023-06-15`).
    ///
    /// Use double dots `..` for open date ranges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// The query extension expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Map<String, Value>>,

    /// Fields by which to sort results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sortby: Vec<Sortby>,

    /// Include/exclude fields from item collections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Fields>,

    /// An opaque pagination token from a previous page's `next` or `prev` link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// The maximum number of results to return (page size).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Additional fields.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

/// GET parameters for the item search endpoint.
///
/// Every parameter is a string, as it arrives in a query string.
#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetSearch {
    /// Comma-delimited list of one or more Collection IDs that each matching Item must be in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<String>,

    /// Comma-delimited list of Item ids to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<String>,

    /// Searches items by performing intersection between their geometry and provided GeoJSON geometry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersects: Option<String>,

    /// Common items parameters.
    #[serde(flatten)]
    pub items: GetItems,
}

/// GET parameters for the `/collections/{collection_id}/items` endpoint.
#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetItems {
    /// The maximum number of results to return (page size).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,

    /// Requested bounding box, as a comma-delimited string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<String>,

    /// Single date+time, or a range ('/' separator).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// The query extension expression, as a JSON string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Fields by which to sort results, e.g. `+datetime,-eo:cloud_cover`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortby: Option<String>,

    /// Include/exclude fields, e.g. `id,properties.datetime,-geometry`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,

    /// An opaque pagination token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A validated, normalized search.
///
/// This is what the translator works from. Build one with
/// [Search::into_request].
#[derive(Clone, Debug)]
pub struct SearchRequest {
    /// Collection ids, any of which an item must be in.
    pub collections: Vec<String>,

    /// Item ids, any of which an item must have.
    pub ids: Vec<String>,

    /// The bounding box an item's geometry must intersect.
    pub bbox: Option<Bbox>,

    /// The geometry an item's geometry must intersect.
    pub intersects: Option<Geometry>,

    /// The interval an item's datetime must overlap.
    pub datetime: Option<Interval>,

    /// The raw query extension expression.
    ///
    /// It's parsed during translation, and only if the query extension is enabled.
    pub query: Option<Map<String, Value>>,

    /// The requested sort, without the collection and id tiebreakers.
    pub sortby: Vec<Sortby>,

    /// Fields to include or exclude.
    pub fields: Fields,

    /// The opaque pagination token.
    pub token: Option<String>,

    /// The page size, already defaulted and clamped.
    pub limit: u64,
}

impl Search {
    /// Creates a new, empty search.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Search;
    ///
    /// let search = Search::new();
    /// ```
    pub fn new() -> Search {
        Search::default()
    }

    /// Sets the collections of this search.
    pub fn collections(mut self, collections: Vec<String>) -> Search {
        self.collections = collections;
        self
    }

    /// Sets the ids of this search.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Search;
    /// let search = Search::new().ids(vec!["an-id".to_string()]);
    /// ```
    pub fn ids(mut self, ids: Vec<String>) -> Search {
        self.ids = ids;
        self
    }

    /// Sets the bbox of this search.
    pub fn bbox(mut self, bbox: impl Into<Bbox>) -> Search {
        self.bbox = Some(bbox.into());
        self
    }

    /// Sets the intersects of this search.
    pub fn intersects(mut self, intersects: impl Into<Geometry>) -> Search {
        self.intersects = Some(intersects.into());
        self
    }

    /// Sets the datetime of this search.
    pub fn datetime(mut self, datetime: impl ToString) -> Search {
        self.datetime = Some(datetime.to_string());
        self
    }

    /// Sets the query of this search.
    pub fn query(mut self, query: Map<String, Value>) -> Search {
        self.query = Some(query);
        self
    }

    /// Sets the sortby of this search.
    pub fn sortby(mut self, sortby: Vec<Sortby>) -> Search {
        self.sortby = sortby;
        self
    }

    /// Sets the fields of this search.
    pub fn fields(mut self, fields: Fields) -> Search {
        self.fields = Some(fields);
        self
    }

    /// Sets the pagination token of this search.
    pub fn token(mut self, token: impl ToString) -> Search {
        self.token = Some(token.to_string());
        self
    }

    /// Sets the limit of this search.
    pub fn limit(mut self, limit: u64) -> Search {
        self.limit = Some(limit);
        self
    }

    /// Validates and normalizes this search.
    ///
    /// A missing limit becomes the configured default, and a limit over the
    /// configured maximum is clamped to it. Fields are dropped if the fields
    /// extension is disabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{Config, Search};
    ///
    /// let config = Config::default();
    /// let request = Search::new().limit(1_000_000).into_request(&config).unwrap();
    /// assert_eq!(request.limit, config.max_limit);
    /// let _ = Search::new().limit(0).into_request(&config).unwrap_err();
    /// ```
    pub fn into_request(self, config: &Config) -> Result<SearchRequest> {
        if self.bbox.is_some() && self.intersects.is_some() {
            return Err(Error::SearchHasBboxAndIntersects);
        }
        if let Some(intersects) = self.intersects.clone() {
            let _: geo::Geometry = intersects.try_into().map_err(Box::new)?;
        }
        let limit = match self.limit {
            None => config.default_limit,
            Some(0) => return Err(Error::InvalidLimit("0".to_string())),
            Some(limit) => limit.min(config.max_limit),
        };
        let datetime = self
            .datetime
            .as_deref()
            .map(str::trim)
            .filter(|datetime| !datetime.is_empty())
            .map(|datetime| datetime.parse::<Interval>())
            .transpose()?;
        let fields = match self.fields {
            Some(fields) if !config.extensions.fields => {
                debug!(?fields, "fields extension is disabled, dropping fields");
                Fields::default()
            }
            fields => fields.unwrap_or_default(),
        };
        Ok(SearchRequest {
            collections: self.collections,
            ids: self.ids,
            bbox: self.bbox,
            intersects: self.intersects,
            datetime,
            query: self.query,
            sortby: self.sortby,
            fields,
            token: self.token.filter(|token| !token.is_empty()),
            limit,
        })
    }
}

impl GetItems {
    /// Converts these parameters into a search scoped to one collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::GetItems;
    ///
    /// let get_items = GetItems {
    ///     limit: Some("5".to_string()),
    ///     ..Default::default()
    /// };
    /// let search = get_items.search_collection("a-collection").unwrap();
    /// assert_eq!(search.collections, vec!["a-collection"]);
    /// assert_eq!(search.limit, Some(5));
    /// ```
    pub fn search_collection(self, collection_id: impl ToString) -> Result<Search> {
        let mut search = Search::try_from(self)?;
        search.collections = vec![collection_id.to_string()];
        Ok(search)
    }
}

impl TryFrom<GetItems> for Search {
    type Error = Error;

    fn try_from(get_items: GetItems) -> Result<Search> {
        let limit = get_items
            .limit
            .map(|limit| {
                limit
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidLimit(limit.clone()))
            })
            .transpose()?;
        let bbox = get_items
            .bbox
            .filter(|bbox| !bbox.trim().is_empty())
            .map(|bbox| bbox.parse::<Bbox>())
            .transpose()?;
        let query = get_items
            .query
            .filter(|query| !query.trim().is_empty())
            .map(|query| match serde_json::from_str(&query) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(Error::InvalidQuery(format!(
                    "query must be a JSON object: {query}"
                ))),
                Err(err) => Err(Error::InvalidQuery(err.to_string())),
            })
            .transpose()?;
        let sortby = get_items
            .sortby
            .map(|sortby| Sortby::parse_list(&sortby))
            .transpose()?
            .unwrap_or_default();
        let fields = get_items
            .fields
            .map(|fields| fields.parse::<Fields>())
            .transpose()?;
        Ok(Search {
            bbox,
            datetime: get_items.datetime,
            query,
            sortby,
            fields,
            token: get_items.token,
            limit,
            ..Default::default()
        })
    }
}

impl TryFrom<GetSearch> for Search {
    type Error = Error;

    fn try_from(get_search: GetSearch) -> Result<Search> {
        let intersects = get_search
            .intersects
            .filter(|intersects| !intersects.trim().is_empty())
            .map(|intersects| serde_json::from_str::<Geometry>(&intersects))
            .transpose()?;
        let mut search = Search::try_from(get_search.items)?;
        search.collections = split(get_search.collections);
        search.ids = split(get_search.ids);
        search.intersects = intersects;
        Ok(search)
    }
}

fn split(s: Option<String>) -> Vec<String> {
    s.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

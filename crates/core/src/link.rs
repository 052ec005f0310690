use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// The JSON media type.
pub const JSON: &str = "application/json";

/// The GeoJSON media type.
pub const GEOJSON: &str = "application/geo+json";

/// Link relations that are generated for every response, so stored copies
/// are dropped.
pub const INFERRED_RELS: [&str; 5] = ["self", "item", "parent", "collection", "root"];

/// A hypermedia link.
///
/// `method` and `body` are only used by `POST` pagination links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// The link target.
    pub href: String,

    /// The relationship between the current document and the target.
    pub rel: String,

    /// The media type of the target.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    /// A human readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The HTTP method to use when following this link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// The request body to send when following this link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Map<String, Value>>,
}

/// The request that produced a page, used to build its `self`, `next`, and
/// `prev` links.
#[derive(Debug, Clone)]
pub enum PageRequest {
    /// A `GET` request. Pagination links repeat the URL with a new `token`
    /// query parameter.
    Get(Url),

    /// A `POST` request. Pagination links repeat the body with a new `token`.
    Post {
        /// The URL that was posted to.
        url: Url,

        /// The JSON body that was posted.
        body: Map<String, Value>,
    },
}

impl Link {
    /// Creates a new link.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Link;
    ///
    /// let link = Link::new("http://stac.test/", "root");
    /// assert!(link.r#type.is_none());
    /// ```
    pub fn new(href: impl ToString, rel: impl ToString) -> Link {
        Link {
            href: href.to_string(),
            rel: rel.to_string(),
            r#type: None,
            title: None,
            method: None,
            body: None,
        }
    }

    /// Sets this link's type to JSON.
    pub fn json(mut self) -> Link {
        self.r#type = Some(JSON.to_string());
        self
    }

    /// Sets this link's type to GeoJSON.
    pub fn geojson(mut self) -> Link {
        self.r#type = Some(GEOJSON.to_string());
        self
    }

    /// Sets this link's title.
    pub fn title(mut self, title: impl ToString) -> Link {
        self.title = Some(title.to_string());
        self
    }

    /// Sets this link's method.
    pub fn method(mut self, method: impl ToString) -> Link {
        self.method = Some(method.to_string());
        self
    }

    /// Sets this link's body.
    pub fn body(mut self, body: Map<String, Value>) -> Link {
        self.body = Some(body);
        self
    }

    /// Returns true if this link's rel is one we always generate.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Link;
    ///
    /// assert!(Link::new("./item.json", "self").is_inferred());
    /// assert!(!Link::new("./license.txt", "license").is_inferred());
    /// ```
    pub fn is_inferred(&self) -> bool {
        INFERRED_RELS.contains(&self.rel.as_str())
    }
}

impl PageRequest {
    /// Returns the `self` link for the page.
    pub fn self_link(&self) -> Link {
        match self {
            PageRequest::Get(url) => Link::new(url, "self").geojson(),
            PageRequest::Post { url, body } => Link::new(url, "self")
                .geojson()
                .method("POST")
                .body(body.clone()),
        }
    }

    /// Returns a pagination link that carries this token.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::PageRequest;
    ///
    /// let request = PageRequest::Get("http://stac.test/search?limit=2&token=old".parse().unwrap());
    /// let link = request.paging_link("next", "new");
    /// assert_eq!(link.href, "http://stac.test/search?limit=2&token=new");
    /// assert_eq!(link.method.as_deref(), Some("GET"));
    /// ```
    pub fn paging_link(&self, rel: &str, token: &str) -> Link {
        match self {
            PageRequest::Get(url) => {
                let mut url = url.clone();
                let pairs: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(key, _)| key != "token")
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                let _ = url
                    .query_pairs_mut()
                    .clear()
                    .extend_pairs(pairs)
                    .append_pair("token", token);
                Link::new(url, rel).geojson().method("GET")
            }
            PageRequest::Post { url, body } => {
                let mut body = body.clone();
                let _ = body.insert("token".to_string(), Value::String(token.to_string()));
                Link::new(url, rel).geojson().method("POST").body(body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Link, PageRequest};
    use serde_json::json;

    #[test]
    fn serialize() {
        let link = Link::new("http://stac.test/", "root").json();
        assert_eq!(
            serde_json::to_value(link).unwrap(),
            json!({"href": "http://stac.test/", "rel": "root", "type": "application/json"})
        );
    }

    #[test]
    fn get_paging_link_keeps_other_parameters() {
        let request = PageRequest::Get(
            "http://stac.test/search?collections=c1&sortby=-datetime"
                .parse()
                .unwrap(),
        );
        let link = request.paging_link("prev", "abc_-");
        assert_eq!(
            link.href,
            "http://stac.test/search?collections=c1&sortby=-datetime&token=abc_-"
        );
        assert_eq!(link.rel, "prev");
        assert!(link.body.is_none());
    }

    #[test]
    fn post_paging_link() {
        let body = json!({"collections": ["c1"], "token": "old"});
        let request = PageRequest::Post {
            url: "http://stac.test/search".parse().unwrap(),
            body: body.as_object().unwrap().clone(),
        };
        let link = request.paging_link("next", "new");
        assert_eq!(link.href, "http://stac.test/search");
        assert_eq!(link.method.as_deref(), Some("POST"));
        assert_eq!(
            serde_json::Value::Object(link.body.unwrap()),
            json!({"collections": ["c1"], "token": "new"})
        );
    }
}

use crate::{Error, Result};
use url::{ParseError, Url};

/// Builds the URLs of an API's endpoints.
///
/// # Examples
///
/// ```
/// use stac_search::UrlBuilder;
///
/// let url_builder = UrlBuilder::new("http://stac.test/api").unwrap();
/// assert_eq!(url_builder.root().as_str(), "http://stac.test/api/");
/// assert_eq!(url_builder.item("a collection", "an-item").as_str(), "http://stac.test/api/collections/a%20collection/items/an-item");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    root: Url,
    conformance: Url,
    collections: Url,
    search: Url,
}

impl UrlBuilder {
    /// Creates a new url builder for the API rooted at this URL.
    ///
    /// A trailing slash is added if it's missing.
    pub fn new(url: &str) -> Result<UrlBuilder> {
        let root: Url = if url.ends_with('/') {
            url.parse()?
        } else {
            format!("{url}/").parse()?
        };
        if root.cannot_be_a_base() {
            return Err(Error::UrlParse(ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(UrlBuilder {
            conformance: root.join("conformance")?,
            collections: root.join("collections")?,
            search: root.join("search")?,
            root,
        })
    }

    /// Returns the root url.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Returns the conformance url.
    pub fn conformance(&self) -> &Url {
        &self.conformance
    }

    /// Returns the collections url.
    pub fn collections(&self) -> &Url {
        &self.collections
    }

    /// Returns the search url.
    pub fn search(&self) -> &Url {
        &self.search
    }

    /// Returns a collection's url.
    pub fn collection(&self, id: &str) -> Url {
        self.under_collections(&[id])
    }

    /// Returns the items url of a collection.
    pub fn items(&self, collection_id: &str) -> Url {
        self.under_collections(&[collection_id, "items"])
    }

    /// Returns an item's url.
    pub fn item(&self, collection_id: &str, item_id: &str) -> Url {
        self.under_collections(&[collection_id, "items", item_id])
    }

    fn under_collections(&self, segments: &[&str]) -> Url {
        let mut url = self.collections.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            let _ = path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::UrlBuilder;
    use rstest::rstest;

    #[rstest]
    #[case("http://stac.test")]
    #[case("http://stac.test/")]
    fn root(#[case] url: &str) {
        let url_builder = UrlBuilder::new(url).unwrap();
        assert_eq!(url_builder.root().as_str(), "http://stac.test/");
        assert_eq!(
            url_builder.conformance().as_str(),
            "http://stac.test/conformance"
        );
        assert_eq!(
            url_builder.collections().as_str(),
            "http://stac.test/collections"
        );
        assert_eq!(url_builder.search().as_str(), "http://stac.test/search");
        assert_eq!(
            url_builder.collection("c1").as_str(),
            "http://stac.test/collections/c1"
        );
        assert_eq!(
            url_builder.items("c1").as_str(),
            "http://stac.test/collections/c1/items"
        );
        assert_eq!(
            url_builder.item("c1", "i/1").as_str(),
            "http://stac.test/collections/c1/items/i%2F1"
        );
    }

    #[test]
    fn not_a_base() {
        let _ = UrlBuilder::new("mailto:someone@stac.test").unwrap_err();
        let _ = UrlBuilder::new("not a url").unwrap_err();
    }
}

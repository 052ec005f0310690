use serde::{Deserialize, Serialize};

/// The page size used when a request doesn't ask for one.
pub const DEFAULT_LIMIT: u64 = 10;

/// The largest page size a request can get.
pub const MAX_LIMIT: u64 = 10_000;

/// Search configuration.
///
/// # Examples
///
/// ```
/// use stac_search::Config;
///
/// let config: Config = serde_json::from_str(r#"{"max_limit": 100}"#).unwrap();
/// assert_eq!(config.default_limit, 10);
/// assert_eq!(config.max_limit, 100);
/// assert!(config.extensions.query);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The page size used when a request doesn't set `limit`.
    pub default_limit: u64,

    /// Requested limits above this value are clamped to it.
    pub max_limit: u64,

    /// Run a one-row backward probe so forward pages only carry a `prev`
    /// token when there really is an earlier page.
    ///
    /// Without the probe, a forward page has a `prev` token iff the request
    /// carried a token.
    pub exact_prev: bool,

    /// Which optional search extensions are enabled.
    pub extensions: Extensions,
}

/// The optional search extensions and whether each one is enabled.
///
/// A disabled extension's request member is ignored, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extensions {
    /// The [query](https://github.com/stac-api-extensions/query) extension.
    pub query: bool,

    /// The [sort](https://github.com/stac-api-extensions/sort) extension.
    pub sort: bool,

    /// The [fields](https://github.com/stac-api-extensions/fields) extension.
    pub fields: bool,

    /// The [context](https://github.com/stac-api-extensions/context) extension.
    pub context: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            exact_prev: false,
            extensions: Extensions::default(),
        }
    }
}

impl Default for Extensions {
    fn default() -> Extensions {
        Extensions {
            query: true,
            sort: true,
            fields: true,
            context: true,
        }
    }
}

impl Extensions {
    /// Returns extensions with everything turned off.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Extensions;
    ///
    /// let extensions = Extensions::none();
    /// assert!(!extensions.sort);
    /// ```
    pub fn none() -> Extensions {
        Extensions {
            query: false,
            sort: false,
            fields: false,
            context: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Extensions};

    #[test]
    fn partial_extensions() {
        let config: Config =
            serde_json::from_str(r#"{"extensions": {"fields": false}}"#).unwrap();
        assert!(!config.extensions.fields);
        assert!(config.extensions.sort);
        assert_eq!(config.max_limit, 10_000);
    }

    #[test]
    fn round_trip_defaults() {
        let value = serde_json::to_value(Config::default()).unwrap();
        let config: Config = serde_json::from_value(value).unwrap();
        assert_eq!(config, Config::default());
        assert_ne!(config.extensions, Extensions::none());
    }
}

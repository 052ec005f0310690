use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [PgStore](crate::PgStore).
///
/// The items table must have `id text`, `collection text`,
/// `datetime timestamptz` (the item's `datetime`, or its `start_datetime`),
/// `end_datetime timestamptz`, `geometry geometry` (SRID 4326), and
/// `content jsonb` (the whole item) columns. The collections table must have
/// `id text` and `content jsonb` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The items table, optionally schema-qualified.
    pub items_table: String,

    /// The collections table, optionally schema-qualified.
    pub collections_table: String,

    /// The maximum number of pooled connections.
    pub max_size: u32,

    /// How long to wait for a pooled connection, in seconds.
    pub connection_timeout_secs: u64,

    /// How long a query may run before it's cancelled, in seconds.
    pub query_timeout_secs: u64,
}

impl Config {
    /// Returns the connection timeout.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the query timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            items_table: "items".to_string(),
            collections_table: "collections".to_string(),
            max_size: 10,
            connection_timeout_secs: 10,
            query_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::time::Duration;

    #[test]
    fn partial() {
        let config: Config = serde_json::from_str(r#"{"items_table": "stac.items"}"#).unwrap();
        assert_eq!(config.items_table, "stac.items");
        assert_eq!(config.collections_table, "collections");
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
    }
}

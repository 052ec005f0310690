use serde::Serialize;
use thiserror::Error;

/// A boxed error that a store can hand back as the source of a failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error enum for crate-specific errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// [chrono::ParseError]
    #[error(transparent)]
    ChronoParse(#[from] chrono::ParseError),

    /// A datetime interval with no start and no end.
    #[error("empty datetime interval")]
    EmptyDatetimeInterval,

    /// [geojson::Error]
    #[error(transparent)]
    Geojson(#[from] Box<geojson::Error>),

    /// A field in the query expression can't be compared with the given operator or value.
    #[error("invalid operand for {op} on {field}: {value}")]
    InvalidOperand {
        /// The field being compared.
        field: String,

        /// The operator.
        op: String,

        /// The offending value.
        value: serde_json::Value,
    },

    /// This vector is not a valid bounding box.
    #[error("invalid bbox: {0:?}")]
    InvalidBbox(Vec<f64>),

    /// A pagination token that doesn't decode to a seek position.
    #[error("invalid pagination token: {0}")]
    InvalidCursor(String),

    /// This string is not a valid datetime interval.
    #[error("invalid datetime: {0}")]
    InvalidDatetime(String),

    /// A fields expression that can't be parsed.
    #[error("invalid fields: {0}")]
    InvalidFields(String),

    /// A limit that isn't a positive integer.
    #[error("invalid limit: {0}, limit must be a positive integer")]
    InvalidLimit(String),

    /// A query parameter that isn't valid JSON, or isn't a JSON object.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A sortby expression that can't be parsed.
    #[error("invalid sortby: {0}")]
    InvalidSortby(String),

    /// The year is out of range.
    #[error("invalid year: {0}")]
    InvalidYear(i32),

    /// A collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// An item does not exist.
    #[error("item not found: {item_id} in collection {collection_id}")]
    ItemNotFound {
        /// The collection id.
        collection_id: String,

        /// The item id.
        item_id: String,
    },

    /// A record is missing a required member.
    #[error("missing required member: {0}")]
    MissingMember(&'static str),

    /// A search can't have both a bbox and an intersects geometry.
    #[error("search has bbox and intersects")]
    SearchHasBboxAndIntersects,

    /// [serde_json::Error]
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// The start of a datetime interval is after its end.
    #[error("start ({0}) is after end ({1})")]
    StartIsAfterEnd(String, String),

    /// The store rejected the query.
    ///
    /// The source carries the store's own message, which is never shown to
    /// clients.
    #[error("the store could not run the query")]
    StoreQuery(#[source] BoxError),

    /// The store could not be reached, or did not answer in time.
    #[error("the store is unavailable")]
    StoreUnavailable(#[source] BoxError),

    /// The query extension operator isn't one we support.
    #[error("unsupported query operator: {0}")]
    UnsupportedOperator(String),

    /// The field can't be used for sorting or querying.
    #[error("unsupported field: {0}")]
    UnsupportedField(String),

    /// Partial date string that we couldn't figure out.
    #[error("unrecognized date format: {0}")]
    UnrecognizedDateFormat(String),

    /// [url::ParseError]
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
}

/// The stable, machine-readable category of an [Error].
///
/// The kind is what clients see in the `code` member of an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The request is malformed.
    ValidationError,

    /// The request is valid but can't be expressed as a store query.
    QueryTranslationError,

    /// The pagination token is malformed or has been tampered with.
    InvalidCursorError,

    /// A by-id lookup found nothing.
    NotFoundError,

    /// The store rejected the query.
    StoreQueryError,

    /// The store could not be reached.
    StoreUnavailableError,
}

impl Error {
    /// Returns this error's kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{Error, ErrorKind};
    ///
    /// let error = Error::InvalidLimit("0".to_string());
    /// assert_eq!(error.kind(), ErrorKind::ValidationError);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        use Error::*;

        match self {
            InvalidCursor(_) => ErrorKind::InvalidCursorError,
            InvalidOperand { .. } | UnsupportedOperator(_) | UnsupportedField(_) => {
                ErrorKind::QueryTranslationError
            }
            CollectionNotFound(_) | ItemNotFound { .. } => ErrorKind::NotFoundError,
            StoreQuery(_) => ErrorKind::StoreQueryError,
            StoreUnavailable(_) => ErrorKind::StoreUnavailableError,
            ChronoParse(_)
            | EmptyDatetimeInterval
            | Geojson(_)
            | InvalidBbox(_)
            | InvalidDatetime(_)
            | InvalidFields(_)
            | InvalidLimit(_)
            | InvalidQuery(_)
            | InvalidSortby(_)
            | InvalidYear(_)
            | MissingMember(_)
            | SearchHasBboxAndIntersects
            | SerdeJson(_)
            | StartIsAfterEnd(_, _)
            | UnrecognizedDateFormat(_)
            | UrlParse(_) => ErrorKind::ValidationError,
        }
    }

    /// Returns true if this error comes from the store rather than the request.
    ///
    /// Store errors are logged server-side and their detail is never shown to clients.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::StoreQueryError | ErrorKind::StoreUnavailableError
        )
    }
}

impl ErrorKind {
    /// Returns this kind as a static string.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::NotFoundError.as_str(), "NotFoundError");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::QueryTranslationError => "QueryTranslationError",
            ErrorKind::InvalidCursorError => "InvalidCursorError",
            ErrorKind::NotFoundError => "NotFoundError",
            ErrorKind::StoreQueryError => "StoreQueryError",
            ErrorKind::StoreUnavailableError => "StoreUnavailableError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

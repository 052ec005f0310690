use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Crate-specific error enum.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A record's `content` column doesn't hold a JSON object.
    #[error("stored {0} is not a JSON object")]
    NotAnObject(&'static str),

    /// [bb8::RunError]
    #[error(transparent)]
    Pool(#[from] bb8::RunError<tokio_postgres::Error>),

    /// The query ran longer than the configured timeout and was cancelled.
    #[error("query timed out after {0:?}")]
    QueryTimeout(Duration),

    /// [tokio_postgres::Error]
    #[error(transparent)]
    TokioPostgres(#[from] tokio_postgres::Error),

    /// A value can't be bound as a parameter for this field.
    #[error("cannot bind {value} to {field}")]
    Unbindable {
        /// The field.
        field: String,

        /// The value.
        value: Value,
    },
}

impl Error {
    /// Returns true if this error means the database couldn't be reached or
    /// didn't answer in time, as opposed to rejecting the query.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search_postgres::Error;
    /// use std::time::Duration;
    ///
    /// assert!(Error::QueryTimeout(Duration::from_secs(1)).is_unavailable());
    /// assert!(!Error::NotAnObject("item").is_unavailable());
    /// ```
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Pool(_) | Error::QueryTimeout(_) => true,
            Error::TokioPostgres(error) => {
                error.is_closed()
                    || error.as_db_error().is_some_and(|db_error| {
                        let code = db_error.code().code();
                        // Connection exceptions and operator intervention (shutdowns).
                        code.starts_with("08") || code.starts_with("57P")
                    })
            }
            Error::NotAnObject(_) | Error::Unbindable { .. } => false,
        }
    }
}

impl From<Error> for stac_search::Error {
    fn from(error: Error) -> stac_search::Error {
        if error.is_unavailable() {
            stac_search::Error::StoreUnavailable(Box::new(error))
        } else {
            stac_search::Error::StoreQuery(Box::new(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use serde_json::json;
    use stac_search::ErrorKind;
    use std::time::Duration;

    #[test]
    fn classify() {
        let error: stac_search::Error = Error::QueryTimeout(Duration::from_secs(30)).into();
        assert_eq!(error.kind(), ErrorKind::StoreUnavailableError);
        let error: stac_search::Error = Error::Unbindable {
            field: "datetime".to_string(),
            value: json!(42),
        }
        .into();
        assert_eq!(error.kind(), ErrorKind::StoreQueryError);
    }
}

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;
use stac_search::ErrorKind;
use thiserror::Error;

/// Crate-specific error enum.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The request body isn't a valid search.
    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    /// The query string isn't a valid search.
    #[error(transparent)]
    QueryRejection(#[from] QueryRejection),

    /// [serde_json::Error]
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// [stac_search::Error]
    #[error(transparent)]
    StacSearch(#[from] stac_search::Error),
}

/// The body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// A stable code for the kind of error.
    pub code: &'static str,

    /// A human-readable description.
    pub description: String,
}

impl Error {
    /// Returns the HTTP status code for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search_server::Error;
    /// use http::StatusCode;
    ///
    /// let error = Error::from(stac_search::Error::CollectionNotFound("c1".to_string()));
    /// assert_eq!(error.status(), StatusCode::NOT_FOUND);
    /// ```
    pub fn status(&self) -> StatusCode {
        match self {
            Error::JsonRejection(_) | Error::QueryRejection(_) => StatusCode::BAD_REQUEST,
            Error::SerdeJson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::StacSearch(error) => match error.kind() {
                ErrorKind::ValidationError
                | ErrorKind::QueryTranslationError
                | ErrorKind::InvalidCursorError => StatusCode::BAD_REQUEST,
                ErrorKind::NotFoundError => StatusCode::NOT_FOUND,
                ErrorKind::StoreQueryError => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::StoreUnavailableError => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    /// Returns the body of the response for this error.
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Error::JsonRejection(rejection) => ErrorResponse {
                code: ErrorKind::ValidationError.as_str(),
                description: rejection.body_text(),
            },
            Error::QueryRejection(rejection) => ErrorResponse {
                code: ErrorKind::ValidationError.as_str(),
                description: rejection.body_text(),
            },
            Error::SerdeJson(_) => ErrorResponse {
                code: "InternalError",
                description: "the response could not be serialized".to_string(),
            },
            Error::StacSearch(error) => ErrorResponse {
                code: error.kind().as_str(),
                description: error.to_string(),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                Error::StacSearch(error) => tracing::error!(
                    kind = %error.kind(),
                    source = ?std::error::Error::source(error),
                    "store error"
                ),
                error => tracing::error!(%error, "internal error"),
            }
        }
        (status, Json(self.to_response())).into_response()
    }
}

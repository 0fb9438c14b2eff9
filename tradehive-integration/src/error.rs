use thiserror::Error;

/// All errors generated while building or executing a signed REST request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("error parsing Url: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("SerDe Query String serialisation error: {0}")]
    QueryParams(#[from] serde_urlencoded::ser::Error),

    #[error("Serialising JSON error: {0}")]
    Serialise(serde_json::Error),

    #[error("Deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("HTTP request timed out")]
    HttpTimeout(reqwest::Error),

    #[error("HTTP transport error: {0}")]
    Http(reqwest::Error),

    #[error("HTTP response (status={0}) error: {1}")]
    HttpResponse(reqwest::StatusCode, String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::HttpTimeout(error)
        } else {
            TransportError::Http(error)
        }
    }
}

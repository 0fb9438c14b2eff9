use crate::error::TransportError;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Describes a single REST endpoint: method, path, query parameters, optional body and the
/// response type it deserialises into. Implementing this for each exchange endpoint is what
/// lets [`super::client::RestClient`] build, sign and execute requests generically.
pub trait RestRequest {
    type Response: DeserializeOwned;
    type QueryParams: Serialize;
    type Body: Serialize;

    fn path(&self) -> String;
    fn method() -> Method;
    fn query_params(&self) -> Option<&Self::QueryParams> {
        None
    }
    fn body(&self) -> Option<&Self::Body> {
        None
    }
    fn timeout() -> Duration {
        Duration::from_secs(5)
    }
    /// Whether this endpoint must be signed with API credentials.
    fn is_private() -> bool {
        false
    }
}

/// Parses a raw HTTP response into either `Request::Response` or a typed error. Each exchange
/// supplies its own [`HttpParser`] so venue-specific error bodies (rate-limit codes,
/// "unknown order" codes, ...) map onto a shared error taxonomy at the call boundary.
pub trait HttpParser {
    type ApiError: DeserializeOwned;
    type OutputError: From<TransportError>;

    fn parse<Response>(
        &self,
        status: reqwest::StatusCode,
        payload: &[u8],
    ) -> Result<Response, Self::OutputError>
    where
        Response: DeserializeOwned,
    {
        if status.is_success() {
            serde_json::from_slice(payload)
                .map_err(|error| {
                    TransportError::Deserialise {
                        error,
                        payload: String::from_utf8_lossy(payload).to_string(),
                    }
                    .into()
                })
        } else {
            Err(self.parse_api_error(status, payload))
        }
    }

    fn parse_api_error(
        &self,
        status: reqwest::StatusCode,
        payload: &[u8],
    ) -> Self::OutputError;
}

use thiserror::Error;
use tradehive_integration::TransportError;

/// Failure taxonomy returned to callers of [`crate::client::ExchangeClient`] (§4.2).
///
/// Every transport-level failure (timeouts, malformed JSON, non-2xx without a recognised
/// venue error code) collapses into this set so a worker loop only ever has to branch on
/// five cases.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// HTTP 429. The worker loop backs off ~60s and retries.
    #[error("rate limited by exchange")]
    RateLimited,

    /// HTTP 418. Fatal: the worker persists *error* and stops.
    #[error("banned by exchange (ip ban)")]
    IpBanned,

    /// Venue reports "unknown order" on a cancel. Treated as success of cancellation intent.
    #[error("order already gone: {0}")]
    AlreadyGone(String),

    /// Any other non-2xx or network hiccup the worker should retry after a short delay.
    #[error("transient exchange error: {0}")]
    Transient(String),

    /// Bad credentials or client misconfiguration. Fatal; the client is not-ready.
    #[error("exchange configuration/auth error: {0}")]
    ConfigAuth(String),
}

impl From<TransportError> for ExchangeError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::HttpTimeout(_) => ExchangeError::Transient(error.to_string()),
            other => ExchangeError::Transient(other.to_string()),
        }
    }
}

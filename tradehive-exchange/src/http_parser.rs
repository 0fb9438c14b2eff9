use crate::error::ExchangeError;
use reqwest::StatusCode;
use serde::Deserialize;
use tradehive_integration::protocol::http::rest::HttpParser;

/// Binance-shaped `{code, msg}` error body. `-2011` is the "unknown order" code returned on a
/// cancel against an order that is already filled/cancelled.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

const CODE_UNKNOWN_ORDER: i64 = -2011;

#[derive(Debug, Clone, Default)]
pub struct SpotHttpParser;

impl HttpParser for SpotHttpParser {
    type ApiError = ApiErrorBody;
    type OutputError = ExchangeError;

    fn parse_api_error(&self, status: StatusCode, payload: &[u8]) -> Self::OutputError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return ExchangeError::RateLimited;
        }
        if status.as_u16() == 418 {
            return ExchangeError::IpBanned;
        }

        match serde_json::from_slice::<ApiErrorBody>(payload) {
            Ok(body) if body.code == CODE_UNKNOWN_ORDER => ExchangeError::AlreadyGone(body.msg),
            Ok(body) if status.is_client_error() && status != StatusCode::UNAUTHORIZED => {
                ExchangeError::Transient(format!("[{}] {}", body.code, body.msg))
            }
            Ok(body) => ExchangeError::ConfigAuth(format!("[{}] {}", body.code, body.msg)),
            Err(_) => ExchangeError::Transient(format!(
                "status={status} body={}",
                String::from_utf8_lossy(payload)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_order_maps_to_already_gone() {
        let parser = SpotHttpParser;
        let body = br#"{"code":-2011,"msg":"Unknown order sent."}"#;
        let err = parser.parse_api_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, ExchangeError::AlreadyGone(_)));
    }

    #[test]
    fn rate_limit_status_short_circuits_body_parsing() {
        let parser = SpotHttpParser;
        let err = parser.parse_api_error(StatusCode::TOO_MANY_REQUESTS, b"");
        assert!(matches!(err, ExchangeError::RateLimited));
    }

    #[test]
    fn teapot_status_is_ip_ban() {
        let parser = SpotHttpParser;
        let err = parser.parse_api_error(StatusCode::from_u16(418).unwrap(), b"");
        assert!(matches!(err, ExchangeError::IpBanned));
    }
}

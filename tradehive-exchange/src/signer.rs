use derive_more::Constructor;
use hmac::Mac;
use tradehive_integration::{
    error::TransportError,
    protocol::http::{private::Signer, rest::RestRequest},
};

/// Alias matching the grounding codebase's `RequestSigner<Signer, Mac, Encoder>` composition:
/// HMAC-SHA256 over the URL-encoded query string, hex-encoded.
pub type SpotSigner =
    tradehive_integration::protocol::http::private::RequestSigner<ApiKeySigner, hmac::Hmac<sha2::Sha256>, tradehive_integration::protocol::http::private::HexEncoder>;

#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct ApiKeySigner {
    api_key: String,
}

pub struct ApiKeySignConfig<'a> {
    pub api_key: &'a str,
    pub request_params_to_sign: String,
}

impl Signer for ApiKeySigner {
    type Config<'a>
        = ApiKeySignConfig<'a>
    where
        Self: 'a;

    fn config<'a, Request>(
        &'a self,
        request: &Request,
        _builder: &reqwest::RequestBuilder,
    ) -> Result<Self::Config<'a>, TransportError>
    where
        Request: RestRequest,
    {
        let request_params_to_sign = request
            .query_params()
            .map(serde_urlencoded::to_string)
            .transpose()
            .map_err(TransportError::QueryParams)?
            .unwrap_or_default();

        Ok(ApiKeySignConfig {
            api_key: self.api_key.as_str(),
            request_params_to_sign,
        })
    }

    fn add_bytes_to_sign<M>(mac: &mut M, config: &Self::Config<'_>)
    where
        M: Mac,
    {
        mac.update(config.request_params_to_sign.as_bytes());
    }

    fn build_signed_request(
        config: Self::Config<'_>,
        builder: reqwest::RequestBuilder,
        signature: String,
    ) -> Result<reqwest::Request, TransportError> {
        const HEADER_API_KEY: &str = "X-MBX-APIKEY";
        const QUERY_SIGNATURE: &str = "signature";

        builder
            .header(HEADER_API_KEY, config.api_key)
            .query(&[(QUERY_SIGNATURE, signature)])
            .build()
            .map_err(TransportError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::GetAssetBalanceRequest;

    #[test]
    fn signs_query_params_deterministically() {
        let signer = ApiKeySigner::new("key".to_string());
        let request = GetAssetBalanceRequest::new("USDT", 0);
        let client = reqwest::Client::new();
        let builder = client.get("https://example.invalid");

        let config = signer.config(&request, &builder).expect("config");
        assert_eq!(config.api_key, "key");
        assert!(config.request_params_to_sign.contains("asset=USDT"));
    }
}

use crate::protocol::http::{private::BuildStrategy, rest::{HttpParser, RestRequest}};
use std::borrow::Cow;

/// Configurable REST client capable of executing (optionally signed) [`RestRequest`]s against
/// a single base URL. One instance is built per exchange venue; `Strategy` determines whether
/// (and how) requests are signed, `Parser` determines how responses and API errors are decoded.
#[derive(Debug, Clone)]
pub struct RestClient<'a, Strategy, Parser> {
    pub http_client: reqwest::Client,
    pub base_url: Cow<'a, str>,
    pub strategy: Strategy,
    pub parser: Parser,
}

impl<'a, Strategy, Parser> RestClient<'a, Strategy, Parser>
where
    Strategy: BuildStrategy,
    Parser: HttpParser,
{
    pub fn new(base_url: impl Into<Cow<'a, str>>, strategy: Strategy, parser: Parser) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            strategy,
            parser,
        }
    }

    /// Build, sign, execute and parse `request` in one call.
    pub async fn execute<Request>(
        &self,
        request: Request,
    ) -> Result<Request::Response, Parser::OutputError>
    where
        Request: RestRequest,
    {
        let built = self.build(request)?;
        let response = self.http_client.execute(built).await.map_err(|e| {
            Parser::OutputError::from(crate::error::TransportError::from(e))
        })?;

        let status = response.status();
        let payload = response.bytes().await.map_err(|e| {
            Parser::OutputError::from(crate::error::TransportError::from(e))
        })?;

        self.parser.parse::<Request::Response>(status, &payload)
    }

    fn build<Request>(
        &self,
        request: Request,
    ) -> Result<reqwest::Request, Parser::OutputError>
    where
        Request: RestRequest,
    {
        let url = format!("{}{}", self.base_url, request.path());
        let mut builder = self
            .http_client
            .request(Request::method(), url)
            .timeout(Request::timeout());

        if let Some(query) = request.query_params() {
            builder = builder.query(query);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        self.strategy
            .build(request, builder)
            .map_err(Parser::OutputError::from)
    }
}

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Method, RequestBuilder, Response};

use crate::error::ThreeDS2Error;

/// Thin wrapper over `reqwest` with the SDK's defaults: request timeout, user agent
/// and exponential retries for connection failures and timeouts.
///
/// Responses are never retried, whatever their status: the submissions sent through
/// here are not idempotent and a 5xx may come after the backend processed the call.
pub(crate) struct Request {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: usize,
}

impl Request {
    pub(crate) fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 2, // total attempts = 3
        }
    }

    fn req(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("checkout-3ds2-core/{}", env!("CARGO_PKG_VERSION")),
            )
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.req(Method::POST, url)
    }

    /// Sends a request built by [`Self::post`], retrying transport failures.
    /// Any HTTP response is returned as is.
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, ThreeDS2Error> {
        let Some(template) = request_builder.try_clone() else {
            // Streaming bodies cannot be replayed.
            return send(request_builder).await.map_err(Into::into);
        };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries);

        (|| async {
            let request_builder = template.try_clone().ok_or_else(|| SendError {
                url: "<unknown>".to_string(),
                error: "request cannot be retried because it is not cloneable".to_string(),
                retryable: false,
            })?;
            send(request_builder).await
        })
        .retry(backoff)
        .when(|err: &SendError| err.retryable)
        .notify(|err: &SendError, delay: Duration| {
            log::debug!("retrying {} in {delay:?}: {}", err.url, err.error);
        })
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug)]
struct SendError {
    url: String,
    error: String,
    retryable: bool,
}

impl From<SendError> for ThreeDS2Error {
    fn from(value: SendError) -> Self {
        Self::NetworkError {
            url: value.url,
            status: None,
            error: value.error,
        }
    }
}

async fn send(request_builder: RequestBuilder) -> Result<Response, SendError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| SendError {
        url: err
            .url()
            .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
        error: format!("request build failed: {err}"),
        retryable: false,
    })?;
    let url = request.url().to_string();

    client.execute(request).await.map_err(|err| SendError {
        url,
        error: format!("request failed: {err}"),
        retryable: err.is_timeout() || err.is_connect(),
    })
}

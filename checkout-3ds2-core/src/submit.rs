//! Client for the checkout shopper `submitThreeDS2Fingerprint` endpoint, used when a
//! combined `threeDS2` action asks the SDK to submit the fingerprint itself.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    action::{Action, RedirectAction},
    config::ComponentParams,
    error::ThreeDS2Error,
    http_request::Request,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitFingerprintRequest<'a> {
    fingerprint_result: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_data: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SubmitFingerprintResponse {
    Completed { details: Value },
    Action { action: Action },
}

/// What the backend wants the SDK to do after receiving the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFingerprintResult {
    /// Authentication is done; the details go to the merchant.
    Completed(Value),
    /// The shopper must be redirected.
    Redirect(RedirectAction),
    /// Another 3DS2 action follows, typically a challenge.
    Threeds2(Action),
}

/// Submits fingerprints to the checkout shopper API.
pub struct SubmitFingerprintClient {
    base_url: String,
    client_key: String,
    request: Request,
}

impl SubmitFingerprintClient {
    /// Creates a client for the URL and client key in `params`.
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::InvalidConfiguration`] if the base URL is not HTTPS
    /// (plain HTTP is only accepted for loopback hosts).
    pub fn new(params: &ComponentParams) -> Result<Self, ThreeDS2Error> {
        let base_url = params.checkout_shopper_url();
        let parsed = Url::parse(&base_url).map_err(|e| ThreeDS2Error::InvalidConfiguration {
            attribute: "base_url".to_string(),
            reason: e.to_string(),
        })?;
        let loopback = matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
        if parsed.scheme() != "https" && !(parsed.scheme() == "http" && loopback) {
            return Err(ThreeDS2Error::InvalidConfiguration {
                attribute: "base_url".to_string(),
                reason: "the checkout shopper API must be reached over https".to_string(),
            });
        }

        Ok(Self {
            base_url,
            client_key: params.client_key.clone(),
            request: Request::new(),
        })
    }

    /// Sends the encoded fingerprint and interprets the backend's answer.
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::NetworkError`] if the request fails or is rejected, and
    /// [`ThreeDS2Error::SerializationError`] if the response cannot be understood.
    pub async fn submit_fingerprint(
        &self,
        encoded_fingerprint: &str,
        payment_data: Option<&str>,
    ) -> Result<SubmitFingerprintResult, ThreeDS2Error> {
        let url = format!("{}/v1/submitThreeDS2Fingerprint", self.base_url);
        let body = SubmitFingerprintRequest {
            fingerprint_result: encoded_fingerprint,
            payment_data,
        };

        log::debug!("submitting fingerprint to {url}");
        let request_builder = self
            .request
            .post(&url)
            .query(&[("token", self.client_key.as_str())])
            .json(&body);
        let response = self.request.handle(request_builder).await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ThreeDS2Error::NetworkError {
                url,
                status: Some(status.as_u16()),
                error: format!("fingerprint submission failed: {error_body}"),
            });
        }

        let response: SubmitFingerprintResponse = response.json().await.map_err(|e| {
            ThreeDS2Error::SerializationError(format!(
                "failed to parse fingerprint submission response: {e}"
            ))
        })?;

        match response {
            SubmitFingerprintResponse::Completed { details } => {
                Ok(SubmitFingerprintResult::Completed(details))
            }
            SubmitFingerprintResponse::Action {
                action: Action::Redirect(redirect),
            } => Ok(SubmitFingerprintResult::Redirect(redirect)),
            SubmitFingerprintResponse::Action {
                action:
                    action @ (Action::ThreeDS2(_)
                    | Action::ThreeDS2Challenge(_)
                    | Action::ThreeDS2Fingerprint(_)),
            } => Ok(SubmitFingerprintResult::Threeds2(action)),
            SubmitFingerprintResponse::Action {
                action: Action::Unsupported,
            } => Err(ThreeDS2Error::SerializationError(
                "fingerprint submission returned an unsupported action".to_string(),
            )),
        }
    }
}

#[cfg(test)]
impl SubmitFingerprintClient {
    /// Create a client with a custom base URL (for testing).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_key: "test_ABCDEF1234567890".to_string(),
            request: Request::new(),
        }
    }
}

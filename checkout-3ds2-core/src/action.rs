//! Actions returned by the backend that the delegate is asked to handle.

use serde::Deserialize;
use strum::EnumString;

use crate::error::ThreeDS2Error;

/// An action from a `/payments` or `/payments/details` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Standalone fingerprint; the result is returned to the merchant for submission.
    #[serde(rename = "threeDS2Fingerprint")]
    ThreeDS2Fingerprint(ThreeDS2TokenAction),
    /// Standalone challenge following a manually submitted fingerprint.
    #[serde(rename = "threeDS2Challenge")]
    ThreeDS2Challenge(ThreeDS2TokenAction),
    /// Combined action; its `subtype` selects fingerprint or challenge.
    #[serde(rename = "threeDS2")]
    ThreeDS2(ThreeDS2Action),
    /// Browser redirect.
    #[serde(rename = "redirect")]
    Redirect(RedirectAction),
    /// Any action type this component does not know.
    #[serde(other)]
    Unsupported,
}

impl Action {
    /// Deserializes an action from its JSON representation.
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::SerializationError`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ThreeDS2Error> {
        serde_json::from_str(json)
            .map_err(|e| ThreeDS2Error::SerializationError(format!("invalid action json: {e}")))
    }

    /// The `paymentData` correlation token, if the action carries one.
    #[must_use]
    pub fn payment_data(&self) -> Option<&str> {
        match self {
            Self::ThreeDS2Fingerprint(action) | Self::ThreeDS2Challenge(action) => {
                action.payment_data.as_deref()
            }
            Self::ThreeDS2(action) => action.payment_data.as_deref(),
            Self::Redirect(action) => action.payment_data.as_deref(),
            Self::Unsupported => None,
        }
    }
}

/// Payload of the standalone fingerprint and challenge actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2TokenAction {
    /// Opaque correlation token to echo back with the details.
    pub payment_data: Option<String>,
    /// Base64 fingerprint or challenge token.
    pub token: Option<String>,
    /// Payment method the action belongs to.
    pub payment_method_type: Option<String>,
}

/// Payload of the combined `threeDS2` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2Action {
    /// Opaque correlation token to echo back with the details.
    pub payment_data: Option<String>,
    /// Base64 fingerprint or challenge token.
    pub token: Option<String>,
    /// `fingerprint` or `challenge`.
    pub subtype: Option<String>,
    /// Token to include in the `threeDSResult` details.
    pub authorisation_token: Option<String>,
    /// Payment method the action belongs to.
    pub payment_method_type: Option<String>,
}

/// Payload of a `redirect` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    /// Opaque correlation token to echo back with the details.
    pub payment_data: Option<String>,
    /// URL to open.
    pub url: Option<String>,
    /// HTTP method of the redirect.
    pub method: Option<String>,
}

/// Sub-flow selected by a combined `threeDS2` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SubType {
    /// Device fingerprinting.
    Fingerprint,
    /// Shopper challenge.
    Challenge,
}

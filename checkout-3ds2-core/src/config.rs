//! Component configuration supplied by the host application.

use serde::Deserialize;
use strum::EnumString;

use crate::error::ThreeDS2Error;

/// Timeout, in minutes, handed to the vendor SDK when starting a challenge.
pub const DEFAULT_CHALLENGE_TIMEOUT_MINUTES: u32 = 10;

const CLIENT_KEY_MIN_BODY_LEN: usize = 8;
const CLIENT_KEY_MAX_BODY_LEN: usize = 128;

/// The payment platform environment the checkout talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, EnumString, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Test platform; only accepts `test_` client keys.
    Test,
    /// Live platform; only accepts `live_` client keys.
    Live,
}

impl Environment {
    /// Base URL of the checkout shopper API for this environment.
    #[must_use]
    pub const fn checkout_shopper_url(self) -> &'static str {
        match self {
            Self::Test => "https://checkoutshopper-test.adyen.com/checkoutshopper",
            Self::Live => "https://checkoutshopper-live.adyen.com/checkoutshopper",
        }
    }

    const fn client_key_prefix(self) -> &'static str {
        match self {
            Self::Test => "test_",
            Self::Live => "live_",
        }
    }
}

/// Parameters the 3DS2 component is configured with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct ComponentParams {
    /// Public client key used to authenticate calls to the checkout shopper API.
    pub client_key: String,
    /// Platform environment.
    pub environment: Environment,
    /// App URL the ACS can use to return to the app after an out-of-band challenge.
    #[serde(default, rename = "threeDSRequestorAppURL")]
    pub threeds_requestor_app_url: Option<String>,
    /// Device parameters the vendor SDK must not collect.
    #[serde(default)]
    pub device_parameter_block_list: Vec<String>,
    /// Challenge timeout passed to the vendor SDK, in minutes.
    #[serde(default = "default_challenge_timeout")]
    pub challenge_timeout_minutes: u32,
    /// Overrides the checkout shopper base URL derived from `environment`.
    #[serde(default)]
    pub base_url: Option<String>,
}

const fn default_challenge_timeout() -> u32 {
    DEFAULT_CHALLENGE_TIMEOUT_MINUTES
}

impl ComponentParams {
    /// Creates parameters with SDK defaults for everything but the client key and environment.
    #[must_use]
    pub const fn new(client_key: String, environment: Environment) -> Self {
        Self {
            client_key,
            environment,
            threeds_requestor_app_url: None,
            device_parameter_block_list: Vec::new(),
            challenge_timeout_minutes: DEFAULT_CHALLENGE_TIMEOUT_MINUTES,
            base_url: None,
        }
    }

    /// Deserializes and validates parameters from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or the parameters fail [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, ThreeDS2Error> {
        let params: Self = serde_json::from_str(json).map_err(|e| {
            ThreeDS2Error::InvalidConfiguration {
                attribute: "params".to_string(),
                reason: format!("invalid component params json: {e}"),
            }
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Checks the client key format and that it belongs to the configured environment.
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::InvalidConfiguration`] naming the rejected attribute.
    pub fn validate(&self) -> Result<(), ThreeDS2Error> {
        let invalid = |attribute: &str, reason: &str| ThreeDS2Error::InvalidConfiguration {
            attribute: attribute.to_string(),
            reason: reason.to_string(),
        };

        let Some((prefix, body)) = self.client_key.split_once('_') else {
            return Err(invalid("client_key", "client key has no environment prefix"));
        };
        if !matches!(prefix, "test" | "live") {
            return Err(invalid("client_key", "unknown client key prefix"));
        }
        if !(CLIENT_KEY_MIN_BODY_LEN..=CLIENT_KEY_MAX_BODY_LEN).contains(&body.len())
            || !body.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid("client_key", "malformed client key"));
        }
        if !self.client_key.starts_with(self.environment.client_key_prefix()) {
            return Err(invalid(
                "client_key",
                "client key does not match the environment",
            ));
        }
        if self.challenge_timeout_minutes < 5 {
            // EMV 3DS requires at least five minutes for a challenge.
            return Err(invalid(
                "challenge_timeout_minutes",
                "must be at least 5 minutes",
            ));
        }
        Ok(())
    }

    /// The checkout shopper base URL, without a trailing slash.
    #[must_use]
    pub fn checkout_shopper_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.checkout_shopper_url())
            .trim_end_matches('/')
            .to_string()
    }
}

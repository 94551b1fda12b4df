//! Builders for the details payloads sent to the backend's `/payments/details`.

use reqwest::Url;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{codec::encode_base64, error::ThreeDS2Error};

const FINGERPRINT_DETAILS_KEY: &str = "threeds2.fingerprint";
const CHALLENGE_DETAILS_KEY: &str = "threeds2.challengeResult";
const THREEDS_RESULT_KEY: &str = "threeDSResult";

const PAYLOAD_PARAMETER: &str = "payload";
const REDIRECT_RESULT_PARAMETER: &str = "redirectResult";
const PAYMENT_RESULT_PARAMETER: &str = "PaRes";
const MD_PARAMETER: &str = "MD";
const QUERY_STRING_RESULT: &str = "returnUrlQueryString";

#[derive(Serialize)]
struct ChallengeResultPayload<'a> {
    #[serde(rename = "transStatus")]
    trans_status: &'a str,
    #[serde(rename = "authorisationToken", skip_serializing_if = "Option::is_none")]
    authorisation_token: Option<&'a str>,
    #[serde(rename = "errorDetails", skip_serializing_if = "Option::is_none")]
    error_details: Option<&'a str>,
}

/// Details for a fingerprint the merchant submits manually.
#[must_use]
pub fn fingerprint_details(encoded_fingerprint: &str) -> Value {
    single_entry(FINGERPRINT_DETAILS_KEY, encoded_fingerprint.to_string())
}

/// Details reporting the final transaction status of an authentication.
///
/// With an `authorisation_token` (the action was a combined `threeDS2` action) the
/// status goes under `threeDSResult` together with the token; without one it goes
/// under `threeds2.challengeResult`.
///
/// # Errors
/// Returns [`ThreeDS2Error::SerializationError`] if the payload cannot be serialized.
pub fn make_details(
    transaction_status: &str,
    error_details: Option<&str>,
    authorisation_token: Option<&str>,
) -> Result<Value, ThreeDS2Error> {
    let payload = ChallengeResultPayload {
        trans_status: transaction_status,
        authorisation_token,
        error_details,
    };
    let bytes = serde_json::to_vec(&payload).map_err(|e| {
        ThreeDS2Error::SerializationError(format!("failed to create details: {e}"))
    })?;

    let key = if authorisation_token.is_some() {
        THREEDS_RESULT_KEY
    } else {
        CHALLENGE_DETAILS_KEY
    };
    Ok(single_entry(key, encode_base64(bytes)))
}

fn single_entry(key: &str, value: String) -> Value {
    let mut details = Map::new();
    details.insert(key.to_string(), Value::String(value));
    Value::Object(details)
}

/// Extracts the details from the URL the shopper was redirected back to.
///
/// # Errors
/// Returns [`ThreeDS2Error::Redirect`] if the URL is malformed or has no usable query.
pub fn parse_redirect_result(url: &str) -> Result<Value, ThreeDS2Error> {
    log::debug!("parse_redirect_result - {url}");
    let url = Url::parse(url)
        .map_err(|e| ThreeDS2Error::Redirect(format!("invalid redirect url: {e}")))?;
    let query_parameter = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let mut details = Map::new();
    for name in [PAYLOAD_PARAMETER, REDIRECT_RESULT_PARAMETER] {
        if let Some(value) = query_parameter(name) {
            details.insert(name.to_string(), Value::String(value));
        }
    }
    if let (Some(pa_res), Some(md)) = (
        query_parameter(PAYMENT_RESULT_PARAMETER),
        query_parameter(MD_PARAMETER),
    ) {
        details.insert(PAYMENT_RESULT_PARAMETER.to_string(), Value::String(pa_res));
        details.insert(MD_PARAMETER.to_string(), Value::String(md));
    }

    if details.is_empty() {
        if let Some(query) = url.query().filter(|query| !query.is_empty()) {
            details.insert(
                QUERY_STRING_RESULT.to_string(),
                Value::String(query.to_string()),
            );
        }
    }

    if details.is_empty() {
        return Err(ThreeDS2Error::Redirect(
            "Error parsing redirect result, could not find any query parameters"
                .to_string(),
        ));
    }
    Ok(Value::Object(details))
}

//! Decoding of the opaque 3DS2 tokens issued by the backend and encoding of the
//! device fingerprint sent back to it.
//!
//! Tokens are base64-encoded JSON objects. Decoding is all-or-nothing: any base64,
//! UTF-8 or JSON failure yields [`ThreeDS2Error::TokenDecoding`].

use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{error::ThreeDS2Error, sdk::AuthenticationRequestParameters};

/// Lenient decoder: backends are not consistent about padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Directory server information needed to fingerprint the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FingerprintToken {
    /// Registered application provider identifier of the directory server.
    #[serde(rename = "directoryServerId")]
    pub directory_server_id: Option<String>,
    /// Public key used to encrypt the device data for the directory server.
    #[serde(rename = "directoryServerPublicKey")]
    pub directory_server_public_key: Option<String>,
    /// Root certificates used to verify the ACS signed content.
    #[serde(rename = "directoryServerRootCertificates")]
    pub directory_server_root_certificates: Option<String>,
    /// Protocol version the transaction must be created with.
    #[serde(rename = "threeDSMessageVersion")]
    pub threeds_message_version: Option<String>,
    /// Transaction id assigned by the 3DS server.
    #[serde(rename = "threeDSServerTransID")]
    pub threeds_server_trans_id: Option<String>,
}

/// ACS information needed to start a challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChallengeToken {
    /// Transaction id assigned by the 3DS server.
    #[serde(rename = "threeDSServerTransID")]
    pub threeds_server_trans_id: Option<String>,
    /// Transaction id assigned by the ACS.
    #[serde(rename = "acsTransID")]
    pub acs_trans_id: Option<String>,
    /// EMVCo reference number of the ACS.
    #[serde(rename = "acsReferenceNumber")]
    pub acs_reference_number: Option<String>,
    /// JWS produced by the ACS.
    #[serde(rename = "acsSignedContent")]
    pub acs_signed_content: Option<String>,
    /// Protocol version negotiated for this challenge.
    #[serde(rename = "messageVersion")]
    pub message_version: Option<String>,
    /// Endpoint of the ACS.
    #[serde(rename = "acsURL")]
    pub acs_url: Option<String>,
    /// Notification endpoint of the 3DS server.
    #[serde(rename = "threeDSNotificationURL")]
    pub threeds_notification_url: Option<String>,
}

/// Wire shape of the encoded device fingerprint.
#[derive(Serialize)]
struct FingerprintPayload<'a> {
    #[serde(rename = "sdkAppID")]
    sdk_app_id: &'a str,
    #[serde(rename = "sdkEncData")]
    sdk_enc_data: &'a str,
    #[serde(rename = "sdkEphemPubKey")]
    sdk_ephem_pub_key: Value,
    #[serde(rename = "sdkReferenceNumber")]
    sdk_reference_number: &'a str,
    #[serde(rename = "sdkTransID")]
    sdk_trans_id: &'a str,
    #[serde(rename = "messageVersion")]
    message_version: &'a str,
}

/// Decodes the token of a fingerprint action.
///
/// # Errors
/// Returns [`ThreeDS2Error::TokenDecoding`] if the token is not base64-encoded JSON.
pub fn decode_fingerprint_token(encoded: &str) -> Result<FingerprintToken, ThreeDS2Error> {
    decode_token(encoded, "fingerprint")
}

/// Decodes the token of a challenge action.
///
/// # Errors
/// Returns [`ThreeDS2Error::TokenDecoding`] if the token is not base64-encoded JSON.
pub fn decode_challenge_token(encoded: &str) -> Result<ChallengeToken, ThreeDS2Error> {
    decode_token(encoded, "challenge")
}

fn decode_token<T: DeserializeOwned>(encoded: &str, name: &str) -> Result<T, ThreeDS2Error> {
    let bytes = decode_base64(encoded).map_err(|e| {
        ThreeDS2Error::TokenDecoding(format!("{name} token is not valid base64: {e}"))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ThreeDS2Error::TokenDecoding(format!("JSON parsing of {name} token failed: {e}"))
    })
}

/// Decodes standard base64, ignoring whitespace and padding.
pub(crate) fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    LENIENT.decode(compact)
}

/// Encodes bytes as padded standard base64.
pub(crate) fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Builds the base64 fingerprint the backend expects from the SDK's request parameters.
///
/// # Errors
/// Returns [`ThreeDS2Error::FingerprintCreation`] if the ephemeral public key is not a
/// JSON object (a JWK) or the payload cannot be serialized.
pub fn encode_fingerprint(
    params: &AuthenticationRequestParameters,
) -> Result<String, ThreeDS2Error> {
    let sdk_ephem_pub_key: Value = serde_json::from_str(&params.sdk_ephemeral_public_key)
        .ok()
        .filter(Value::is_object)
        .ok_or_else(|| {
            ThreeDS2Error::FingerprintCreation(
                "Failed to create encoded fingerprint: ephemeral public key is not a JSON object"
                    .to_string(),
            )
        })?;

    let payload = FingerprintPayload {
        sdk_app_id: &params.sdk_app_id,
        sdk_enc_data: &params.device_data,
        sdk_ephem_pub_key,
        sdk_reference_number: &params.sdk_reference_number,
        sdk_trans_id: &params.sdk_transaction_id,
        message_version: &params.message_version,
    };
    let json = serde_json::to_vec(&payload).map_err(|e| {
        ThreeDS2Error::FingerprintCreation(format!("Failed to create encoded fingerprint: {e}"))
    })?;
    Ok(encode_base64(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_params() -> AuthenticationRequestParameters {
        AuthenticationRequestParameters {
            sdk_app_id: "app-id".to_string(),
            device_data: "enc-data".to_string(),
            sdk_ephemeral_public_key: r#"{"kty":"EC","crv":"P-256","x":"x","y":"y"}"#
                .to_string(),
            sdk_reference_number: "ref".to_string(),
            sdk_transaction_id: "trans-id".to_string(),
            message_version: "2.2.0".to_string(),
        }
    }

    #[test]
    fn test_decode_fingerprint_token() {
        let encoded = encode_base64(
            r#"{
                "directoryServerId": "A000000003",
                "directoryServerPublicKey": "key",
                "directoryServerRootCertificates": "certs",
                "threeDSMessageVersion": "2.2.0",
                "threeDSServerTransID": "server-trans",
                "somethingElse": 42
            }"#,
        );
        let token = decode_fingerprint_token(&encoded).unwrap();
        assert_eq!(token.directory_server_id.as_deref(), Some("A000000003"));
        assert_eq!(token.directory_server_public_key.as_deref(), Some("key"));
        assert_eq!(
            token.directory_server_root_certificates.as_deref(),
            Some("certs")
        );
        assert_eq!(token.threeds_message_version.as_deref(), Some("2.2.0"));
        assert_eq!(token.threeds_server_trans_id.as_deref(), Some("server-trans"));
    }

    #[test]
    fn test_decode_tolerates_missing_padding_and_line_breaks() {
        let encoded = encode_base64(r#"{"messageVersion":"2.1.0"}"#);
        let unpadded = encoded.trim_end_matches('=');
        let (head, tail) = unpadded.split_at(10);
        let wrapped = format!("{head}\n{tail}\n");

        let token = decode_challenge_token(&wrapped).unwrap();
        assert_eq!(token.message_version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn test_decode_challenge_token() {
        let encoded = encode_base64(
            r#"{
                "threeDSServerTransID": "server",
                "acsTransID": "acs",
                "acsReferenceNumber": "acs-ref",
                "acsSignedContent": "jws",
                "messageVersion": "2.2.0",
                "acsURL": "https://acs.example"
            }"#,
        );
        let token = decode_challenge_token(&encoded).unwrap();
        assert_eq!(token.acs_trans_id.as_deref(), Some("acs"));
        assert_eq!(token.acs_signed_content.as_deref(), Some("jws"));
        assert_eq!(token.threeds_notification_url, None);
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_fingerprint_token("not valid base64!!!").unwrap_err();
        assert!(matches!(err, ThreeDS2Error::TokenDecoding(_)));
    }

    #[test]
    fn test_decode_invalid_json() {
        let err = decode_fingerprint_token(&encode_base64("{not json")).unwrap_err();
        assert!(matches!(err, ThreeDS2Error::TokenDecoding(_)));
    }

    #[test]
    fn test_decode_non_object_json() {
        let err = decode_challenge_token(&encode_base64("[1, 2]")).unwrap_err();
        assert!(matches!(err, ThreeDS2Error::TokenDecoding(_)));
    }

    #[test]
    fn test_encoded_fingerprint_has_exactly_the_six_keys() {
        let encoded = encode_fingerprint(&auth_params()).unwrap();
        let json: Value = serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
        let object = json.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "messageVersion",
                "sdkAppID",
                "sdkEncData",
                "sdkEphemPubKey",
                "sdkReferenceNumber",
                "sdkTransID"
            ]
        );
        assert_eq!(object["sdkEphemPubKey"]["kty"], "EC");
        assert_eq!(object["sdkEncData"], "enc-data");
    }

    #[test]
    fn test_encode_fingerprint_rejects_non_json_public_key() {
        let mut params = auth_params();
        params.sdk_ephemeral_public_key = "not a jwk".to_string();
        let err = encode_fingerprint(&params).unwrap_err();
        assert!(matches!(err, ThreeDS2Error::FingerprintCreation(_)));
    }
}

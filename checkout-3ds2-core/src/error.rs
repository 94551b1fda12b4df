use strum::Display;
use thiserror::Error;

/// Error outputs from the 3DS2 authentication core.
///
/// Every variant maps to an [`ErrorKind`], which is what the host receives on the
/// event channel together with the rendered message.
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum ThreeDS2Error {
    /// The action handed to the delegate is not a 3DS2 action.
    #[error("unsupported_action: {0}")]
    UnsupportedAction(String),
    /// The action carries no (or an empty) token.
    #[error("token_missing: {0}")]
    TokenMissing(String),
    /// The token is not valid base64-encoded JSON of the expected shape.
    #[error("token_decoding: {0}")]
    TokenDecoding(String),
    /// The fingerprint token lacks the directory server information.
    #[error("config_creation: {0}")]
    ConfigCreation(String),
    /// The vendor SDK could not create a transaction.
    #[error("transaction_creation: {0}")]
    TransactionCreation(String),
    /// A challenge was requested without a transaction from a prior fingerprint.
    #[error("transaction_missing: {0}")]
    TransactionMissing(String),
    /// The device fingerprint could not be read or encoded.
    #[error("fingerprint_creation: {0}")]
    FingerprintCreation(String),
    /// The vendor SDK refused to start the challenge.
    #[error("challenge_handling: {0}")]
    ChallengeHandling(String),
    /// Network connection error with details
    #[error("network_error (attempted endpoint: {url}): {error}")]
    NetworkError {
        /// The URL of the request
        url: String,
        /// The HTTP status code of the request
        status: Option<u16>,
        /// The error message
        error: String,
    },
    /// A redirect could not be launched or its result could not be parsed.
    #[error("redirect: {0}")]
    Redirect(String),
    /// Unexpected error (de)serializing a payload.
    #[error("serialization_error: {0}")]
    SerializationError(String),
    /// The component parameters are not usable.
    #[error("invalid_configuration: {attribute}: {reason}")]
    InvalidConfiguration {
        /// The offending attribute.
        attribute: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Unexpected failure inside the authentication flow.
    #[error("internal: {0}")]
    Internal(String),
}

impl ThreeDS2Error {
    /// Returns the taxonomy tag for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedAction(_) => ErrorKind::UnsupportedAction,
            Self::TokenMissing(_) => ErrorKind::TokenMissing,
            Self::TokenDecoding(_) => ErrorKind::TokenDecoding,
            Self::ConfigCreation(_) => ErrorKind::ConfigCreation,
            Self::TransactionCreation(_) => ErrorKind::TransactionCreation,
            Self::TransactionMissing(_) => ErrorKind::TransactionMissing,
            Self::FingerprintCreation(_) => ErrorKind::FingerprintCreation,
            Self::ChallengeHandling(_) => ErrorKind::ChallengeHandling,
            Self::NetworkError { .. } => ErrorKind::Network,
            Self::Redirect(_) => ErrorKind::Redirect,
            Self::SerializationError(_) => ErrorKind::Serialization,
            Self::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<reqwest::Error> for ThreeDS2Error {
    fn from(error: reqwest::Error) -> Self {
        Self::NetworkError {
            url: error
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            status: error.status().map(|status| status.as_u16()),
            error: error.to_string(),
        }
    }
}

/// Taxonomy of errors emitted on the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ThreeDS2Error::UnsupportedAction`].
    UnsupportedAction,
    /// See [`ThreeDS2Error::TokenMissing`].
    TokenMissing,
    /// See [`ThreeDS2Error::TokenDecoding`].
    TokenDecoding,
    /// See [`ThreeDS2Error::ConfigCreation`].
    ConfigCreation,
    /// See [`ThreeDS2Error::TransactionCreation`].
    TransactionCreation,
    /// See [`ThreeDS2Error::TransactionMissing`].
    TransactionMissing,
    /// See [`ThreeDS2Error::FingerprintCreation`].
    FingerprintCreation,
    /// See [`ThreeDS2Error::ChallengeHandling`].
    ChallengeHandling,
    /// See [`ThreeDS2Error::NetworkError`].
    Network,
    /// See [`ThreeDS2Error::Redirect`].
    Redirect,
    /// See [`ThreeDS2Error::SerializationError`].
    Serialization,
    /// See [`ThreeDS2Error::InvalidConfiguration`].
    InvalidConfiguration,
    /// See [`ThreeDS2Error::Internal`].
    Internal,
}

/// Errors raised across the vendor 3DS2 SDK boundary.
#[derive(Debug, Error, uniffi::Error)]
pub enum SdkError {
    /// The SDK was used before `initialize` succeeded (or after `cleanup`).
    #[error("sdk not initialized")]
    NotInitialized,
    /// The SDK rejected the supplied parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Any other runtime failure reported by the SDK.
    #[error("sdk runtime error: {0}")]
    Runtime(String),
    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for SdkError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Errors raised by the host's redirect launcher.
#[derive(Debug, Error, uniffi::Error)]
pub enum RedirectError {
    /// No application on the device can open the URL.
    #[error("no handler for url: {0}")]
    NoHandler(String),
    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for RedirectError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

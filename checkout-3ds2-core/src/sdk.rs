//! Contract of the vendor 3DS2 SDK.
//!
//! The SDK is implemented natively by the host (it wraps the certified 3DS2 library
//! on each platform) and handed to the delegate as trait objects. Every call may fail;
//! failures cross the boundary as [`SdkError`].

use std::sync::Arc;

use crate::{
    codec::{ChallengeToken, FingerprintToken},
    error::SdkError,
};

/// Protocol version that predates the `threeDSRequestorAppURL` challenge field.
pub const PROTOCOL_VERSION_2_1_0: &str = "2.1.0";

/// Entry point of the vendor SDK.
#[uniffi::export(with_foreign)]
pub trait ThreeDS2Service: Send + Sync {
    /// Initializes the SDK for the given directory server.
    ///
    /// # Errors
    /// Returns an error if the SDK throws while initializing.
    fn initialize(&self, config: ConfigParameters) -> Result<InitializeResult, SdkError>;

    /// Creates a transaction for the given protocol message version.
    ///
    /// # Errors
    /// Returns [`SdkError::NotInitialized`] if called before [`Self::initialize`], or
    /// [`SdkError::Runtime`] for any other failure.
    fn create_transaction(&self, message_version: String)
        -> Result<TransactionResult, SdkError>;

    /// Releases the resources held by the SDK.
    ///
    /// # Errors
    /// Returns [`SdkError::NotInitialized`] when there is nothing to clean up.
    fn cleanup(&self) -> Result<(), SdkError>;
}

/// A live 3DS2 transaction.
#[uniffi::export(with_foreign)]
pub trait Transaction: Send + Sync {
    /// Device data collected for the authentication request, if the SDK produced any.
    fn authentication_request_parameters(&self) -> Option<AuthenticationRequestParameters>;

    /// Starts the challenge UI. The outcome is reported later through `handler`.
    ///
    /// # Errors
    /// Returns [`SdkError::InvalidInput`] if the challenge parameters are rejected.
    fn do_challenge(
        &self,
        params: ChallengeParameters,
        handler: Arc<dyn ChallengeStatusHandler>,
        timeout_minutes: u32,
    ) -> Result<(), SdkError>;

    /// Releases the transaction.
    fn close(&self);
}

/// Receives the outcome of a challenge. May be invoked from any thread.
#[uniffi::export(with_foreign)]
pub trait ChallengeStatusHandler: Send + Sync {
    /// Called exactly once per challenge.
    fn on_completion(&self, result: ChallengeResult);
}

/// Outcome of [`ThreeDS2Service::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum InitializeResult {
    /// The SDK is ready.
    Success,
    /// The SDK reported a structured failure the backend must interpret.
    Failure {
        /// EMV transaction status to report.
        transaction_status: String,
        /// Additional detail provided by the SDK.
        additional_details: Option<String>,
    },
}

/// Outcome of [`ThreeDS2Service::create_transaction`].
#[derive(uniffi::Enum)]
pub enum TransactionResult {
    /// A transaction was created.
    Success {
        /// The new transaction.
        transaction: Arc<dyn Transaction>,
    },
    /// The SDK reported a structured failure the backend must interpret.
    Failure {
        /// EMV transaction status to report.
        transaction_status: String,
        /// Additional detail provided by the SDK.
        additional_details: Option<String>,
    },
}

/// Outcome of a challenge.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ChallengeResult {
    /// The shopper finished the challenge.
    Completed {
        /// EMV transaction status.
        transaction_status: String,
    },
    /// The shopper cancelled the challenge.
    Cancelled {
        /// EMV transaction status.
        transaction_status: String,
        /// Additional detail provided by the SDK.
        additional_details: Option<String>,
    },
    /// The challenge timed out.
    Timeout {
        /// EMV transaction status.
        transaction_status: String,
        /// Additional detail provided by the SDK.
        additional_details: Option<String>,
    },
    /// The challenge failed (protocol or runtime error).
    Error {
        /// EMV transaction status.
        transaction_status: String,
        /// Additional detail provided by the SDK.
        additional_details: Option<String>,
    },
}

impl ChallengeResult {
    /// Transaction status and additional detail carried by the result.
    #[must_use]
    pub fn status_and_details(&self) -> (&str, Option<&str>) {
        match self {
            Self::Completed { transaction_status } => (transaction_status, None),
            Self::Cancelled {
                transaction_status,
                additional_details,
            }
            | Self::Timeout {
                transaction_status,
                additional_details,
            }
            | Self::Error {
                transaction_status,
                additional_details,
            } => (transaction_status, additional_details.as_deref()),
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Cancelled { .. } => "cancelled",
            Self::Timeout { .. } => "timeout",
            Self::Error { .. } => "error",
        }
    }
}

/// Device data produced by a transaction, the input of the encoded fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AuthenticationRequestParameters {
    /// Identifier of the app installation.
    pub sdk_app_id: String,
    /// Device data encrypted for the directory server (JWE).
    pub device_data: String,
    /// Ephemeral public key as a JWK JSON string.
    pub sdk_ephemeral_public_key: String,
    /// EMVCo reference number of the SDK.
    pub sdk_reference_number: String,
    /// Transaction id assigned by the SDK.
    pub sdk_transaction_id: String,
    /// Protocol message version.
    pub message_version: String,
}

/// Configuration handed to [`ThreeDS2Service::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ConfigParameters {
    /// Registered application provider identifier of the directory server.
    pub directory_server_id: String,
    /// Public key of the directory server.
    pub directory_server_public_key: String,
    /// Root certificates of the directory server.
    pub directory_server_root_certificates: String,
    /// Device parameters the SDK must not collect.
    pub device_parameter_block_list: Vec<String>,
}

impl ConfigParameters {
    /// Builds the configuration from a fingerprint token.
    ///
    /// Returns `None` unless the directory server id, public key and root
    /// certificates are all present.
    #[must_use]
    pub fn from_token(
        token: &FingerprintToken,
        device_parameter_block_list: &[String],
    ) -> Option<Self> {
        Some(Self {
            directory_server_id: token.directory_server_id.clone()?,
            directory_server_public_key: token.directory_server_public_key.clone()?,
            directory_server_root_certificates: token
                .directory_server_root_certificates
                .clone()?,
            device_parameter_block_list: device_parameter_block_list.to_vec(),
        })
    }
}

/// Parameters handed to [`Transaction::do_challenge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct ChallengeParameters {
    /// Transaction id assigned by the 3DS server.
    pub threeds_server_transaction_id: Option<String>,
    /// Transaction id assigned by the ACS.
    pub acs_transaction_id: Option<String>,
    /// EMVCo reference number of the ACS.
    pub acs_ref_number: Option<String>,
    /// JWS produced by the ACS.
    pub acs_signed_content: Option<String>,
    /// App URL for out-of-band return; absent for protocol 2.1.0.
    pub threeds_requestor_app_url: Option<String>,
}

impl ChallengeParameters {
    /// Builds the challenge parameters from a challenge token.
    ///
    /// `threeds_requestor_app_url` is left out for protocol 2.1.0, which predates it.
    #[must_use]
    pub fn from_token(token: &ChallengeToken, requestor_app_url: Option<&str>) -> Self {
        let threeds_requestor_app_url =
            if token.message_version.as_deref() == Some(PROTOCOL_VERSION_2_1_0) {
                None
            } else {
                requestor_app_url.map(ToString::to_string)
            };

        Self {
            threeds_server_transaction_id: token.threeds_server_trans_id.clone(),
            acs_transaction_id: token.acs_trans_id.clone(),
            acs_ref_number: token.acs_reference_number.clone(),
            acs_signed_content: token.acs_signed_content.clone(),
            threeds_requestor_app_url,
        }
    }
}

//! Ownership of the single live vendor transaction.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    codec::FingerprintToken,
    error::{SdkError, ThreeDS2Error},
    sdk::{ThreeDS2Service, Transaction, TransactionResult},
};

/// Result of [`TransactionManager::create`] when the SDK did not throw.
pub enum TransactionOutcome {
    /// The transaction was created and is now the current one.
    Created(Arc<dyn Transaction>),
    /// The SDK reported a structured failure; it is reported to the backend as details.
    Failure {
        /// EMV transaction status to report.
        transaction_status: String,
        /// Additional detail provided by the SDK.
        additional_details: Option<String>,
    },
}

/// Holds at most one vendor transaction and releases it together with the SDK.
pub struct TransactionManager {
    service: Arc<dyn ThreeDS2Service>,
    current: Mutex<Option<Arc<dyn Transaction>>>,
}

impl TransactionManager {
    /// Creates a manager without a transaction.
    #[must_use]
    pub fn new(service: Arc<dyn ThreeDS2Service>) -> Self {
        Self {
            service,
            current: Mutex::new(None),
        }
    }

    /// The vendor SDK this manager drives.
    #[must_use]
    pub fn service(&self) -> &Arc<dyn ThreeDS2Service> {
        &self.service
    }

    /// The current transaction, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn Transaction>> {
        self.lock().clone()
    }

    /// Whether a transaction is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Closes the current transaction, if any, and cleans up the SDK.
    ///
    /// Safe to call repeatedly; cleaning up an SDK that is not initialized is a no-op.
    pub fn close_current(&self) {
        let previous = self.lock().take();
        if let Some(transaction) = previous {
            log::debug!("closing 3DS2 transaction");
            transaction.close();
        }

        match self.service.cleanup() {
            Ok(()) | Err(SdkError::NotInitialized) => {}
            Err(e) => log::warn!("3DS2 SDK cleanup failed: {e}"),
        }
    }

    /// Creates a transaction for the token's message version.
    ///
    /// Callers close the previous transaction first (see [`Self::close_current`]).
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::TransactionCreation`] if the token has no message version
    /// or the SDK throws.
    pub fn create(&self, token: &FingerprintToken) -> Result<TransactionOutcome, ThreeDS2Error> {
        let message_version = token.threeds_message_version.clone().ok_or_else(|| {
            ThreeDS2Error::TransactionCreation(
                "Failed to create 3DS2 Transaction. Missing threeDSMessageVersion inside fingerprintToken."
                    .to_string(),
            )
        })?;

        log::debug!("create transaction - {message_version}");
        let result = self.service.create_transaction(message_version).map_err(|e| {
            ThreeDS2Error::TransactionCreation(format!("Failed to create 3DS2 Transaction: {e}"))
        })?;

        match result {
            TransactionResult::Success { transaction } => {
                *self.lock() = Some(Arc::clone(&transaction));
                Ok(TransactionOutcome::Created(transaction))
            }
            TransactionResult::Failure {
                transaction_status,
                additional_details,
            } => Ok(TransactionOutcome::Failure {
                transaction_status,
                additional_details,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn Transaction>>> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

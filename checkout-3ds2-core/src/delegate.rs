//! The 3DS2 delegate: turns backend actions into vendor SDK calls and reports one
//! outcome per action on its event channel.
//!
//! Two sub-flows exist. Fingerprinting (`identify_shopper`) runs as a task on the
//! delegate's runtime: close the previous transaction, initialize the SDK, create a
//! transaction, encode its device data and either return it to the merchant or submit
//! it to the backend. Challenging (`challenge_shopper`) hands the existing transaction
//! to the SDK and parks until the [`SharedCompletionRelay`] reports the outcome.
//!
//! Structured failures from the SDK (a transaction status to report) become details for
//! the backend; integration failures become error events.

use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use serde_json::Value;
use tokio::{
    runtime::{Builder, Handle, Runtime},
    task::AbortHandle,
};

use crate::{
    action::{Action, RedirectAction, SubType},
    codec::{decode_challenge_token, decode_fingerprint_token, encode_fingerprint, FingerprintToken},
    config::ComponentParams,
    details::{fingerprint_details, make_details, parse_redirect_result},
    error::ThreeDS2Error,
    events::{ActionComponentEvent, EventChannel},
    redirect::RedirectHandler,
    relay::{CompletionListener, SessionContext, SharedCompletionRelay},
    sdk::{
        ChallengeParameters, ChallengeResult, ChallengeStatusHandler, ConfigParameters,
        InitializeResult, ThreeDS2Service,
    },
    submit::{SubmitFingerprintClient, SubmitFingerprintResult},
    transaction::{TransactionManager, TransactionOutcome},
};

/// Result of the blocking part of the fingerprint flow.
enum Fingerprint {
    /// Encoded device fingerprint.
    Encoded(String),
    /// The SDK reported a status for the backend instead of a fingerprint.
    Details(Value),
}

/// Orchestrates 3DS2 authentication for one checkout screen.
#[derive(uniffi::Object)]
pub struct ThreeDS2Delegate {
    params: ComponentParams,
    transactions: TransactionManager,
    relay: Arc<SharedCompletionRelay>,
    submitter: SubmitFingerprintClient,
    redirect_handler: Arc<dyn RedirectHandler>,
    runtime: Handle,
    events: EventChannel,
    in_flight: Mutex<Option<AbortHandle>>,
    weak_self: Weak<Self>,
}

#[uniffi::export]
impl ThreeDS2Delegate {
    /// Creates a delegate running its background work on the caller's tokio runtime,
    /// or on the SDK's own runtime when called from outside one.
    ///
    /// A challenge result buffered in `relay` is delivered right away.
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::InvalidConfiguration`] for invalid `params`.
    #[uniffi::constructor]
    pub fn new(
        params: ComponentParams,
        service: Arc<dyn ThreeDS2Service>,
        relay: Arc<SharedCompletionRelay>,
        redirect_handler: Arc<dyn RedirectHandler>,
    ) -> Result<Arc<Self>, ThreeDS2Error> {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => background_runtime()?,
        };
        Self::with_runtime(params, service, relay, redirect_handler, runtime)
    }

    /// Parses and handles an action. Failures are reported on the event channel.
    pub fn handle_action_json(&self, action_json: &str) {
        match Action::from_json(action_json) {
            Ok(action) => self.handle_action(action),
            Err(e) => self.events.emit_error(&e),
        }
    }

    /// Handles the URL the shopper was redirected back to.
    pub fn handle_redirect_result(&self, url: &str) {
        match parse_redirect_result(url) {
            Ok(details) => self.emit_details(&details),
            Err(e) => self.events.emit_error(&e),
        }
    }

    /// Handles the outcome of a challenge. Always closes the transaction.
    ///
    /// The details are built from the session context kept by the relay, so a delegate
    /// recreated mid-challenge reports the same envelope as the one that started it.
    #[allow(clippy::needless_pass_by_value)]
    pub fn on_completion(&self, result: ChallengeResult) {
        log::debug!("challenge {}", result.name());
        let (transaction_status, additional_details) = result.status_and_details();
        match self.make_details(transaction_status, additional_details) {
            Ok(details) => self.finish(&details),
            Err(e) => self.fail(&e),
        }
    }

    /// Whether a vendor transaction is live.
    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.transactions.is_active()
    }

    /// Closes the transaction, resets the relay and forgets the current action.
    pub fn clear_state(&self) {
        self.close_transaction();
    }

    /// Called when the hosting screen goes away for good.
    ///
    /// An in-flight fingerprint flow is abandoned without emitting anything and the
    /// delegate stops listening to the relay; a challenge result arriving later stays
    /// buffered for the next delegate.
    pub fn on_cleared(&self) {
        let in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = in_flight {
            task.abort();
        }
        let listener: Weak<dyn CompletionListener> = self.weak_self.clone();
        self.relay.detach(&listener);
    }

    /// Returns the next event if one is ready.
    #[must_use]
    pub fn try_next_event(&self) -> Option<ActionComponentEvent> {
        self.events.try_recv()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl ThreeDS2Delegate {
    /// Waits for the next event.
    pub async fn next_event(&self) -> Option<ActionComponentEvent> {
        self.events.recv().await
    }
}

impl ThreeDS2Delegate {
    /// Creates a delegate that spawns its background work on `runtime`.
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::InvalidConfiguration`] for invalid `params`.
    pub fn with_runtime(
        params: ComponentParams,
        service: Arc<dyn ThreeDS2Service>,
        relay: Arc<SharedCompletionRelay>,
        redirect_handler: Arc<dyn RedirectHandler>,
        runtime: Handle,
    ) -> Result<Arc<Self>, ThreeDS2Error> {
        params.validate()?;
        let submitter = SubmitFingerprintClient::new(&params)?;

        let delegate = Arc::new_cyclic(|weak_self| Self {
            params,
            transactions: TransactionManager::new(service),
            relay,
            submitter,
            redirect_handler,
            runtime,
            events: EventChannel::new(),
            in_flight: Mutex::new(None),
            weak_self: weak_self.clone(),
        });
        delegate.attach_to_relay();
        Ok(delegate)
    }

    /// Handles an action from the backend.
    pub fn handle_action(&self, action: Action) {
        let (token, missing_token_message) = match &action {
            Action::ThreeDS2Fingerprint(a) => (a.token.as_deref(), "Fingerprint token not found."),
            Action::ThreeDS2Challenge(a) => (a.token.as_deref(), "Challenge token not found."),
            Action::ThreeDS2(a) => (a.token.as_deref(), "3DS2 token not found."),
            Action::Redirect(_) | Action::Unsupported => {
                self.events.emit_error(&ThreeDS2Error::UnsupportedAction(
                    "Unsupported action".to_string(),
                ));
                return;
            }
        };

        let payment_data = action.payment_data().map(ToString::to_string);
        self.relay
            .update_session_context(|context| context.payment_data = payment_data);

        let Some(token) = token.filter(|token| !token.is_empty()).map(ToString::to_string)
        else {
            self.events
                .emit_error(&ThreeDS2Error::TokenMissing(missing_token_message.to_string()));
            return;
        };

        match action {
            Action::ThreeDS2Fingerprint(_) => {
                self.set_authorisation_token(None);
                self.identify_shopper(&token, false);
            }
            Action::ThreeDS2Challenge(_) => {
                self.set_authorisation_token(None);
                self.challenge_shopper(&token);
            }
            Action::ThreeDS2(action) => {
                let subtype = match action.subtype.as_deref().map(SubType::from_str) {
                    Some(Ok(subtype)) => subtype,
                    Some(Err(_)) => {
                        self.events.emit_error(&ThreeDS2Error::UnsupportedAction(
                            "Unknown 3DS2 Action subtype.".to_string(),
                        ));
                        return;
                    }
                    None => {
                        self.events.emit_error(&ThreeDS2Error::UnsupportedAction(
                            "3DS2 Action subtype not found.".to_string(),
                        ));
                        return;
                    }
                };
                // Needed once the challenge completes to build the `threeDSResult` details.
                self.set_authorisation_token(action.authorisation_token);
                match subtype {
                    SubType::Fingerprint => self.identify_shopper(&token, true),
                    SubType::Challenge => self.challenge_shopper(&token),
                }
            }
            Action::Redirect(_) | Action::Unsupported => {}
        }
    }

    /// Fingerprints the device for the directory server described by the token.
    ///
    /// With `submit_automatically` the fingerprint goes straight to the backend and its
    /// answer is handled here; otherwise it is emitted as details for the merchant.
    pub fn identify_shopper(&self, encoded_fingerprint_token: &str, submit_automatically: bool) {
        log::debug!("identify_shopper - submit_automatically: {submit_automatically}");

        let token = match decode_fingerprint_token(encoded_fingerprint_token) {
            Ok(token) => token,
            Err(e) => {
                self.events.emit_error(&e);
                return;
            }
        };

        let Some(config) =
            ConfigParameters::from_token(&token, &self.params.device_parameter_block_list)
        else {
            log::debug!(
                "directoryServerId, directoryServerPublicKey or directoryServerRootCertificates is null."
            );
            self.events.emit_error(&ThreeDS2Error::ConfigCreation(
                "Failed to create ConfigParameters.".to_string(),
            ));
            return;
        };

        let Some(delegate) = self.weak_self.upgrade() else {
            return;
        };
        let task = self
            .runtime
            .spawn(delegate.run_fingerprint_flow(token, config, submit_automatically));
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(task.abort_handle());

        let Some(delegate) = self.weak_self.upgrade() else {
            return;
        };
        self.runtime.spawn(async move {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => log::debug!("fingerprint flow abandoned"),
                Err(e) => {
                    log::error!("Unexpected uncaught 3DS2 error: {e}");
                    delegate.fail(&ThreeDS2Error::Internal(
                        "Unexpected 3DS2 exception.".to_string(),
                    ));
                }
            }
        });
    }

    /// Starts the challenge described by the token on the current transaction.
    pub fn challenge_shopper(&self, encoded_challenge_token: &str) {
        log::debug!("challenge_shopper");

        let Some(transaction) = self.transactions.current() else {
            self.events.emit_error(&ThreeDS2Error::TransactionMissing(
                "Failed to make challenge, missing reference to initial transaction."
                    .to_string(),
            ));
            return;
        };

        let token = match decode_challenge_token(encoded_challenge_token) {
            Ok(token) => token,
            Err(e) => {
                self.events.emit_error(&e);
                return;
            }
        };
        let params = ChallengeParameters::from_token(
            &token,
            self.params.threeds_requestor_app_url.as_deref(),
        );

        self.attach_to_relay();
        let handler: Arc<dyn ChallengeStatusHandler> = self.relay.clone();
        if let Err(e) =
            transaction.do_challenge(params, handler, self.params.challenge_timeout_minutes)
        {
            self.events.emit_error(&ThreeDS2Error::ChallengeHandling(format!(
                "Error starting challenge: {e}"
            )));
        }
    }

    async fn run_fingerprint_flow(
        self: Arc<Self>,
        token: FingerprintToken,
        config: ConfigParameters,
        submit_automatically: bool,
    ) {
        // The SDK calls block while the device is fingerprinted.
        let delegate = Arc::clone(&self);
        let fingerprint = tokio::task::spawn_blocking(move || delegate.create_fingerprint(&token, config))
            .await
            .unwrap_or_else(|e| {
                Err(ThreeDS2Error::Internal(format!("Unexpected 3DS2 exception: {e}")))
            });

        let outcome = match fingerprint {
            Ok(Fingerprint::Details(details)) => {
                self.finish(&details);
                Ok(())
            }
            Ok(Fingerprint::Encoded(encoded)) if submit_automatically => {
                self.submit_fingerprint_automatically(&encoded).await
            }
            Ok(Fingerprint::Encoded(encoded)) => {
                // The merchant submits the fingerprint and may come back with a
                // challenge action, which needs the transaction. The relay is reset
                // before the host hears about it, so that challenge can attach.
                let payment_data = self.relay.session_context().payment_data;
                self.relay.reset();
                self.events
                    .emit_details(&fingerprint_details(&encoded), payment_data);
                Ok(())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            self.fail(&e);
        }
    }

    fn create_fingerprint(
        &self,
        token: &FingerprintToken,
        config: ConfigParameters,
    ) -> Result<Fingerprint, ThreeDS2Error> {
        // No state of a previous transaction may leak into this one.
        self.transactions.close_current();

        log::debug!("initialize 3DS2 SDK");
        let initialize_result = self
            .transactions
            .service()
            .initialize(config)
            .map_err(|e| ThreeDS2Error::Internal(format!("Unexpected 3DS2 exception: {e}")))?;
        if let InitializeResult::Failure {
            transaction_status,
            additional_details,
        } = initialize_result
        {
            let details = self.make_details(&transaction_status, additional_details.as_deref())?;
            return Ok(Fingerprint::Details(details));
        }

        let transaction = match self.transactions.create(token)? {
            TransactionOutcome::Created(transaction) => transaction,
            TransactionOutcome::Failure {
                transaction_status,
                additional_details,
            } => {
                let details =
                    self.make_details(&transaction_status, additional_details.as_deref())?;
                return Ok(Fingerprint::Details(details));
            }
        };

        let params = transaction.authentication_request_parameters().ok_or_else(|| {
            ThreeDS2Error::FingerprintCreation(
                "Failed to retrieve 3DS2 authentication parameters".to_string(),
            )
        })?;
        encode_fingerprint(&params).map(Fingerprint::Encoded)
    }

    async fn submit_fingerprint_automatically(
        &self,
        encoded_fingerprint: &str,
    ) -> Result<(), ThreeDS2Error> {
        let payment_data = self.relay.session_context().payment_data;
        let result = self
            .submitter
            .submit_fingerprint(encoded_fingerprint, payment_data.as_deref())
            .await?;

        // Details produced after this endpoint must not carry paymentData back to the merchant.
        self.relay
            .update_session_context(|context| context.payment_data = None);

        match result {
            SubmitFingerprintResult::Completed(details) => {
                self.finish(&details);
                Ok(())
            }
            SubmitFingerprintResult::Redirect(redirect) => {
                self.make_redirect(&redirect)?;
                self.close_transaction();
                Ok(())
            }
            SubmitFingerprintResult::Threeds2(action) => {
                self.handle_action(action);
                Ok(())
            }
        }
    }

    fn make_redirect(&self, redirect: &RedirectAction) -> Result<(), ThreeDS2Error> {
        let url = redirect
            .url
            .clone()
            .ok_or_else(|| ThreeDS2Error::Redirect("Redirect URL not found.".to_string()))?;
        log::debug!("make_redirect - {url}");
        self.redirect_handler
            .launch_redirect(url)
            .map_err(|e| ThreeDS2Error::Redirect(format!("Failed to launch redirect: {e}")))
    }

    fn make_details(
        &self,
        transaction_status: &str,
        error_details: Option<&str>,
    ) -> Result<Value, ThreeDS2Error> {
        let SessionContext {
            authorisation_token,
            ..
        } = self.relay.session_context();
        make_details(
            transaction_status,
            error_details,
            authorisation_token.as_deref(),
        )
    }

    fn set_authorisation_token(&self, authorisation_token: Option<String>) {
        self.relay
            .update_session_context(|context| context.authorisation_token = authorisation_token);
    }

    fn emit_details(&self, details: &Value) {
        let payment_data = self.relay.session_context().payment_data;
        self.events.emit_details(details, payment_data);
    }

    /// Terminal success: state is cleared before the host sees the details.
    fn finish(&self, details: &Value) {
        let payment_data = self.relay.session_context().payment_data;
        self.close_transaction();
        self.events.emit_details(details, payment_data);
    }

    /// Terminal failure: state is cleared before the host sees the error.
    fn fail(&self, error: &ThreeDS2Error) {
        self.close_transaction();
        self.events.emit_error(error);
    }

    fn close_transaction(&self) {
        self.transactions.close_current();
        self.relay.reset();
    }

    fn attach_to_relay(&self) {
        if let Some(delegate) = self.weak_self.upgrade() {
            let listener: Arc<dyn CompletionListener> = delegate;
            self.relay.set_listener(&listener);
        }
    }
}

impl CompletionListener for ThreeDS2Delegate {
    fn on_challenge_result(&self, result: ChallengeResult) {
        self.on_completion(result);
    }
}

/// Runtime used when the host constructs the delegate outside of a tokio runtime.
fn background_runtime() -> Result<Handle, ThreeDS2Error> {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.handle().clone());
    }
    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("checkout-3ds2")
        .enable_all()
        .build()
        .map_err(|e| ThreeDS2Error::Internal(format!("failed to start runtime: {e}")))?;
    Ok(RUNTIME.get_or_init(|| runtime).handle().clone())
}

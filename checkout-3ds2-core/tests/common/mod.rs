//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use checkout_3ds2_core::{
    ActionComponentEvent, AuthenticationRequestParameters, ChallengeParameters,
    ChallengeResult, ChallengeStatusHandler, ComponentParams, ConfigParameters, Environment,
    InitializeResult, RedirectError, RedirectHandler, SdkError, SharedCompletionRelay,
    ThreeDS2Delegate, ThreeDS2Service, Transaction, TransactionResult,
};
use serde_json::{json, Value};

pub const CLIENT_KEY: &str = "test_ABCDEF1234567890";

pub fn init_logging() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

pub fn encode(value: &Value) -> String {
    STANDARD.encode(value.to_string())
}

pub fn fingerprint_token() -> String {
    encode(&json!({
        "directoryServerId": "A000000004",
        "directoryServerPublicKey": "ds-public-key",
        "directoryServerRootCertificates": "ds-root-certs",
        "threeDSMessageVersion": "2.2.0",
        "threeDSServerTransID": "server-trans-id",
    }))
}

pub fn challenge_token(message_version: &str) -> String {
    encode(&json!({
        "threeDSServerTransID": "server-trans-id",
        "acsTransID": "acs-trans-id",
        "acsReferenceNumber": "acs-ref",
        "acsSignedContent": "acs-signed-content",
        "messageVersion": message_version,
    }))
}

pub fn auth_params() -> AuthenticationRequestParameters {
    AuthenticationRequestParameters {
        sdk_app_id: "app-id".to_string(),
        device_data: "device-data".to_string(),
        sdk_ephemeral_public_key: r#"{"kty":"EC","crv":"P-256","x":"x","y":"y"}"#.to_string(),
        sdk_reference_number: "sdk-ref".to_string(),
        sdk_transaction_id: "sdk-trans-id".to_string(),
        message_version: "2.2.0".to_string(),
    }
}

pub fn params() -> ComponentParams {
    let mut params = ComponentParams::new(CLIENT_KEY.to_string(), Environment::Test);
    params.threeds_requestor_app_url = Some("https://shop.example/3ds".to_string());
    params
}

/// Decodes the base64 JSON stored under `key` in a details object.
pub fn decode_details_entry(details: &Value, key: &str) -> Value {
    let encoded = details[key].as_str().expect("details entry is a string");
    serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap()
}

/// Chronological log of vendor SDK calls.
#[derive(Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

pub struct FakeTransaction {
    calls: Arc<CallLog>,
    auth_params: Option<AuthenticationRequestParameters>,
    fail_challenge: bool,
    pub challenge_params: Mutex<Option<(ChallengeParameters, u32)>>,
    pub handler: Mutex<Option<Arc<dyn ChallengeStatusHandler>>>,
}

impl FakeTransaction {
    /// Completes the running challenge the way the vendor SDK would.
    pub fn complete(&self, result: ChallengeResult) {
        let handler = self
            .handler
            .lock()
            .unwrap()
            .clone()
            .expect("challenge was started");
        handler.on_completion(result);
    }
}

impl Transaction for FakeTransaction {
    fn authentication_request_parameters(&self) -> Option<AuthenticationRequestParameters> {
        self.calls.push("authentication_request_parameters");
        self.auth_params.clone()
    }

    fn do_challenge(
        &self,
        params: ChallengeParameters,
        handler: Arc<dyn ChallengeStatusHandler>,
        timeout_minutes: u32,
    ) -> Result<(), SdkError> {
        self.calls.push("do_challenge");
        if self.fail_challenge {
            return Err(SdkError::InvalidInput("acs signed content rejected".to_string()));
        }
        *self.challenge_params.lock().unwrap() = Some((params, timeout_minutes));
        *self.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    fn close(&self) {
        self.calls.push("close");
    }
}

/// Behaviour of [`FakeService::create_transaction`].
#[derive(Clone)]
pub enum CreateBehaviour {
    Success,
    Failure(String),
    Throw,
    Panic,
}

/// Scriptable stand-in for the vendor SDK.
pub struct FakeService {
    pub calls: Arc<CallLog>,
    pub transaction: Arc<FakeTransaction>,
    initialize_result: InitializeResult,
    create: CreateBehaviour,
    initialize_delay: Option<Duration>,
    pub initialized_with: Mutex<Option<ConfigParameters>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::with(InitializeResult::Success, CreateBehaviour::Success, Some(auth_params()), false)
    }

    pub fn with(
        initialize_result: InitializeResult,
        create: CreateBehaviour,
        auth_params: Option<AuthenticationRequestParameters>,
        fail_challenge: bool,
    ) -> Self {
        let calls = Arc::new(CallLog::default());
        Self {
            transaction: Arc::new(FakeTransaction {
                calls: Arc::clone(&calls),
                auth_params,
                fail_challenge,
                challenge_params: Mutex::new(None),
                handler: Mutex::new(None),
            }),
            calls,
            initialize_result,
            create,
            initialize_delay: None,
            initialized_with: Mutex::new(None),
        }
    }

    /// Makes `initialize` block for `delay`, like a slow device fingerprint.
    pub fn with_initialize_delay(mut self, delay: Duration) -> Self {
        self.initialize_delay = Some(delay);
        self
    }
}

impl ThreeDS2Service for FakeService {
    fn initialize(&self, config: ConfigParameters) -> Result<InitializeResult, SdkError> {
        self.calls.push("initialize");
        if let Some(delay) = self.initialize_delay {
            std::thread::sleep(delay);
        }
        *self.initialized_with.lock().unwrap() = Some(config);
        Ok(self.initialize_result.clone())
    }

    fn create_transaction(&self, message_version: String) -> Result<TransactionResult, SdkError> {
        self.calls.push(format!("create_transaction {message_version}"));
        match &self.create {
            CreateBehaviour::Success => Ok(TransactionResult::Success {
                transaction: self.transaction.clone(),
            }),
            CreateBehaviour::Failure(status) => Ok(TransactionResult::Failure {
                transaction_status: status.clone(),
                additional_details: Some("sdk failure".to_string()),
            }),
            CreateBehaviour::Throw => Err(SdkError::Runtime("sdk crashed".to_string())),
            CreateBehaviour::Panic => panic!("vendor sdk bug"),
        }
    }

    fn cleanup(&self) -> Result<(), SdkError> {
        self.calls.push("cleanup");
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRedirectHandler {
    pub launched: Mutex<Vec<String>>,
    panic_on_launch: bool,
}

impl RecordingRedirectHandler {
    pub fn panicking() -> Self {
        Self {
            launched: Mutex::new(Vec::new()),
            panic_on_launch: true,
        }
    }
}

impl RedirectHandler for RecordingRedirectHandler {
    fn launch_redirect(&self, url: String) -> Result<(), RedirectError> {
        assert!(!self.panic_on_launch, "redirect launcher crashed");
        self.launched.lock().unwrap().push(url);
        Ok(())
    }
}

pub struct Harness {
    pub service: Arc<FakeService>,
    pub relay: Arc<SharedCompletionRelay>,
    pub redirects: Arc<RecordingRedirectHandler>,
    pub delegate: Arc<ThreeDS2Delegate>,
}

impl Harness {
    pub fn new(service: FakeService) -> Self {
        Self::with_params(service, params())
    }

    pub fn with_params(service: FakeService, params: ComponentParams) -> Self {
        Self::with_parts(service, params, RecordingRedirectHandler::default())
    }

    pub fn with_parts(
        service: FakeService,
        params: ComponentParams,
        redirects: RecordingRedirectHandler,
    ) -> Self {
        init_logging();
        let service = Arc::new(service);
        let relay = SharedCompletionRelay::new();
        let redirects = Arc::new(redirects);
        let delegate = ThreeDS2Delegate::new(
            params,
            service.clone(),
            relay.clone(),
            redirects.clone(),
        )
        .unwrap();
        Self {
            service,
            relay,
            redirects,
            delegate,
        }
    }

    /// A second delegate sharing this one's vendor SDK and relay, as after the
    /// hosting screen was recreated.
    pub fn recreate(&self) -> Self {
        Self {
            delegate: ThreeDS2Delegate::new(
                params(),
                self.service.clone(),
                self.relay.clone(),
                self.redirects.clone(),
            )
            .unwrap(),
            service: Arc::clone(&self.service),
            relay: Arc::clone(&self.relay),
            redirects: Arc::clone(&self.redirects),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.service.calls.calls()
    }

    pub async fn next_event(&self) -> ActionComponentEvent {
        tokio::time::timeout(Duration::from_secs(5), self.delegate.next_event())
            .await
            .expect("an event within five seconds")
            .expect("event channel open")
    }

    /// Asserts nothing else was emitted after giving background tasks time to run.
    pub async fn assert_no_more_events(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(self.delegate.try_next_event(), None);
    }

    pub async fn next_details(&self) -> (Value, Option<String>) {
        match self.next_event().await {
            ActionComponentEvent::Details { data } => (data.details_json().unwrap(), data.payment_data),
            ActionComponentEvent::Error { kind, message } => {
                panic!("expected details, got {kind} error: {message}")
            }
        }
    }
}

//! Events the delegate emits to the hosting UI.

use serde_json::Value;
use tokio::sync::{
    mpsc::{self, error::TryRecvError},
    Mutex,
};

use crate::error::{ErrorKind, ThreeDS2Error};

/// Details to forward to the merchant's `/payments/details` call.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ActionComponentData {
    /// JSON object with the details.
    pub details: String,
    /// Correlation token of the action, when it has to be sent along.
    pub payment_data: Option<String>,
}

impl ActionComponentData {
    /// Parses [`Self::details`] back into JSON.
    ///
    /// # Errors
    /// Returns [`ThreeDS2Error::SerializationError`] if the details are not valid JSON.
    pub fn details_json(&self) -> Result<Value, ThreeDS2Error> {
        serde_json::from_str(&self.details)
            .map_err(|e| ThreeDS2Error::SerializationError(format!("invalid details json: {e}")))
    }
}

/// One outcome of handling an action.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ActionComponentEvent {
    /// The action produced details.
    Details {
        /// The details and correlation token.
        data: ActionComponentData,
    },
    /// The action failed.
    Error {
        /// Error taxonomy tag.
        kind: ErrorKind,
        /// Human readable description.
        message: String,
    },
}

impl From<&ThreeDS2Error> for ActionComponentEvent {
    fn from(error: &ThreeDS2Error) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Unbounded single-consumer channel carrying [`ActionComponentEvent`]s.
///
/// Sending never blocks and never drops; there is at most one event per user action.
pub(crate) struct EventChannel {
    sender: mpsc::UnboundedSender<ActionComponentEvent>,
    receiver: Mutex<mpsc::UnboundedReceiver<ActionComponentEvent>>,
}

impl EventChannel {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub(crate) fn emit_details(&self, details: &Value, payment_data: Option<String>) {
        self.send(ActionComponentEvent::Details {
            data: ActionComponentData {
                details: details.to_string(),
                payment_data,
            },
        });
    }

    pub(crate) fn emit_error(&self, error: &ThreeDS2Error) {
        log::error!("{error}");
        self.send(error.into());
    }

    fn send(&self, event: ActionComponentEvent) {
        // The receiver lives as long as the channel, so this cannot fail.
        let _ = self.sender.send(event);
    }

    /// Waits for the next event. Concurrent callers are served one at a time.
    pub(crate) async fn recv(&self) -> Option<ActionComponentEvent> {
        self.receiver.lock().await.recv().await
    }

    /// Returns the next event if one is ready.
    pub(crate) fn try_recv(&self) -> Option<ActionComponentEvent> {
        let mut receiver = self.receiver.try_lock().ok()?;
        match receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

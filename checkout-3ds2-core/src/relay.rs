//! Single-slot mailbox between the vendor SDK's challenge callback and the delegate.
//!
//! The vendor SDK keeps the [`ChallengeStatusHandler`] it was given for the whole
//! challenge, while the delegate listening for the outcome may be torn down and
//! recreated by the platform in the meantime. The relay is what the SDK holds; it
//! forwards to whichever listener is attached and buffers at most one result while
//! none is. It also carries the [`SessionContext`] of the action being authenticated,
//! so a recreated delegate builds the same details the original one would have.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::sdk::{ChallengeResult, ChallengeStatusHandler};

/// Consumer of challenge results delivered by a [`SharedCompletionRelay`].
pub trait CompletionListener: Send + Sync {
    /// Handles a challenge result.
    fn on_challenge_result(&self, result: ChallengeResult);
}

/// Correlation data of the action being authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// `paymentData` to send along with the details.
    pub payment_data: Option<String>,
    /// `authorisationToken` of a combined `threeDS2` action; selects the
    /// `threeDSResult` details envelope.
    pub authorisation_token: Option<String>,
}

#[derive(Default)]
struct RelayState {
    pending: Option<ChallengeResult>,
    listener: Option<Weak<dyn CompletionListener>>,
    context: SessionContext,
}

/// Forwards challenge results to the attached listener, buffering one result
/// while no (live) listener is attached.
///
/// Listeners are held weakly: a listener whose owner was dropped counts as absent.
#[derive(Default, uniffi::Object)]
pub struct SharedCompletionRelay {
    state: Mutex<RelayState>,
}

#[uniffi::export]
impl SharedCompletionRelay {
    /// Creates an empty relay.
    #[uniffi::constructor]
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Whether a result is waiting for a listener.
    #[must_use]
    pub fn has_pending_result(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Detaches the current listener, keeping any pending result.
    pub fn remove_listener(&self) {
        self.lock().listener = None;
    }

    /// Clears the listener, any pending result and the session context.
    pub fn reset(&self) {
        *self.lock() = RelayState::default();
    }
}

impl SharedCompletionRelay {
    /// Attaches `listener`, delivering a pending result to it right away.
    pub fn set_listener(&self, listener: &Arc<dyn CompletionListener>) {
        let pending = {
            let mut state = self.lock();
            state.listener = Some(Arc::downgrade(listener));
            state.pending.take()
        };
        if let Some(result) = pending {
            log::debug!("delivering pending challenge result: {}", result.name());
            listener.on_challenge_result(result);
        }
    }

    /// Detaches `listener` if it is the one currently attached, keeping any pending result.
    pub fn detach(&self, listener: &Weak<dyn CompletionListener>) {
        let mut state = self.lock();
        if state
            .listener
            .as_ref()
            .is_some_and(|current| Weak::ptr_eq(current, listener))
        {
            state.listener = None;
        }
    }

    /// The session context recorded for the current action.
    #[must_use]
    pub fn session_context(&self) -> SessionContext {
        self.lock().context.clone()
    }

    /// Updates the session context in place.
    pub fn update_session_context(&self, update: impl FnOnce(&mut SessionContext)) {
        update(&mut self.lock().context);
    }

    fn dispatch(&self, result: ChallengeResult) {
        let listener = {
            let mut state = self.lock();
            let Some(listener) = state.listener.as_ref().and_then(Weak::upgrade) else {
                log::debug!("no listener attached, holding challenge result");
                state.listener = None;
                state.pending = Some(result);
                return;
            };
            listener
        };
        // Invoked outside the lock: listeners reset the relay when they finish.
        listener.on_challenge_result(result);
    }

    // The state stays consistent even if a listener panicked while another
    // thread held the lock, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ChallengeStatusHandler for SharedCompletionRelay {
    fn on_completion(&self, result: ChallengeResult) {
        self.dispatch(result);
    }
}

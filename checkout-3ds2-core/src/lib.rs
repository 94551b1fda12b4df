//! Core of the mobile checkout 3D Secure 2 component.
//!
//! The host app receives 3DS2 actions from its backend and passes them to a
//! [`ThreeDS2Delegate`], which drives the vendor 3DS2 SDK (exposed to Rust through the
//! [`ThreeDS2Service`] and [`Transaction`] foreign traits) and reports one
//! [`ActionComponentEvent`] per action: details to send to `/payments/details`, or an error.
//!
//! The vendor SDK keeps the challenge callback for as long as the challenge runs, which
//! can outlive the screen that started it. Hosts therefore create one
//! [`SharedCompletionRelay`] per checkout session and hand it to every delegate they
//! build for that session.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod action;
pub use action::*;

mod codec;
pub use codec::*;

mod config;
pub use config::*;

mod delegate;
pub use delegate::*;

mod details;
pub use details::*;

mod error;
pub use error::*;

mod events;
pub use events::*;

mod redirect;
pub use redirect::*;

mod relay;
pub use relay::*;

mod sdk;
pub use sdk::*;

mod submit;
pub use submit::*;

mod transaction;
pub use transaction::*;

/// Forwarding of the crate's log records to the host's logger.
pub mod logger;

// private modules
mod http_request;

#[cfg(not(target_arch = "wasm32"))]
#[ctor::ctor]
fn install_crypto_provider() {
    // Another library in the host process may have installed one already.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

uniffi::setup_scaffolding!("checkout_3ds2_core");

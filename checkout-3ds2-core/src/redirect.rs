//! Hand-off of redirect actions to the host.

use crate::error::RedirectError;

/// Opens redirect URLs on behalf of the delegate (custom tab, browser or issuer app).
///
/// The shopper comes back through the app's return URL, which the host passes to
/// [`crate::ThreeDS2Delegate::handle_redirect_result`].
#[uniffi::export(with_foreign)]
pub trait RedirectHandler: Send + Sync {
    /// Opens `url`.
    ///
    /// # Errors
    /// Returns an error if nothing on the device can open the URL.
    fn launch_redirect(&self, url: String) -> Result<(), RedirectError>;
}

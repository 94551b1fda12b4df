//! Mobile bindings for the 3D Secure 2 checkout component.
//!
//! Re-exports everything from `checkout-3ds2-core` so the generated Kotlin and Swift
//! bindings ship as a single library.

checkout_3ds2_core::uniffi_reexport_scaffolding!();

pub use checkout_3ds2_core::*;

//! Generates the foreign-language bindings for `checkout-3ds2`.

fn main() {
    uniffi::uniffi_bindgen_main();
}

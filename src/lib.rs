//! # Folio
//!
//! Progressive enhancement for a static portfolio site.
//!
//! The site is plain HTML and CSS; this crate compiles to a WebAssembly module
//! that the page loads last. When it starts it reads the optional embedded
//! configuration, waits for the document to be parsed, and layers the
//! enhancements from [`folio_enhance`] on top of the markup.
//!
//! ## Building
//!
//! ```text
//! wasm-pack build --target web --release
//! wasm-pack build --target web --release --features console_error_panic_hook
//! ```
//!
//! Native builds expose the same API for tests and tooling, with
//! [`testing::MockHost`] standing in for the browser.

pub use folio_enhance::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// WASM entry point
///
/// Runs when the module is instantiated. Only fails when there is no browser
/// window at all; every other problem is logged and the page keeps working.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
	// Set up panic hook for better error messages in console
	#[cfg(feature = "console_error_panic_hook")]
	console_error_panic_hook::set_once();

	folio_enhance::web::launch().map_err(|err| JsValue::from_str(&err.to_string()))?;
	Ok(())
}

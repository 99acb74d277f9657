//! Keyboard navigation affordance
//!
//! `Tab` switches the page into keyboard mode so stylesheets can show focus
//! outlines; any pointer press switches it back. The last input wins.

use std::rc::Rc;

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::{EventKind, Host, Target};
use crate::state::SharedState;
use crate::warn_log;

/// Key that enables keyboard mode.
pub const FOCUS_KEY: &str = "Tab";

/// Registers the document-wide `keydown`/`mousedown` listeners.
pub fn track_input_modality<H: Host>(
	host: &Rc<H>,
	config: &Rc<EnhanceConfig>,
	state: &SharedState,
) -> EnhanceResult<()> {
	let (key_host, key_config, key_state) = (host.clone(), config.clone(), state.clone());
	host.listen(
		Target::Document,
		EventKind::KeyDown,
		Rc::new(move |event| {
			if event.key.as_deref() != Some(FOCUS_KEY) {
				return;
			}
			if let Err(err) = key_state.update(key_host.as_ref(), &key_config, |s| s.keyboard_mode = true) {
				warn_log!("Failed to enter keyboard mode: {}", err);
			}
		}),
	)?;

	let (pointer_host, pointer_config, pointer_state) = (host.clone(), config.clone(), state.clone());
	host.listen(
		Target::Document,
		EventKind::MouseDown,
		Rc::new(move |_| {
			if let Err(err) =
				pointer_state.update(pointer_host.as_ref(), &pointer_config, |s| s.keyboard_mode = false)
			{
				warn_log!("Failed to leave keyboard mode: {}", err);
			}
		}),
	)?;

	Ok(())
}

//! Reduced-motion compliance

use std::rc::Rc;

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::{EventKind, Host, Target};
use crate::reveal::reveal_all;
use crate::state::SharedState;
use crate::{debug_log, warn_log};

/// Applies the system reduced-motion preference.
///
/// When the preference is active at startup, the flag is set and every
/// animated element is revealed immediately. A change listener then keeps the
/// flag in sync for the page lifetime without revealing anything again.
///
/// Returns the preference observed at startup. Hosts that cannot evaluate
/// media queries are treated as "no preference" and get no listener.
pub fn apply_reduced_motion<H: Host>(
	host: &Rc<H>,
	config: &Rc<EnhanceConfig>,
	state: &SharedState,
) -> EnhanceResult<bool> {
	let query = config.reduced_motion_query.as_str();
	let Some(reduce) = host.match_media(query) else {
		debug_log!("Media queries unavailable; assuming no motion preference");
		return Ok(false);
	};

	if reduce {
		state.update(host.as_ref(), config, |s| s.reduced_motion = true)?;
		reveal_all(host.as_ref(), config)?;
		debug_log!("Reduced motion preferred; animations revealed up front");
	}

	let listener_host = host.clone();
	let listener_config = config.clone();
	let listener_state = state.clone();
	host.listen(
		Target::MediaQuery(query.to_string()),
		EventKind::Change,
		Rc::new(move |event| {
			let matches = event
				.matches
				.or_else(|| listener_host.match_media(&listener_config.reduced_motion_query))
				.unwrap_or(false);
			if let Err(err) = listener_state.update(listener_host.as_ref(), &listener_config, |s| {
				s.reduced_motion = matches
			}) {
				warn_log!("Failed to apply motion preference: {}", err);
			}
		}),
	)?;

	Ok(reduce)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockElement, MockHost};
	use rstest::rstest;

	const QUERY: &str = "(prefers-reduced-motion: reduce)";

	#[rstest]
	fn test_active_preference_reveals_everything() {
		let host = Rc::new(MockHost::new());
		let config = Rc::new(EnhanceConfig::default());
		let state = SharedState::default();
		host.set_media(QUERY, true);
		let node = host.append_to_body(MockElement::new("div").attr("data-animate", ""));

		assert!(apply_reduced_motion(&host, &config, &state).unwrap());

		let root = host.root_element().unwrap();
		assert!(host.has_class(&root, "reduce-motion"));
		assert!(host.has_class(&node, "animate-in"));
		assert!(state.snapshot().reduced_motion);
	}

	#[rstest]
	fn test_change_toggles_class_without_revealing() {
		let host = Rc::new(MockHost::new());
		let config = Rc::new(EnhanceConfig::default());
		let state = SharedState::default();
		let node = host.append_to_body(MockElement::new("div").attr("data-animate", ""));

		assert!(!apply_reduced_motion(&host, &config, &state).unwrap());
		let root = host.root_element().unwrap();
		assert!(!host.has_class(&root, "reduce-motion"));

		host.change_media(QUERY, true);
		assert!(host.has_class(&root, "reduce-motion"));
		assert!(!host.has_class(&node, "animate-in"));

		host.change_media(QUERY, false);
		assert!(!host.has_class(&root, "reduce-motion"));
		assert!(!state.snapshot().reduced_motion);
	}

	#[rstest]
	fn test_missing_media_support_is_not_an_error() {
		let host = Rc::new(MockHost::new());
		let config = Rc::new(EnhanceConfig::default());
		host.set_media_supported(false);

		assert!(!apply_reduced_motion(&host, &config, &SharedState::default()).unwrap());
		assert_eq!(host.listener_count(), 0);
	}
}

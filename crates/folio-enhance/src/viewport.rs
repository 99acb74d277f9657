//! Viewport height normalization
//!
//! Mobile browsers change `100vh` as their toolbars slide in and out. The page
//! instead sizes with `calc(var(--vh) * 100)`, where `--vh` is one hundredth of
//! `window.innerHeight`.
//!
//! Resizes are debounced (trailing edge). Orientation changes are not: each
//! one schedules its own recomputation after a fixed delay.

use std::rc::Rc;

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::{EventKind, Host, Target};
use crate::state::SharedState;
use crate::timer::CancellableTimer;
use crate::warn_log;

/// Publishes `innerHeight / 100` and returns it.
pub fn publish_viewport_unit<H: Host>(
	host: &H,
	config: &EnhanceConfig,
	state: &SharedState,
) -> EnhanceResult<f64> {
	let unit = host.viewport_height() / 100.0;
	state.update(host, config, |s| s.viewport_unit = Some(unit))?;
	Ok(unit)
}

fn republish<H: Host>(host: &H, config: &EnhanceConfig, state: &SharedState) {
	if let Err(err) = publish_viewport_unit(host, config, state) {
		warn_log!("Failed to update viewport height: {}", err);
	}
}

/// Publishes the unit now and keeps it current on resize and rotation.
pub fn watch_viewport<H: Host>(
	host: &Rc<H>,
	config: &Rc<EnhanceConfig>,
	state: &SharedState,
) -> EnhanceResult<()> {
	publish_viewport_unit(host.as_ref(), config, state)?;

	let resize_timer = CancellableTimer::debounce(host.clone());
	let (resize_host, resize_config, resize_state) = (host.clone(), config.clone(), state.clone());
	host.listen(
		Target::Window,
		EventKind::Resize,
		Rc::new(move |_| {
			let (host, config, state) = (resize_host.clone(), resize_config.clone(), resize_state.clone());
			let scheduled = resize_timer.schedule(resize_config.viewport.resize_debounce_ms, move || {
				republish(host.as_ref(), &config, &state)
			});
			if let Err(err) = scheduled {
				warn_log!("Failed to schedule viewport update: {}", err);
			}
		}),
	)?;

	let rotate_timer = CancellableTimer::independent(host.clone());
	let (rotate_host, rotate_config, rotate_state) = (host.clone(), config.clone(), state.clone());
	host.listen(
		Target::Window,
		EventKind::OrientationChange,
		Rc::new(move |_| {
			let (host, config, state) = (rotate_host.clone(), rotate_config.clone(), rotate_state.clone());
			let scheduled = rotate_timer.schedule(rotate_config.viewport.orientation_delay_ms, move || {
				republish(host.as_ref(), &config, &state)
			});
			if let Err(err) = scheduled {
				warn_log!("Failed to schedule viewport update: {}", err);
			}
		}),
	)?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockHost;
	use rstest::rstest;

	fn vh(host: &MockHost) -> Option<String> {
		host.style(host.root_element().unwrap(), "--vh")
	}

	#[rstest]
	fn test_publish_sets_custom_property() {
		let host = MockHost::new();
		let state = SharedState::default();
		host.set_viewport_height(640.0);

		let unit = publish_viewport_unit(&host, &EnhanceConfig::default(), &state).unwrap();

		assert_eq!(unit, 6.4);
		assert_eq!(vh(&host).as_deref(), Some("6.4px"));
		assert_eq!(state.snapshot().viewport_unit, Some(6.4));
	}

	#[rstest]
	fn test_resize_is_debounced() {
		let host = Rc::new(MockHost::new());
		let state = SharedState::default();
		watch_viewport(&host, &Rc::new(EnhanceConfig::default()), &state).unwrap();
		assert_eq!(vh(&host).as_deref(), Some("8px"));

		host.resize(700.0);
		host.advance(50);
		host.resize(500.0);
		host.advance(99);
		assert_eq!(vh(&host).as_deref(), Some("8px"));

		host.advance(1);
		assert_eq!(vh(&host).as_deref(), Some("5px"));
		assert_eq!(host.pending_timers(), 0);
	}

	#[rstest]
	fn test_orientation_changes_are_independent() {
		let host = Rc::new(MockHost::new());
		let state = SharedState::default();
		watch_viewport(&host, &Rc::new(EnhanceConfig::default()), &state).unwrap();

		host.rotate(400.0);
		host.advance(50);
		host.rotate(900.0);
		assert_eq!(host.pending_timers(), 2);

		host.advance(50);
		// The first recomputation reads the height current at that moment.
		assert_eq!(vh(&host).as_deref(), Some("9px"));
		host.advance(50);
		assert_eq!(vh(&host).as_deref(), Some("9px"));
		assert_eq!(host.pending_timers(), 0);
	}
}

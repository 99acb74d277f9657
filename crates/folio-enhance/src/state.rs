//! Application state and its document projection
//!
//! [`AppState`] is the source of truth for the document-level flags. The
//! classes and style variable on `<html>`/`<body>` are never read back; they
//! are recomputed from the state by [`AppState::projection`] and written by
//! [`SharedState::update`] after every change.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::Host;

/// Document-level flags owned by the enhancement layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
	/// The system prefers reduced motion.
	pub reduced_motion: bool,
	/// The last input modality was the keyboard.
	pub keyboard_mode: bool,
	/// One hundredth of the viewport height, once published.
	pub viewport_unit: Option<f64>,
}

/// Where a projected class lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
	/// `document.documentElement`
	Root,
	/// `document.body`
	Body,
}

/// A class toggle derived from state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassToggle {
	/// Element carrying the class.
	pub scope: Scope,
	/// Class name.
	pub class: String,
	/// Whether the class is present.
	pub on: bool,
}

/// Everything [`AppState`] writes to the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
	/// Class toggles, applied in order.
	pub classes: Vec<ClassToggle>,
	/// Style variables set on the root element.
	pub root_styles: Vec<(String, String)>,
}

impl AppState {
	/// Computes the document classes and style variables for this state.
	pub fn projection(&self, config: &EnhanceConfig) -> Projection {
		let classes = vec![
			ClassToggle {
				scope: Scope::Root,
				class: config.classes.reduce_motion.clone(),
				on: self.reduced_motion,
			},
			ClassToggle {
				scope: Scope::Body,
				class: config.classes.keyboard.clone(),
				on: self.keyboard_mode,
			},
		];

		let root_styles = self
			.viewport_unit
			.map(|unit| vec![(config.viewport.property.clone(), format!("{unit}px"))])
			.unwrap_or_default();

		Projection {
			classes,
			root_styles,
		}
	}
}

impl Projection {
	/// Writes the projection to the document.
	///
	/// A missing `<html>` or `<body>` skips the toggles scoped to it.
	pub fn apply<H: Host>(&self, host: &H) -> EnhanceResult<()> {
		let root = host.root_element();
		let body = host.body();

		for toggle in &self.classes {
			let node = match toggle.scope {
				Scope::Root => root.as_ref(),
				Scope::Body => body.as_ref(),
			};
			if let Some(node) = node {
				host.set_class(node, &toggle.class, toggle.on)?;
			}
		}

		if let Some(root) = root.as_ref() {
			for (property, value) in &self.root_styles {
				host.set_style(root, property, value)?;
			}
		}

		Ok(())
	}
}

/// Shared, single-threaded handle to [`AppState`].
#[derive(Debug, Clone, Default)]
pub struct SharedState {
	inner: Rc<RefCell<AppState>>,
}

impl SharedState {
	/// Creates a handle around `state`.
	pub fn new(state: AppState) -> Self {
		Self {
			inner: Rc::new(RefCell::new(state)),
		}
	}

	/// Returns a copy of the current state.
	pub fn snapshot(&self) -> AppState {
		self.inner.borrow().clone()
	}

	/// Mutates the state, then projects it onto the document.
	pub fn update<H, F>(&self, host: &H, config: &EnhanceConfig, f: F) -> EnhanceResult<()>
	where
		H: Host,
		F: FnOnce(&mut AppState),
	{
		let projection = {
			let mut state = self.inner.borrow_mut();
			f(&mut state);
			state.projection(config)
		};
		projection.apply(host)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockHost;
	use rstest::rstest;

	#[rstest]
	fn test_default_projection_clears_classes_and_skips_styles() {
		let config = EnhanceConfig::default();
		let projection = AppState::default().projection(&config);

		assert!(projection.classes.iter().all(|t| !t.on));
		assert!(projection.root_styles.is_empty());
	}

	#[rstest]
	fn test_projection_reflects_flags() {
		let config = EnhanceConfig::default();
		let state = AppState {
			reduced_motion: true,
			keyboard_mode: true,
			viewport_unit: Some(8.5),
		};
		let projection = state.projection(&config);

		assert_eq!(
			projection.classes,
			vec![
				ClassToggle {
					scope: Scope::Root,
					class: "reduce-motion".to_string(),
					on: true,
				},
				ClassToggle {
					scope: Scope::Body,
					class: "using-keyboard".to_string(),
					on: true,
				},
			]
		);
		assert_eq!(
			projection.root_styles,
			vec![("--vh".to_string(), "8.5px".to_string())]
		);
	}

	#[rstest]
	fn test_update_applies_projection_to_document() {
		let host = MockHost::new();
		let config = EnhanceConfig::default();
		let state = SharedState::default();

		state
			.update(&host, &config, |s| s.keyboard_mode = true)
			.unwrap();
		let body = host.body().unwrap();
		assert!(host.has_class(&body, "using-keyboard"));

		state
			.update(&host, &config, |s| s.keyboard_mode = false)
			.unwrap();
		assert!(!host.has_class(&body, "using-keyboard"));
		assert!(!state.snapshot().keyboard_mode);
	}
}

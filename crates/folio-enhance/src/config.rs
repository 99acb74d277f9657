//! Enhancement configuration
//!
//! [`EnhanceConfig::default`] reproduces the page contract: the selectors the
//! markup is expected to use, the class vocabulary the stylesheet consumes and
//! the timing constants. A page may override any subset of it with an embedded
//! JSON document:
//!
//! ```html
//! <script type="application/json" id="folio-config">
//!   { "reveal": { "threshold": 0.25 }, "worker": { "enabled": false } }
//! </script>
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, EnhanceResult};

/// Element id of the embedded configuration script.
pub const CONFIG_ELEMENT_ID: &str = "folio-config";

/// Largest accepted delay step between project cards.
pub const MAX_STAGGER_STEP_MS: u64 = 60_000;

/// Selectors describing the inbound markup contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
	/// Elements with an entrance animation.
	pub animate: String,
	/// Cards receiving a staggered transition delay.
	pub project_card: String,
	/// Images marked `loaded`/`error`.
	pub project_image: String,
	/// Links that warm an animated image on hover.
	pub project_link: String,
	/// Animated image nested in a project link.
	pub animated_image: String,
	/// Fixed header whose height offsets anchor scrolling.
	pub header: String,
	/// Same-document fragment links.
	pub fragment_link: String,
	/// Links opening a new browsing context.
	pub external_link: String,
}

impl Default for Selectors {
	fn default() -> Self {
		Self {
			animate: "[data-animate]".to_string(),
			project_card: ".project-card".to_string(),
			project_image: ".project-image".to_string(),
			project_link: ".project-link".to_string(),
			animated_image: ".animated-image".to_string(),
			header: "header".to_string(),
			fragment_link: "a[href^=\"#\"]".to_string(),
			external_link: "a[target=\"_blank\"]".to_string(),
		}
	}
}

/// Classes written for the stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassNames {
	/// Added to an animated element once revealed.
	pub revealed: String,
	/// Added to the root element while reduced motion is preferred.
	pub reduce_motion: String,
	/// Added to an image that finished loading.
	pub loaded: String,
	/// Added to an image that failed to load.
	pub error: String,
	/// Added to `<body>` while the keyboard is the active input.
	pub keyboard: String,
}

impl Default for ClassNames {
	fn default() -> Self {
		Self {
			revealed: "animate-in".to_string(),
			reduce_motion: "reduce-motion".to_string(),
			loaded: "loaded".to_string(),
			error: "error".to_string(),
			keyboard: "using-keyboard".to_string(),
		}
	}
}

/// Visibility watching and stagger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealSettings {
	/// Visible fraction that reveals an element.
	pub threshold: f64,
	/// Bottom contraction of the viewport in pixels.
	pub bottom_margin_px: f64,
	/// Delay step between consecutive project cards.
	pub stagger_step_ms: u64,
}

impl Default for RevealSettings {
	fn default() -> Self {
		Self {
			threshold: 0.1,
			bottom_margin_px: 100.0,
			stagger_step_ms: 100,
		}
	}
}

impl RevealSettings {
	/// Root margin string for the visibility observer.
	pub fn root_margin(&self) -> String {
		format!("0px 0px -{}px 0px", self.bottom_margin_px)
	}

	/// Delay step as a [`Duration`].
	pub fn stagger_step(&self) -> Duration {
		Duration::from_millis(self.stagger_step_ms)
	}
}

/// Viewport height normalization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
	/// Custom property receiving one hundredth of the viewport height.
	pub property: String,
	/// Trailing-edge debounce for `resize`.
	pub resize_debounce_ms: u32,
	/// Fixed delay after each `orientationchange`.
	pub orientation_delay_ms: u32,
}

impl Default for ViewportSettings {
	fn default() -> Self {
		Self {
			property: "--vh".to_string(),
			resize_debounce_ms: 100,
			orientation_delay_ms: 100,
		}
	}
}

/// Background worker registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
	/// Whether to register the worker at all.
	pub enabled: bool,
	/// Site-root path of the worker script.
	pub script_path: String,
}

impl Default for WorkerSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			script_path: "/sw.js".to_string(),
		}
	}
}

/// Complete enhancement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
	/// Inbound markup contract.
	pub selectors: Selectors,
	/// Outbound class vocabulary.
	pub classes: ClassNames,
	/// Entrance animation settings.
	pub reveal: RevealSettings,
	/// Viewport unit settings.
	pub viewport: ViewportSettings,
	/// Media query for the reduced-motion preference.
	pub reduced_motion_query: String,
	/// `rel` tokens every external link must carry.
	pub isolation_tokens: Vec<String>,
	/// Host names that log the page-load duration.
	pub dev_hosts: Vec<String>,
	/// Background worker settings.
	pub worker: WorkerSettings,
}

impl Default for EnhanceConfig {
	fn default() -> Self {
		Self {
			selectors: Selectors::default(),
			classes: ClassNames::default(),
			reveal: RevealSettings::default(),
			viewport: ViewportSettings::default(),
			reduced_motion_query: "(prefers-reduced-motion: reduce)".to_string(),
			isolation_tokens: vec!["noopener".to_string(), "noreferrer".to_string()],
			dev_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
			worker: WorkerSettings::default(),
		}
	}
}

impl EnhanceConfig {
	/// Parses a (partial) JSON configuration and validates the result.
	///
	/// Missing fields fall back to their defaults.
	pub fn from_json(json: &str) -> EnhanceResult<Self> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	/// Returns true if `hostname` is a local development host.
	pub fn is_dev_host(&self, hostname: &str) -> bool {
		self.dev_hosts.iter().any(|h| h.eq_ignore_ascii_case(hostname))
	}

	/// Checks value ranges that serde cannot express.
	pub fn validate(&self) -> EnhanceResult<()> {
		if !(0.0..=1.0).contains(&self.reveal.threshold) {
			return Err(invalid("reveal.threshold", "must be within 0..=1"));
		}
		if !self.reveal.bottom_margin_px.is_finite() || self.reveal.bottom_margin_px < 0.0 {
			return Err(invalid(
				"reveal.bottom_margin_px",
				"must be a finite, non-negative number",
			));
		}
		if self.reveal.stagger_step_ms > MAX_STAGGER_STEP_MS {
			return Err(invalid("reveal.stagger_step_ms", "must be at most 60000"));
		}
		if !self.viewport.property.starts_with("--") {
			return Err(invalid("viewport.property", "custom properties start with `--`"));
		}
		if self.worker.enabled && !self.worker.script_path.starts_with('/') {
			return Err(invalid("worker.script_path", "must be a site-root path"));
		}
		if self.isolation_tokens.is_empty() {
			return Err(invalid("isolation_tokens", "at least one token is required"));
		}
		if self
			.isolation_tokens
			.iter()
			.any(|t| t.is_empty() || t.chars().any(char::is_whitespace))
		{
			return Err(invalid(
				"isolation_tokens",
				"tokens must be non-empty and contain no whitespace",
			));
		}

		let selectors = [
			("selectors.animate", &self.selectors.animate),
			("selectors.project_card", &self.selectors.project_card),
			("selectors.project_image", &self.selectors.project_image),
			("selectors.project_link", &self.selectors.project_link),
			("selectors.animated_image", &self.selectors.animated_image),
			("selectors.header", &self.selectors.header),
			("selectors.fragment_link", &self.selectors.fragment_link),
			("selectors.external_link", &self.selectors.external_link),
		];
		for (field, value) in selectors {
			if value.trim().is_empty() {
				return Err(invalid(field, "selector must not be empty"));
			}
		}

		Ok(())
	}
}

fn invalid(field: &'static str, reason: &str) -> EnhanceError {
	EnhanceError::InvalidConfig {
		field,
		reason: reason.to_string(),
	}
}

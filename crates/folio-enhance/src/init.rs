//! Initialization sequencing
//!
//! [`Enhancer`] owns the shared state and runs the setup steps once the
//! document is parsed, in a fixed order. Reduced-motion compliance runs first
//! so elements it reveals never get a visibility observer.
//!
//! Steps are independent: a failing step is logged and recorded in the
//! [`StartupReport`], and the remaining steps still run. The page stays usable
//! whatever happens here.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::anchor::wire_smooth_scroll;
use crate::config::{CONFIG_ELEMENT_ID, EnhanceConfig};
use crate::error::{EnhanceError, EnhanceResult};
use crate::host::{EventKind, Host, Target};
use crate::images::{optimize_images, wire_hover_preload};
use crate::keyboard::track_input_modality;
use crate::links::harden_external_links;
use crate::motion::apply_reduced_motion;
use crate::once::OneShot;
use crate::reveal::{stagger_cards, watch_animations};
use crate::state::{AppState, SharedState};
use crate::viewport::watch_viewport;
use crate::worker::{log_load_timing, register_background_worker};
use crate::{debug_log, error_log, warn_log};

/// A setup step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
	/// Reduced-motion compliance.
	ReducedMotion,
	/// Project card transition delays.
	Stagger,
	/// Visibility watching.
	Reveal,
	/// Fragment link interception.
	SmoothScroll,
	/// Image load marking.
	Images,
	/// Animated image warming on hover.
	HoverPreload,
	/// External link `rel` hardening.
	LinkHardening,
	/// Keyboard mode tracking.
	Keyboard,
	/// Viewport unit publication.
	Viewport,
	/// Service worker registration.
	Worker,
	/// Local page-load timing.
	LoadTiming,
}

impl Step {
	/// Every step in execution order.
	pub const ORDER: [Step; 11] = [
		Step::ReducedMotion,
		Step::Stagger,
		Step::Reveal,
		Step::SmoothScroll,
		Step::Images,
		Step::HoverPreload,
		Step::LinkHardening,
		Step::Keyboard,
		Step::Viewport,
		Step::Worker,
		Step::LoadTiming,
	];

	/// Name used in logs.
	pub fn name(&self) -> &'static str {
		match self {
			Self::ReducedMotion => "reduced-motion",
			Self::Stagger => "stagger",
			Self::Reveal => "reveal",
			Self::SmoothScroll => "smooth-scroll",
			Self::Images => "images",
			Self::HoverPreload => "hover-preload",
			Self::LinkHardening => "link-hardening",
			Self::Keyboard => "keyboard",
			Self::Viewport => "viewport",
			Self::Worker => "worker",
			Self::LoadTiming => "load-timing",
		}
	}
}

impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
	/// The step.
	pub step: Step,
	/// `Ok(detail)` with the step's return value, or the error message.
	pub outcome: Result<String, String>,
}

/// Outcome of every step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
	records: Vec<StepRecord>,
}

impl StartupReport {
	fn record<T: fmt::Debug>(&mut self, step: Step, result: EnhanceResult<T>) {
		let outcome = match result {
			Ok(value) => Ok(format!("{value:?}")),
			Err(err) => {
				warn_log!("Enhancement step `{}` failed: {}", step, err);
				Err(err.to_string())
			}
		};
		self.records.push(StepRecord { step, outcome });
	}

	/// All records, in execution order.
	pub fn records(&self) -> &[StepRecord] {
		&self.records
	}

	/// Steps that ran, in execution order.
	pub fn steps(&self) -> Vec<Step> {
		self.records.iter().map(|r| r.step).collect()
	}

	/// Steps that failed, with their error messages.
	pub fn failures(&self) -> Vec<(Step, &str)> {
		self.records
			.iter()
			.filter_map(|r| r.outcome.as_ref().err().map(|e| (r.step, e.as_str())))
			.collect()
	}

	/// Detail string of a successful step.
	pub fn detail(&self, step: Step) -> Option<&str> {
		self.records
			.iter()
			.find(|r| r.step == step)
			.and_then(|r| r.outcome.as_ref().ok())
			.map(String::as_str)
	}

	/// Returns true if no step failed.
	pub fn is_clean(&self) -> bool {
		self.records.iter().all(|r| r.outcome.is_ok())
	}
}

/// How [`Enhancer::start`] proceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
	/// The document was ready; all steps ran.
	Immediate,
	/// The document was loading; steps run on `DOMContentLoaded`.
	Deferred,
}

/// Runs the enhancement steps against a host.
pub struct Enhancer<H: Host> {
	host: Rc<H>,
	config: Rc<EnhanceConfig>,
	state: SharedState,
	started: Cell<bool>,
	report: RefCell<Option<StartupReport>>,
}

impl<H: Host> fmt::Debug for Enhancer<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Enhancer")
			.field("config", &self.config)
			.field("state", &self.state.snapshot())
			.field("started", &self.started.get())
			.finish()
	}
}

impl<H: Host> Enhancer<H> {
	/// Creates an enhancer with a validated configuration.
	pub fn new(host: Rc<H>, config: EnhanceConfig) -> EnhanceResult<Rc<Self>> {
		config.validate()?;
		Ok(Rc::new(Self {
			host,
			config: Rc::new(config),
			state: SharedState::default(),
			started: Cell::new(false),
			report: RefCell::new(None),
		}))
	}

	/// Creates an enhancer configured by the page's embedded JSON, if any.
	///
	/// An invalid embedded configuration is logged and replaced by defaults.
	pub fn from_document(host: Rc<H>) -> Rc<Self> {
		let config = match load_config(host.as_ref()) {
			Ok(Some(config)) => config,
			Ok(None) => EnhanceConfig::default(),
			Err(err) => {
				warn_log!("Ignoring embedded configuration: {}", err);
				EnhanceConfig::default()
			}
		};
		Rc::new(Self {
			host,
			config: Rc::new(config),
			state: SharedState::default(),
			started: Cell::new(false),
			report: RefCell::new(None),
		})
	}

	/// The active configuration.
	pub fn config(&self) -> &EnhanceConfig {
		&self.config
	}

	/// A copy of the current document-level state.
	pub fn state(&self) -> AppState {
		self.state.snapshot()
	}

	/// Report of the completed run, if the steps have run.
	pub fn report(&self) -> Option<StartupReport> {
		self.report.borrow().clone()
	}

	/// Runs the steps now, or once the document is parsed.
	///
	/// Can be called once per enhancer.
	pub fn start(self: &Rc<Self>) -> EnhanceResult<StartPhase> {
		if self.started.replace(true) {
			return Err(EnhanceError::AlreadyStarted);
		}

		if !self.host.is_loading() {
			self.run();
			return Ok(StartPhase::Immediate);
		}

		let this = self.clone();
		let armed = OneShot::arm_single(
			&self.host,
			Target::Document,
			EventKind::DomContentLoaded,
			move |_| this.run(),
		);
		if let Err(err) = armed {
			self.started.set(false);
			return Err(err.into());
		}
		debug_log!("Document still loading; deferring enhancements");
		Ok(StartPhase::Deferred)
	}

	fn run(&self) {
		let host = &self.host;
		let config = &self.config;
		let state = &self.state;
		let mut report = StartupReport::default();

		report.record(Step::ReducedMotion, apply_reduced_motion(host, config, state));
		report.record(Step::Stagger, stagger_cards(host.as_ref(), config));
		report.record(Step::Reveal, watch_animations(host, config));
		report.record(Step::SmoothScroll, wire_smooth_scroll(host, config));
		report.record(Step::Images, optimize_images(host, config));
		report.record(Step::HoverPreload, wire_hover_preload(host, config));
		report.record(Step::LinkHardening, harden_external_links(host.as_ref(), config));
		report.record(Step::Keyboard, track_input_modality(host, config, state));
		report.record(Step::Viewport, watch_viewport(host, config, state));
		report.record(Step::Worker, register_background_worker(host.as_ref(), config));
		report.record(Step::LoadTiming, log_load_timing(host, config));

		if !report.is_clean() {
			error_log!(
				"{} of {} enhancement steps failed",
				report.failures().len(),
				Step::ORDER.len()
			);
		}
		*self.report.borrow_mut() = Some(report);
	}
}

/// Reads the embedded `<script id="folio-config">` configuration.
///
/// Returns `Ok(None)` when the page has none.
pub fn load_config<H: Host>(host: &H) -> EnhanceResult<Option<EnhanceConfig>> {
	let Some(node) = host.element_by_id(CONFIG_ELEMENT_ID) else {
		return Ok(None);
	};
	let text = host.text_content(&node).unwrap_or_default();
	EnhanceConfig::from_json(&text).map(Some)
}

/// Builds an enhancer from the page and starts it.
///
/// Failures are logged; the returned enhancer can be inspected either way.
pub fn launch<H: Host>(host: Rc<H>) -> Rc<Enhancer<H>> {
	let enhancer = Enhancer::from_document(host);
	if let Err(err) = enhancer.start() {
		error_log!("Failed to start enhancements: {}", err);
	}
	enhancer
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockElement, MockHost};
	use rstest::rstest;

	#[rstest]
	fn test_runs_every_step_in_order() {
		let host = Rc::new(MockHost::new());
		let enhancer = Enhancer::new(host, EnhanceConfig::default()).unwrap();

		assert_eq!(enhancer.start().unwrap(), StartPhase::Immediate);

		let report = enhancer.report().unwrap();
		assert_eq!(report.steps(), Step::ORDER.to_vec());
		assert!(report.is_clean());
	}

	#[rstest]
	fn test_second_start_is_rejected() {
		let enhancer = Enhancer::new(Rc::new(MockHost::new()), EnhanceConfig::default()).unwrap();
		enhancer.start().unwrap();

		assert!(matches!(enhancer.start(), Err(EnhanceError::AlreadyStarted)));
	}

	#[rstest]
	fn test_invalid_config_is_rejected_up_front() {
		let mut config = EnhanceConfig::default();
		config.reveal.threshold = 2.0;

		let result = Enhancer::new(Rc::new(MockHost::new()), config);
		assert!(matches!(result, Err(EnhanceError::InvalidConfig { .. })));
	}

	#[rstest]
	fn test_embedded_config_is_used() {
		let host = Rc::new(MockHost::new());
		host.append_to_body(
			MockElement::new("script")
				.id("folio-config")
				.attr("type", "application/json")
				.text(r#"{ "classes": { "revealed": "is-visible" } }"#),
		);

		let enhancer = Enhancer::from_document(host);
		assert_eq!(enhancer.config().classes.revealed, "is-visible");
	}

	#[rstest]
	#[case("not json")]
	#[case(r#"{ "reveal": { "threshold": -1 } }"#)]
	fn test_broken_embedded_config_falls_back(#[case] text: &str) {
		let host = Rc::new(MockHost::new());
		host.append_to_body(MockElement::new("script").id("folio-config").text(text));

		assert!(load_config(host.as_ref()).is_err());
		let enhancer = Enhancer::from_document(host);
		assert_eq!(*enhancer.config(), EnhanceConfig::default());
	}

	#[rstest]
	fn test_report_detail_and_failures() {
		let mut report = StartupReport::default();
		report.record(Step::Stagger, Ok::<usize, EnhanceError>(3));
		report.record::<()>(Step::Viewport, Err(EnhanceError::AlreadyStarted));

		assert_eq!(report.detail(Step::Stagger), Some("3"));
		assert_eq!(report.detail(Step::Viewport), None);
		assert_eq!(
			report.failures(),
			vec![(Step::Viewport, "Enhancements have already been started")]
		);
		assert!(!report.is_clean());
	}
}

//! Background worker registration and local load timing
//!
//! Both are optional side effects: their outcome is only ever logged.

use std::rc::Rc;

use crate::config::EnhanceConfig;
use crate::error::{EnhanceResult, HostError};
use crate::host::{EventKind, Host, Target};
use crate::once::OneShot;
use crate::{debug_log, info_log, warn_log};

/// Why [`register_background_worker`] did or did not register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRegistration {
	/// Registration was requested; the outcome is logged asynchronously.
	Requested,
	/// Disabled by configuration.
	Disabled,
	/// The page was not served over `https:`.
	InsecureOrigin,
	/// The browser has no service worker support.
	Unsupported,
}

/// What [`log_load_timing`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTiming {
	/// Not a development host.
	Skipped,
	/// The page had already loaded; the timing was logged right away.
	Logged,
	/// Waiting for the window `load` event.
	Armed,
}

/// Registers the service worker when served over a secure transport.
pub fn register_background_worker<H: Host>(
	host: &H,
	config: &EnhanceConfig,
) -> EnhanceResult<WorkerRegistration> {
	if !config.worker.enabled {
		return Ok(WorkerRegistration::Disabled);
	}
	if !host.is_secure() {
		debug_log!("Skipping service worker registration on an insecure origin");
		return Ok(WorkerRegistration::InsecureOrigin);
	}

	let script = config.worker.script_path.clone();
	let requested = host.register_worker(
		&config.worker.script_path,
		Box::new(move |outcome| match outcome {
			Ok(scope) => info_log!("Service worker {} registered with scope {}", script, scope),
			Err(reason) => warn_log!("Service worker {} registration failed: {}", script, reason),
		}),
	);
	match requested {
		Ok(()) => Ok(WorkerRegistration::Requested),
		Err(HostError::Unsupported(_)) => {
			debug_log!("Service workers unavailable; skipping registration");
			Ok(WorkerRegistration::Unsupported)
		}
		Err(err) => Err(err.into()),
	}
}

/// On development hosts, logs the page-load duration once the window loads.
///
/// The module usually starts after an asynchronous fetch, so the window may
/// already have loaded; the elapsed time is then logged immediately.
pub fn log_load_timing<H: Host>(host: &Rc<H>, config: &EnhanceConfig) -> EnhanceResult<LoadTiming> {
	if !config.is_dev_host(&host.hostname()) {
		return Ok(LoadTiming::Skipped);
	}

	if host.is_complete() {
		info_log!("Page load time: {:.0}ms", host.now());
		return Ok(LoadTiming::Logged);
	}

	let handler_host = host.clone();
	OneShot::arm_single(host, Target::Window, EventKind::Load, move |_| {
		info_log!("Page load time: {:.0}ms", handler_host.now());
	})?;
	Ok(LoadTiming::Armed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockHost;
	use rstest::rstest;

	#[rstest]
	#[case(true, true, WorkerRegistration::Requested, 1)]
	#[case(false, true, WorkerRegistration::InsecureOrigin, 0)]
	#[case(true, false, WorkerRegistration::Disabled, 0)]
	fn test_registration_gate(
		#[case] secure: bool,
		#[case] enabled: bool,
		#[case] expected: WorkerRegistration,
		#[case] attempts: usize,
	) {
		let host = MockHost::new();
		host.set_secure(secure);
		let mut config = EnhanceConfig::default();
		config.worker.enabled = enabled;

		assert_eq!(register_background_worker(&host, &config).unwrap(), expected);
		assert_eq!(host.worker_scripts().len(), attempts);
	}

	#[rstest]
	fn test_registration_failure_is_not_an_error() {
		let host = MockHost::new();
		host.set_secure(true);
		host.set_worker_outcome(Err("SecurityError".to_string()));

		let result = register_background_worker(&host, &EnhanceConfig::default());

		assert_eq!(result.unwrap(), WorkerRegistration::Requested);
		assert_eq!(host.worker_scripts(), vec!["/sw.js".to_string()]);
	}

	#[rstest]
	fn test_missing_worker_support_is_a_quiet_skip() {
		let host = MockHost::new();
		host.set_secure(true);
		host.set_worker_supported(false);

		let result = register_background_worker(&host, &EnhanceConfig::default());

		assert_eq!(result.unwrap(), WorkerRegistration::Unsupported);
		assert!(host.worker_scripts().is_empty());
	}

	#[rstest]
	#[case("localhost", LoadTiming::Armed, 1)]
	#[case("127.0.0.1", LoadTiming::Armed, 1)]
	#[case("portfolio.example", LoadTiming::Skipped, 0)]
	fn test_load_timing_only_on_dev_hosts(
		#[case] hostname: &str,
		#[case] expected: LoadTiming,
		#[case] listeners: usize,
	) {
		let host = Rc::new(MockHost::new());
		host.set_hostname(hostname);

		assert_eq!(log_load_timing(&host, &EnhanceConfig::default()).unwrap(), expected);
		assert_eq!(host.listeners_on(&Target::Window, EventKind::Load), listeners);

		host.finish_loading();
		assert_eq!(host.listener_count(), 0);
	}

	#[rstest]
	fn test_load_timing_after_load_logs_immediately() {
		let host = Rc::new(MockHost::new());
		host.set_hostname("localhost");
		host.set_complete(true);

		assert_eq!(
			log_load_timing(&host, &EnhanceConfig::default()).unwrap(),
			LoadTiming::Logged
		);
		assert_eq!(host.listener_count(), 0);
	}
}

//! Error types
//!
//! Nothing in this crate is fatal to the page. These errors exist so each
//! setup step can report what went wrong; [`Enhancer`](crate::init::Enhancer)
//! logs them and moves on to the next step.

/// Failures reported by a [`Host`](crate::host::Host) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
	/// A JavaScript call threw.
	#[error("JavaScript error: {0}")]
	Js(String),
	/// The environment does not provide the capability.
	#[error("Capability not supported: {0}")]
	Unsupported(&'static str),
	/// A required global object (window, document, ...) is missing.
	#[error("Global object not available: {0}")]
	MissingGlobal(&'static str),
}

/// Failures of an enhancement step.
#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
	/// The host rejected an operation.
	#[error(transparent)]
	Host(#[from] HostError),
	/// A configuration value is out of range.
	#[error("Invalid configuration for `{field}`: {reason}")]
	InvalidConfig {
		/// Dotted path of the offending field.
		field: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// The embedded configuration is not valid JSON for [`EnhanceConfig`](crate::config::EnhanceConfig).
	#[error("Failed to parse configuration: {0}")]
	ConfigParse(#[from] serde_json::Error),
	/// [`Enhancer::start`](crate::init::Enhancer::start) was called twice.
	#[error("Enhancements have already been started")]
	AlreadyStarted,
}

/// Result alias for enhancement steps.
pub type EnhanceResult<T> = Result<T, EnhanceError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_host_error_display() {
		assert_eq!(
			HostError::Js("TypeError".to_string()).to_string(),
			"JavaScript error: TypeError"
		);
		assert_eq!(
			HostError::Unsupported("IntersectionObserver").to_string(),
			"Capability not supported: IntersectionObserver"
		);
	}

	#[rstest]
	fn test_enhance_error_wraps_host_error_transparently() {
		let err: EnhanceError = HostError::MissingGlobal("window").into();
		assert_eq!(err.to_string(), "Global object not available: window");
	}

	#[rstest]
	fn test_invalid_config_display() {
		let err = EnhanceError::InvalidConfig {
			field: "reveal.threshold",
			reason: "must be within 0..=1".to_string(),
		};
		assert!(err.to_string().contains("reveal.threshold"));
		assert!(err.to_string().contains("0..=1"));
	}
}

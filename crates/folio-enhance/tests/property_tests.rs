//! Property-based tests for the pure helpers.

#![cfg(not(target_arch = "wasm32"))]

use std::time::Duration;

use folio_enhance::links::harden_rel;
use folio_enhance::reveal::{css_seconds, stagger_delay};
use proptest::prelude::*;
use rstest::*;

const TOKENS: [&str; 2] = ["noopener", "noreferrer"];

fn rel_value() -> impl Strategy<Value = Option<String>> {
	prop::option::of(
		prop::collection::vec(
			prop_oneof![
				Just("nofollow".to_string()),
				Just("NoOpener".to_string()),
				Just("noreferrer".to_string()),
				Just("external".to_string()),
				"[a-z]{1,8}",
			],
			0..5,
		)
		.prop_map(|tokens| tokens.join(" ")),
	)
}

proptest! {
	/// Every isolation token is present after hardening.
	#[rstest]
	fn prop_hardened_rel_contains_tokens(existing in rel_value()) {
		let hardened = harden_rel(existing.as_deref(), &TOKENS)
			.or(existing.clone())
			.unwrap_or_default();

		for token in TOKENS {
			prop_assert!(
				hardened
					.split_ascii_whitespace()
					.any(|t| t.eq_ignore_ascii_case(token))
			);
		}
	}

	/// Existing tokens keep their order and spelling.
	#[rstest]
	fn prop_hardening_is_additive(existing in rel_value()) {
		if let Some(hardened) = harden_rel(existing.as_deref(), &TOKENS) {
			let before: Vec<&str> = existing
				.as_deref()
				.unwrap_or("")
				.split_ascii_whitespace()
				.collect();
			let after: Vec<&str> = hardened.split_ascii_whitespace().collect();
			prop_assert!(after.len() > before.len());
			prop_assert_eq!(&after[..before.len()], &before[..]);
		}
	}

	/// A hardened value needs no further change.
	#[rstest]
	fn prop_hardening_is_idempotent(existing in rel_value()) {
		if let Some(hardened) = harden_rel(existing.as_deref(), &TOKENS) {
			prop_assert_eq!(harden_rel(Some(&hardened), &TOKENS), None);
		}
	}

	/// The delay of card `i` is exactly `i` steps.
	#[rstest]
	fn prop_stagger_delay_is_linear(index in 0usize..200, step_ms in 1u64..1000) {
		let step = Duration::from_millis(step_ms);
		let delay = stagger_delay(index, step);

		prop_assert_eq!(delay.as_millis(), index as u128 * u128::from(step_ms));
	}

	/// Tenths of a second print without float noise.
	#[rstest]
	fn prop_default_stagger_prints_exact_tenths(index in 0usize..100) {
		let css = css_seconds(stagger_delay(index, Duration::from_millis(100)));
		let expected = if index == 0 {
			"0s".to_string()
		} else if index % 10 == 0 {
			format!("{}s", index / 10)
		} else {
			format!("{}.{}s", index / 10, index % 10)
		};

		prop_assert_eq!(css, expected);
	}
}

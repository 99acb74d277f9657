//! External link hardening
//!
//! Links opening a new browsing context must carry `noopener noreferrer` so the
//! new page gets no handle on ours and no referrer.

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::Host;

/// Computes the hardened `rel` value.
///
/// Missing tokens are appended to the existing value in the order given;
/// existing tokens are kept as written. Token comparison is ASCII
/// case-insensitive. Returns `None` when every token is already present.
pub fn harden_rel<S: AsRef<str>>(existing: Option<&str>, tokens: &[S]) -> Option<String> {
	let existing = existing.unwrap_or("");
	let present: Vec<&str> = existing.split_ascii_whitespace().collect();

	let mut missing: Vec<&str> = Vec::new();
	for token in tokens.iter().map(AsRef::as_ref) {
		let known = present
			.iter()
			.chain(missing.iter())
			.any(|p| p.eq_ignore_ascii_case(token));
		if !known {
			missing.push(token);
		}
	}

	if missing.is_empty() {
		return None;
	}

	let mut rel = present.join(" ");
	for token in missing {
		if !rel.is_empty() {
			rel.push(' ');
		}
		rel.push_str(token);
	}
	Some(rel)
}

/// Hardens every external link. Returns the number of links changed.
pub fn harden_external_links<H: Host>(host: &H, config: &EnhanceConfig) -> EnhanceResult<usize> {
	let mut changed = 0;
	for link in host.query_all(&config.selectors.external_link) {
		let current = host.attribute(&link, "rel");
		if let Some(rel) = harden_rel(current.as_deref(), &config.isolation_tokens) {
			host.set_attribute(&link, "rel", &rel)?;
			changed += 1;
		}
	}
	Ok(changed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockElement, MockHost};
	use rstest::rstest;

	const TOKENS: [&str; 2] = ["noopener", "noreferrer"];

	#[rstest]
	#[case(None, Some("noopener noreferrer"))]
	#[case(Some(""), Some("noopener noreferrer"))]
	#[case(Some("nofollow"), Some("nofollow noopener noreferrer"))]
	#[case(Some("  nofollow   me "), Some("nofollow me noopener noreferrer"))]
	#[case(Some("noreferrer"), Some("noreferrer noopener"))]
	#[case(Some("NoOpener"), Some("NoOpener noreferrer"))]
	#[case(Some("noopener noreferrer"), None)]
	#[case(Some("external noreferrer noopener"), None)]
	fn test_harden_rel(#[case] existing: Option<&str>, #[case] expected: Option<&str>) {
		assert_eq!(harden_rel(existing, &TOKENS).as_deref(), expected);
	}

	#[rstest]
	fn test_duplicate_configured_tokens_are_added_once() {
		assert_eq!(
			harden_rel(None, &["noopener", "noopener"]).as_deref(),
			Some("noopener")
		);
	}

	#[rstest]
	fn test_harden_external_links() {
		let host = MockHost::new();
		let bare = host.append_to_body(MockElement::new("a").attr("target", "_blank"));
		let followed = host.append_to_body(
			MockElement::new("a")
				.attr("target", "_blank")
				.attr("rel", "nofollow"),
		);
		let safe = host.append_to_body(
			MockElement::new("a")
				.attr("target", "_blank")
				.attr("rel", "noopener noreferrer"),
		);
		let same_tab = host.append_to_body(MockElement::new("a").attr("href", "/cv"));

		let changed = harden_external_links(&host, &EnhanceConfig::default()).unwrap();

		assert_eq!(changed, 2);
		assert_eq!(host.attribute(&bare, "rel").as_deref(), Some("noopener noreferrer"));
		assert_eq!(
			host.attribute(&followed, "rel").as_deref(),
			Some("nofollow noopener noreferrer")
		);
		assert!(host.attribute_writes(safe, "rel").is_empty());
		assert_eq!(host.attribute(&same_tab, "rel"), None);
	}
}

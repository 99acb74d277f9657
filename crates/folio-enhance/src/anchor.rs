//! Smooth anchor navigation
//!
//! Same-document fragment links scroll smoothly to their target, leaving room
//! for the fixed header. Bare `#` links keep the browser default. Links whose
//! target does not exist still have the default jump suppressed and do
//! nothing else.

use std::rc::Rc;

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::{EventKind, Host, ScrollBehavior, Target};

/// What a click on a fragment link should do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorOutcome {
	/// Leave the event to the browser.
	Passthrough,
	/// Suppress the default jump; there is nothing to scroll to.
	Unresolved,
	/// Suppress the default jump and scroll to this offset.
	ScrollTo(f64),
}

/// Decides what clicking a link with `href` does.
pub fn scroll_target<H: Host>(host: &H, config: &EnhanceConfig, href: Option<&str>) -> AnchorOutcome {
	let fragment = match href.and_then(|h| h.strip_prefix('#')) {
		Some(fragment) if !fragment.is_empty() => fragment,
		_ => return AnchorOutcome::Passthrough,
	};

	let Some(target) = host.element_by_id(fragment) else {
		return AnchorOutcome::Unresolved;
	};

	let header_height = host
		.query(&config.selectors.header)
		.map(|header| host.offset_height(&header))
		.unwrap_or(0.0);

	AnchorOutcome::ScrollTo(host.offset_top(&target) - header_height)
}

/// Intercepts clicks on every fragment link.
///
/// Returns the number of links wired.
pub fn wire_smooth_scroll<H: Host>(host: &Rc<H>, config: &Rc<EnhanceConfig>) -> EnhanceResult<usize> {
	let links = host.query_all(&config.selectors.fragment_link);
	for link in &links {
		let handler_host = host.clone();
		let handler_config = config.clone();
		let handler_link = link.clone();
		host.listen(
			Target::Element(link.clone()),
			EventKind::Click,
			Rc::new(move |event| {
				let href = handler_host.attribute(&handler_link, "href");
				match scroll_target(handler_host.as_ref(), &handler_config, href.as_deref()) {
					AnchorOutcome::Passthrough => {}
					AnchorOutcome::Unresolved => event.prevent_default(),
					AnchorOutcome::ScrollTo(top) => {
						event.prevent_default();
						handler_host.scroll_to(top, ScrollBehavior::Smooth);
					}
				}
			}),
		)?;
	}
	Ok(links.len())
}

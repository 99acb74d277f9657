//! Host environment abstraction
//!
//! Every enhancement talks to the page through the [`Host`] trait instead of
//! touching `web-sys` directly. In the browser the trait is implemented by
//! [`WebHost`](crate::web::WebHost); on native targets (and in every test) it is
//! implemented by [`MockHost`](crate::testing::MockHost).
//!
//! The trait is deliberately narrow: it exposes exactly the DOM queries,
//! mutations, events, timers and window capabilities the enhancements need.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::HostError;

/// Identifier of a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Identifier of a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Identifier of a visibility observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Event types the enhancements listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	/// `DOMContentLoaded` on the document.
	DomContentLoaded,
	/// `load` on the window or an image.
	Load,
	/// `error` on an image.
	Error,
	/// `click`
	Click,
	/// `mouseenter`
	MouseEnter,
	/// `mousedown`
	MouseDown,
	/// `keydown`
	KeyDown,
	/// `resize` on the window.
	Resize,
	/// `orientationchange` on the window.
	OrientationChange,
	/// `change` on a media query list.
	Change,
}

impl EventKind {
	/// Returns the DOM event name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::DomContentLoaded => "DOMContentLoaded",
			Self::Load => "load",
			Self::Error => "error",
			Self::Click => "click",
			Self::MouseEnter => "mouseenter",
			Self::MouseDown => "mousedown",
			Self::KeyDown => "keydown",
			Self::Resize => "resize",
			Self::OrientationChange => "orientationchange",
			Self::Change => "change",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where a listener is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Target<N> {
	/// The document itself.
	Document,
	/// The window.
	Window,
	/// A specific element.
	Element(N),
	/// The media query list produced by evaluating the given query.
	MediaQuery(String),
}

/// A DOM event as seen by an enhancement handler.
///
/// Only the fields the enhancements read are carried over from the native
/// event. Calling [`DomEvent::prevent_default`] is forwarded to the native
/// event by the host once the handler returns.
#[derive(Debug)]
pub struct DomEvent {
	/// The event type.
	pub kind: EventKind,
	/// `KeyboardEvent.key` for keyboard events.
	pub key: Option<String>,
	/// `MediaQueryListEvent.matches` for media query changes.
	pub matches: Option<bool>,
	default_prevented: Cell<bool>,
}

impl DomEvent {
	/// Creates an event with no payload.
	pub fn new(kind: EventKind) -> Self {
		Self {
			kind,
			key: None,
			matches: None,
			default_prevented: Cell::new(false),
		}
	}

	/// Sets the keyboard key.
	pub fn with_key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Sets the media query match state.
	pub fn with_matches(mut self, matches: bool) -> Self {
		self.matches = Some(matches);
		self
	}

	/// Suppresses the browser's default action for this event.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Returns true if a handler suppressed the default action.
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

/// Shared event handler.
pub type Handler = Rc<dyn Fn(&DomEvent)>;

/// Scroll animation requested from [`Host::scroll_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
	/// Animate the scroll.
	Smooth,
	/// Jump immediately.
	Instant,
}

/// Options for a visibility observer.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionOptions {
	/// Fraction of the element that must be visible.
	pub threshold: f64,
	/// CSS margin applied to the viewport, e.g. `0px 0px -100px 0px`.
	pub root_margin: String,
}

/// A single visibility change delivered to an observer callback.
#[derive(Debug, Clone)]
pub struct IntersectionEntry<N> {
	/// The observer that produced the entry.
	pub observer: ObserverId,
	/// The observed element.
	pub target: N,
	/// Whether the element currently crosses the threshold.
	pub is_intersecting: bool,
}

/// Visibility observer callback.
pub type IntersectionCallback<N> = Rc<dyn Fn(&IntersectionEntry<N>)>;

/// Outcome callback for a background worker registration.
///
/// Receives the registration scope on success or the failure message.
pub type WorkerCallback = Box<dyn FnOnce(Result<String, String>)>;

/// The environment an enhancement runs against.
pub trait Host: 'static {
	/// Element handle.
	type Node: Clone + PartialEq + fmt::Debug + 'static;

	// Document

	/// Returns true while the document is still being parsed.
	fn is_loading(&self) -> bool;

	/// Returns true once the document and its subresources have loaded
	/// (`readyState == "complete"`); the window `load` event has fired.
	fn is_complete(&self) -> bool;

	/// Returns all elements matching `selector`, in document order.
	///
	/// An invalid selector yields an empty list.
	fn query_all(&self, selector: &str) -> Vec<Self::Node>;

	/// Returns the first element matching `selector`.
	fn query(&self, selector: &str) -> Option<Self::Node> {
		self.query_all(selector).into_iter().next()
	}

	/// Returns the first descendant of `scope` matching `selector`.
	fn query_within(&self, scope: &Self::Node, selector: &str) -> Option<Self::Node>;

	/// Looks an element up by its `id`.
	fn element_by_id(&self, id: &str) -> Option<Self::Node>;

	/// The `<html>` element.
	fn root_element(&self) -> Option<Self::Node>;

	/// The `<body>` element.
	fn body(&self) -> Option<Self::Node>;

	// Elements

	/// Reads an attribute.
	fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

	/// Writes an attribute.
	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;

	/// Returns the element's text content.
	fn text_content(&self, node: &Self::Node) -> Option<String>;

	/// Returns true if the element's class list contains `class`.
	fn has_class(&self, node: &Self::Node, class: &str) -> bool;

	/// Adds (`on = true`) or removes `class`.
	fn set_class(&self, node: &Self::Node, class: &str, on: bool) -> Result<(), HostError>;

	/// Sets an inline style property, including custom properties.
	fn set_style(&self, node: &Self::Node, property: &str, value: &str) -> Result<(), HostError>;

	/// `HTMLElement.offsetTop`
	fn offset_top(&self, node: &Self::Node) -> f64;

	/// `HTMLElement.offsetHeight`
	fn offset_height(&self, node: &Self::Node) -> f64;

	/// `HTMLImageElement.complete`; false for non-images.
	fn image_complete(&self, node: &Self::Node) -> bool;

	// Window

	/// `window.innerHeight`
	fn viewport_height(&self) -> f64;

	/// Scrolls the window to `top`.
	fn scroll_to(&self, top: f64, behavior: ScrollBehavior);

	/// Evaluates a media query; `None` when media queries are unavailable.
	fn match_media(&self, query: &str) -> Option<bool>;

	/// Returns true if visibility observers are available.
	fn supports_intersection(&self) -> bool;

	/// `location.hostname`
	fn hostname(&self) -> String;

	/// Returns true when the page was served over `https:`.
	fn is_secure(&self) -> bool;

	/// Milliseconds since navigation start.
	fn now(&self) -> f64;

	// Events

	/// Registers `handler` for `kind` events on `target`.
	fn listen(
		&self,
		target: Target<Self::Node>,
		kind: EventKind,
		handler: Handler,
	) -> Result<ListenerId, HostError>;

	/// Removes a listener. Unknown ids are ignored.
	fn unlisten(&self, id: ListenerId);

	// Timers

	/// Runs `callback` once after `delay_ms`.
	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Result<TimerId, HostError>;

	/// Cancels a pending timer. Fired or unknown ids are ignored.
	fn clear_timeout(&self, id: TimerId);

	// Visibility

	/// Starts observing `nodes`.
	fn observe(
		&self,
		nodes: &[Self::Node],
		options: &IntersectionOptions,
		callback: IntersectionCallback<Self::Node>,
	) -> Result<ObserverId, HostError>;

	/// Stops observing a single element.
	fn unobserve(&self, observer: ObserverId, node: &Self::Node);

	// Background worker

	/// Registers a service worker script; `done` receives the outcome.
	fn register_worker(&self, script: &str, done: WorkerCallback) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(EventKind::DomContentLoaded, "DOMContentLoaded")]
	#[case(EventKind::MouseEnter, "mouseenter")]
	#[case(EventKind::OrientationChange, "orientationchange")]
	#[case(EventKind::Change, "change")]
	fn test_event_kind_names(#[case] kind: EventKind, #[case] expected: &str) {
		assert_eq!(kind.as_str(), expected);
		assert_eq!(kind.to_string(), expected);
	}

	#[rstest]
	fn test_dom_event_prevent_default() {
		let event = DomEvent::new(EventKind::Click);
		assert!(!event.default_prevented());

		event.prevent_default();
		assert!(event.default_prevented());
	}

	#[rstest]
	fn test_dom_event_payload() {
		let key = DomEvent::new(EventKind::KeyDown).with_key("Tab");
		assert_eq!(key.key.as_deref(), Some("Tab"));
		assert_eq!(key.matches, None);

		let change = DomEvent::new(EventKind::Change).with_matches(true);
		assert_eq!(change.matches, Some(true));
	}
}

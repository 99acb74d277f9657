//! In-memory host for tests
//!
//! [`MockHost`] implements [`Host`] over a tiny element tree with a manual
//! clock, so every enhancement can be exercised natively and
//! deterministically. It supports the compound selectors the page contract
//! uses (`tag`, `.class`, `#id`, `[attr]`, `[attr="v"]`, `[attr^="v"]`); there
//! are no combinators.
//!
//! ```ignore
//! use folio_enhance::testing::{MockElement, MockHost};
//!
//! let host = MockHost::new();
//! let card = host.append_to_body(MockElement::new("div").class("project-card"));
//! host.advance(100);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use crate::error::HostError;
use crate::host::{
	DomEvent, EventKind, Handler, Host, IntersectionCallback, IntersectionEntry,
	IntersectionOptions, ListenerId, ObserverId, ScrollBehavior, Target, TimerId, WorkerCallback,
};

/// Handle to an element of a [`MockHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

/// Element description, used both as builder and as storage.
#[derive(Debug, Clone, Default)]
pub struct MockElement {
	tag: String,
	attributes: BTreeMap<String, String>,
	classes: Vec<String>,
	styles: BTreeMap<String, String>,
	text: Option<String>,
	offset_top: f64,
	offset_height: f64,
	complete: bool,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	attribute_writes: Vec<(String, String)>,
}

impl MockElement {
	/// Creates an element with the given tag name.
	pub fn new(tag: &str) -> Self {
		Self {
			tag: tag.to_ascii_lowercase(),
			..Self::default()
		}
	}

	/// Adds a class.
	pub fn class(mut self, class: &str) -> Self {
		self.classes.push(class.to_string());
		self
	}

	/// Sets the `id` attribute.
	pub fn id(self, id: &str) -> Self {
		self.attr("id", id)
	}

	/// Sets an attribute.
	pub fn attr(mut self, name: &str, value: &str) -> Self {
		self.attributes.insert(name.to_string(), value.to_string());
		self
	}

	/// Sets the text content.
	pub fn text(mut self, text: &str) -> Self {
		self.text = Some(text.to_string());
		self
	}

	/// Sets the layout box (`offsetTop`, `offsetHeight`).
	pub fn layout(mut self, offset_top: f64, offset_height: f64) -> Self {
		self.offset_top = offset_top;
		self.offset_height = offset_height;
		self
	}

	/// Marks an image as already loaded.
	pub fn complete(mut self) -> Self {
		self.complete = true;
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
	Present,
	Equals(String),
	Prefix(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Selector {
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
	attributes: Vec<(String, AttrMatch)>,
}

impl Selector {
	fn parse(input: &str) -> Option<Self> {
		let input = input.trim();
		if input.is_empty() || input.contains(char::is_whitespace) && !input.contains('[') {
			return None;
		}

		let mut selector = Self::default();
		let mut rest = input;

		let tag_len = rest
			.find(|c: char| matches!(c, '.' | '#' | '['))
			.unwrap_or(rest.len());
		if tag_len > 0 {
			selector.tag = Some(rest[..tag_len].to_ascii_lowercase());
			rest = &rest[tag_len..];
		}

		while let Some(c) = rest.chars().next() {
			match c {
				'.' | '#' => {
					let end = rest[1..]
						.find(|c: char| matches!(c, '.' | '#' | '['))
						.map(|i| i + 1)
						.unwrap_or(rest.len());
					let name = &rest[1..end];
					if name.is_empty() {
						return None;
					}
					if c == '.' {
						selector.classes.push(name.to_string());
					} else {
						selector.id = Some(name.to_string());
					}
					rest = &rest[end..];
				}
				'[' => {
					let end = rest.find(']')?;
					let body = &rest[1..end];
					selector.attributes.push(Self::parse_attribute(body)?);
					rest = &rest[end + 1..];
				}
				_ => return None,
			}
		}

		Some(selector)
	}

	fn parse_attribute(body: &str) -> Option<(String, AttrMatch)> {
		let unquote = |v: &str| v.trim().trim_matches('"').trim_matches('\'').to_string();
		if let Some((name, value)) = body.split_once("^=") {
			return Some((name.trim().to_string(), AttrMatch::Prefix(unquote(value))));
		}
		if let Some((name, value)) = body.split_once('=') {
			return Some((name.trim().to_string(), AttrMatch::Equals(unquote(value))));
		}
		let name = body.trim();
		(!name.is_empty()).then(|| (name.to_string(), AttrMatch::Present))
	}

	fn matches(&self, element: &MockElement) -> bool {
		if let Some(tag) = &self.tag
			&& *tag != element.tag
		{
			return false;
		}
		if let Some(id) = &self.id
			&& element.attributes.get("id") != Some(id)
		{
			return false;
		}
		if !self.classes.iter().all(|c| element.classes.contains(c)) {
			return false;
		}
		self.attributes.iter().all(|(name, rule)| {
			match (element.attributes.get(name), rule) {
				(None, _) => false,
				(Some(_), AttrMatch::Present) => true,
				(Some(v), AttrMatch::Equals(expected)) => v == expected,
				(Some(v), AttrMatch::Prefix(prefix)) => v.starts_with(prefix.as_str()),
			}
		})
	}
}

struct MockListener {
	target: Target<NodeId>,
	kind: EventKind,
	handler: Handler,
}

struct MockObserver {
	options: IntersectionOptions,
	targets: Vec<NodeId>,
	callback: IntersectionCallback<NodeId>,
}

/// Deterministic in-memory [`Host`].
pub struct MockHost {
	elements: RefCell<Vec<MockElement>>,
	listeners: RefCell<BTreeMap<ListenerId, MockListener>>,
	timers: RefCell<BTreeMap<(u64, TimerId), Box<dyn FnOnce()>>>,
	observers: RefCell<BTreeMap<ObserverId, MockObserver>>,
	media: RefCell<HashMap<String, bool>>,
	scrolls: RefCell<Vec<(f64, ScrollBehavior)>>,
	worker_scripts: RefCell<Vec<String>>,
	worker_outcome: RefCell<Result<String, String>>,
	hostname: RefCell<String>,
	next_id: Cell<u64>,
	clock_ms: Cell<u64>,
	viewport_height: Cell<f64>,
	loading: Cell<bool>,
	complete: Cell<bool>,
	worker_supported: Cell<bool>,
	frozen: RefCell<Vec<NodeId>>,
	secure: Cell<bool>,
	media_supported: Cell<bool>,
	intersection_supported: Cell<bool>,
	fail_styles: Cell<bool>,
}

impl Default for MockHost {
	fn default() -> Self {
		Self::new()
	}
}

impl MockHost {
	/// Creates a parsed document with an empty `<body>`, an 800px viewport,
	/// visibility observers and media queries available.
	pub fn new() -> Self {
		let mut root = MockElement::new("html");
		root.children.push(BODY);
		let mut body = MockElement::new("body");
		body.parent = Some(ROOT);

		Self {
			elements: RefCell::new(vec![root, body]),
			listeners: RefCell::new(BTreeMap::new()),
			timers: RefCell::new(BTreeMap::new()),
			observers: RefCell::new(BTreeMap::new()),
			media: RefCell::new(HashMap::new()),
			scrolls: RefCell::new(Vec::new()),
			worker_scripts: RefCell::new(Vec::new()),
			worker_outcome: RefCell::new(Ok("/".to_string())),
			hostname: RefCell::new("example.com".to_string()),
			next_id: Cell::new(1),
			clock_ms: Cell::new(0),
			viewport_height: Cell::new(800.0),
			loading: Cell::new(false),
			complete: Cell::new(false),
			worker_supported: Cell::new(true),
			frozen: RefCell::new(Vec::new()),
			secure: Cell::new(false),
			media_supported: Cell::new(true),
			intersection_supported: Cell::new(true),
			fail_styles: Cell::new(false),
		}
	}

	fn next_id(&self) -> u64 {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		id
	}

	// Document construction

	/// Appends `element` to `parent` and returns its handle.
	pub fn append(&self, parent: NodeId, mut element: MockElement) -> NodeId {
		let mut elements = self.elements.borrow_mut();
		let id = NodeId(elements.len());
		element.parent = Some(parent);
		elements.push(element);
		elements[parent.0].children.push(id);
		id
	}

	/// Appends `element` to `<body>`.
	pub fn append_to_body(&self, element: MockElement) -> NodeId {
		self.append(BODY, element)
	}

	// Environment switches

	/// Puts the document back into the `loading` ready state.
	pub fn set_loading(&self, loading: bool) {
		self.loading.set(loading);
	}

	/// Sets the host name reported by `location.hostname`.
	pub fn set_hostname(&self, hostname: &str) {
		*self.hostname.borrow_mut() = hostname.to_string();
	}

	/// Marks the document `complete`, as if `load` had already fired.
	pub fn set_complete(&self, complete: bool) {
		self.complete.set(complete);
	}

	/// Makes `navigator.serviceWorker` available (`true`) or absent.
	pub fn set_worker_supported(&self, supported: bool) {
		self.worker_supported.set(supported);
	}

	/// Makes every class write on `node` fail.
	pub fn freeze_classes(&self, node: NodeId) {
		self.frozen.borrow_mut().push(node);
	}

	/// Serves the page over `https:` (`true`) or `http:`.
	pub fn set_secure(&self, secure: bool) {
		self.secure.set(secure);
	}

	/// Sets the outcome of future worker registrations.
	pub fn set_worker_outcome(&self, outcome: Result<String, String>) {
		*self.worker_outcome.borrow_mut() = outcome;
	}

	/// Enables or disables visibility observers.
	pub fn set_intersection_supported(&self, supported: bool) {
		self.intersection_supported.set(supported);
	}

	/// Enables or disables media query evaluation.
	pub fn set_media_supported(&self, supported: bool) {
		self.media_supported.set(supported);
	}

	/// Sets a media query result without notifying listeners.
	pub fn set_media(&self, query: &str, matches: bool) {
		self.media.borrow_mut().insert(query.to_string(), matches);
	}

	/// Makes every style write fail.
	pub fn set_fail_styles(&self, fail: bool) {
		self.fail_styles.set(fail);
	}

	/// Sets `window.innerHeight` without dispatching any event.
	pub fn set_viewport_height(&self, height: f64) {
		self.viewport_height.set(height);
	}

	// Events

	/// Dispatches `event` to every listener registered for it on `target`.
	pub fn dispatch(&self, target: Target<NodeId>, event: DomEvent) -> DomEvent {
		let handlers: Vec<(ListenerId, Handler)> = self
			.listeners
			.borrow()
			.iter()
			.filter(|(_, l)| l.kind == event.kind && l.target == target)
			.map(|(id, l)| (*id, l.handler.clone()))
			.collect();
		for (id, handler) in handlers {
			// Listeners removed by an earlier handler of this dispatch are skipped.
			if !self.listeners.borrow().contains_key(&id) {
				continue;
			}
			handler(&event);
		}
		event
	}

	/// Clicks an element.
	pub fn click(&self, node: NodeId) -> DomEvent {
		self.dispatch(Target::Element(node), DomEvent::new(EventKind::Click))
	}

	/// Moves the pointer onto an element.
	pub fn mouse_enter(&self, node: NodeId) -> DomEvent {
		self.dispatch(Target::Element(node), DomEvent::new(EventKind::MouseEnter))
	}

	/// Presses a key anywhere in the document.
	pub fn key_down(&self, key: &str) -> DomEvent {
		self.dispatch(
			Target::Document,
			DomEvent::new(EventKind::KeyDown).with_key(key),
		)
	}

	/// Presses a pointer button anywhere in the document.
	pub fn mouse_down(&self) -> DomEvent {
		self.dispatch(Target::Document, DomEvent::new(EventKind::MouseDown))
	}

	/// Resizes the viewport and fires `resize`.
	pub fn resize(&self, height: f64) {
		self.viewport_height.set(height);
		self.dispatch(Target::Window, DomEvent::new(EventKind::Resize));
	}

	/// Rotates the device, changing the viewport height, and fires `orientationchange`.
	pub fn rotate(&self, height: f64) {
		self.viewport_height.set(height);
		self.dispatch(Target::Window, DomEvent::new(EventKind::OrientationChange));
	}

	/// Completes an image load.
	pub fn load_image(&self, node: NodeId) {
		self.elements.borrow_mut()[node.0].complete = true;
		self.dispatch(Target::Element(node), DomEvent::new(EventKind::Load));
	}

	/// Fails an image load.
	pub fn fail_image(&self, node: NodeId) {
		self.dispatch(Target::Element(node), DomEvent::new(EventKind::Error));
	}

	/// Finishes parsing and fires `DOMContentLoaded`.
	pub fn finish_parsing(&self) {
		self.loading.set(false);
		self.dispatch(
			Target::Document,
			DomEvent::new(EventKind::DomContentLoaded),
		);
	}

	/// Completes the document and fires the window `load` event.
	pub fn finish_loading(&self) {
		self.loading.set(false);
		self.complete.set(true);
		self.dispatch(Target::Window, DomEvent::new(EventKind::Load));
	}

	/// Changes a media query result and notifies its listeners.
	pub fn change_media(&self, query: &str, matches: bool) {
		self.set_media(query, matches);
		self.dispatch(
			Target::MediaQuery(query.to_string()),
			DomEvent::new(EventKind::Change).with_matches(matches),
		);
	}

	/// Number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	/// Number of listeners for `kind` on `target`.
	pub fn listeners_on(&self, target: &Target<NodeId>, kind: EventKind) -> usize {
		self.listeners
			.borrow()
			.values()
			.filter(|l| l.kind == kind && l.target == *target)
			.count()
	}

	// Timers

	/// Advances the clock by `ms`, running due timers in order.
	pub fn advance(&self, ms: u64) {
		let deadline = self.clock_ms.get() + ms;
		loop {
			let next = {
				let mut timers = self.timers.borrow_mut();
				match timers.keys().next().copied() {
					Some(key) if key.0 <= deadline => timers.remove(&key).map(|cb| (key.0, cb)),
					_ => None,
				}
			};
			match next {
				Some((due, callback)) => {
					self.clock_ms.set(due);
					callback();
				}
				None => break,
			}
		}
		self.clock_ms.set(deadline);
	}

	/// Number of timers not yet fired or cleared.
	pub fn pending_timers(&self) -> usize {
		self.timers.borrow().len()
	}

	// Visibility

	/// Reports `node` as (not) intersecting to every observer watching it.
	pub fn set_intersecting(&self, node: NodeId, is_intersecting: bool) {
		let callbacks: Vec<(ObserverId, IntersectionCallback<NodeId>)> = self
			.observers
			.borrow()
			.iter()
			.filter(|(_, o)| o.targets.contains(&node))
			.map(|(id, o)| (*id, o.callback.clone()))
			.collect();
		for (observer, callback) in callbacks {
			callback(&IntersectionEntry {
				observer,
				target: node,
				is_intersecting,
			});
		}
	}

	/// Number of observers currently watching `node`.
	pub fn observer_count(&self, node: NodeId) -> usize {
		self.observers
			.borrow()
			.values()
			.filter(|o| o.targets.contains(&node))
			.count()
	}

	/// Options of every registered observer.
	pub fn observer_options(&self) -> Vec<IntersectionOptions> {
		self.observers
			.borrow()
			.values()
			.map(|o| o.options.clone())
			.collect()
	}

	// Inspection

	/// Inline style value of `node`.
	pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
		self.elements.borrow()[node.0].styles.get(property).cloned()
	}

	/// Every value written to attribute `name` of `node`, in order.
	pub fn attribute_writes(&self, node: NodeId, name: &str) -> Vec<String> {
		self.elements.borrow()[node.0]
			.attribute_writes
			.iter()
			.filter(|(n, _)| n == name)
			.map(|(_, v)| v.clone())
			.collect()
	}

	/// Every scroll requested so far.
	pub fn scrolls(&self) -> Vec<(f64, ScrollBehavior)> {
		self.scrolls.borrow().clone()
	}

	/// Scripts passed to worker registration.
	pub fn worker_scripts(&self) -> Vec<String> {
		self.worker_scripts.borrow().clone()
	}

	fn descendants(&self, scope: NodeId, out: &mut Vec<NodeId>) {
		let children = self.elements.borrow()[scope.0].children.clone();
		for child in children {
			out.push(child);
			self.descendants(child, out);
		}
	}

	fn select(&self, scope: Option<NodeId>, selector: &str) -> Vec<NodeId> {
		let Some(selector) = Selector::parse(selector) else {
			return Vec::new();
		};
		let mut candidates = Vec::new();
		match scope {
			Some(scope) => self.descendants(scope, &mut candidates),
			None => {
				candidates.push(ROOT);
				self.descendants(ROOT, &mut candidates);
			}
		}
		let elements = self.elements.borrow();
		candidates
			.into_iter()
			.filter(|id| selector.matches(&elements[id.0]))
			.collect()
	}
}

impl Host for MockHost {
	type Node = NodeId;

	fn is_loading(&self) -> bool {
		self.loading.get()
	}

	fn is_complete(&self) -> bool {
		self.complete.get()
	}

	fn query_all(&self, selector: &str) -> Vec<NodeId> {
		self.select(None, selector)
	}

	fn query_within(&self, scope: &NodeId, selector: &str) -> Option<NodeId> {
		self.select(Some(*scope), selector).into_iter().next()
	}

	fn element_by_id(&self, id: &str) -> Option<NodeId> {
		let mut all = vec![ROOT];
		self.descendants(ROOT, &mut all);
		let elements = self.elements.borrow();
		all.into_iter()
			.find(|n| elements[n.0].attributes.get("id").map(String::as_str) == Some(id))
	}

	fn root_element(&self) -> Option<NodeId> {
		Some(ROOT)
	}

	fn body(&self) -> Option<NodeId> {
		Some(BODY)
	}

	fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
		self.elements.borrow()[node.0].attributes.get(name).cloned()
	}

	fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<(), HostError> {
		let mut elements = self.elements.borrow_mut();
		let element = &mut elements[node.0];
		element
			.attributes
			.insert(name.to_string(), value.to_string());
		element
			.attribute_writes
			.push((name.to_string(), value.to_string()));
		Ok(())
	}

	fn text_content(&self, node: &NodeId) -> Option<String> {
		self.elements.borrow()[node.0].text.clone()
	}

	fn has_class(&self, node: &NodeId, class: &str) -> bool {
		self.elements.borrow()[node.0]
			.classes
			.iter()
			.any(|c| c == class)
	}

	fn set_class(&self, node: &NodeId, class: &str, on: bool) -> Result<(), HostError> {
		if self.frozen.borrow().contains(node) {
			return Err(HostError::Js(format!("cannot toggle class `{class}`")));
		}
		let mut elements = self.elements.borrow_mut();
		let classes = &mut elements[node.0].classes;
		let present = classes.iter().any(|c| c == class);
		if on && !present {
			classes.push(class.to_string());
		} else if !on {
			classes.retain(|c| c != class);
		}
		Ok(())
	}

	fn set_style(&self, node: &NodeId, property: &str, value: &str) -> Result<(), HostError> {
		if self.fail_styles.get() {
			return Err(HostError::Js(format!("cannot set style `{property}`")));
		}
		self.elements.borrow_mut()[node.0]
			.styles
			.insert(property.to_string(), value.to_string());
		Ok(())
	}

	fn offset_top(&self, node: &NodeId) -> f64 {
		self.elements.borrow()[node.0].offset_top
	}

	fn offset_height(&self, node: &NodeId) -> f64 {
		self.elements.borrow()[node.0].offset_height
	}

	fn image_complete(&self, node: &NodeId) -> bool {
		let elements = self.elements.borrow();
		elements[node.0].tag == "img" && elements[node.0].complete
	}

	fn viewport_height(&self) -> f64 {
		self.viewport_height.get()
	}

	fn scroll_to(&self, top: f64, behavior: ScrollBehavior) {
		self.scrolls.borrow_mut().push((top, behavior));
	}

	fn match_media(&self, query: &str) -> Option<bool> {
		if !self.media_supported.get() {
			return None;
		}
		Some(self.media.borrow().get(query).copied().unwrap_or(false))
	}

	fn supports_intersection(&self) -> bool {
		self.intersection_supported.get()
	}

	fn hostname(&self) -> String {
		self.hostname.borrow().clone()
	}

	fn is_secure(&self) -> bool {
		self.secure.get()
	}

	fn now(&self) -> f64 {
		self.clock_ms.get() as f64
	}

	fn listen(
		&self,
		target: Target<NodeId>,
		kind: EventKind,
		handler: Handler,
	) -> Result<ListenerId, HostError> {
		if matches!(target, Target::MediaQuery(_)) && !self.media_supported.get() {
			return Err(HostError::Unsupported("matchMedia"));
		}
		let id = ListenerId(self.next_id());
		self.listeners.borrow_mut().insert(
			id,
			MockListener {
				target,
				kind,
				handler,
			},
		);
		Ok(id)
	}

	fn unlisten(&self, id: ListenerId) {
		self.listeners.borrow_mut().remove(&id);
	}

	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Result<TimerId, HostError> {
		let id = TimerId(self.next_id());
		let due = self.clock_ms.get() + u64::from(delay_ms);
		self.timers.borrow_mut().insert((due, id), callback);
		Ok(id)
	}

	fn clear_timeout(&self, id: TimerId) {
		self.timers.borrow_mut().retain(|(_, timer), _| *timer != id);
	}

	fn observe(
		&self,
		nodes: &[NodeId],
		options: &IntersectionOptions,
		callback: IntersectionCallback<NodeId>,
	) -> Result<ObserverId, HostError> {
		if !self.intersection_supported.get() {
			return Err(HostError::Unsupported("IntersectionObserver"));
		}
		let id = ObserverId(self.next_id());
		self.observers.borrow_mut().insert(
			id,
			MockObserver {
				options: options.clone(),
				targets: nodes.to_vec(),
				callback,
			},
		);
		Ok(id)
	}

	fn unobserve(&self, observer: ObserverId, node: &NodeId) {
		if let Some(o) = self.observers.borrow_mut().get_mut(&observer) {
			o.targets.retain(|t| t != node);
		}
	}

	fn register_worker(&self, script: &str, done: WorkerCallback) -> Result<(), HostError> {
		if !self.worker_supported.get() {
			return Err(HostError::Unsupported("serviceWorker"));
		}
		self.worker_scripts.borrow_mut().push(script.to_string());
		let outcome = self.worker_outcome.borrow().clone();
		done(outcome);
		Ok(())
	}
}

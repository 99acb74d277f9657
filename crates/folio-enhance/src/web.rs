//! Browser host
//!
//! [`WebHost`] implements [`Host`] over `web-sys`. Every listener, timer and
//! observer callback is a `Closure` owned by the host's registries, so it can
//! be detached later instead of being leaked with `forget()`.
//!
//! A closure that is detached while callbacks are still on the stack is parked
//! and only dropped once the outermost callback has returned.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use js_sys::{Array, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
	Document, Element, Event, EventTarget, HtmlElement, HtmlImageElement, IntersectionObserver,
	IntersectionObserverEntry, IntersectionObserverInit, KeyboardEvent, MediaQueryListEvent,
	ScrollToOptions, ServiceWorkerRegistration, Window,
};

use crate::error::HostError;
use crate::host::{
	DomEvent, EventKind, Handler, Host, IntersectionCallback, IntersectionEntry,
	IntersectionOptions, ListenerId, ObserverId, ScrollBehavior, Target, TimerId, WorkerCallback,
};
use crate::init::Enhancer;

type EventClosure = Closure<dyn FnMut(Event)>;
type TimerClosure = Closure<dyn FnMut()>;
type ObserverClosure = Closure<dyn FnMut(Array, IntersectionObserver)>;

struct Registration {
	target: EventTarget,
	kind: EventKind,
	closure: EventClosure,
}

struct PendingTimer {
	handle: i32,
	closure: TimerClosure,
}

struct Observation {
	observer: IntersectionObserver,
	_closure: ObserverClosure,
}

#[derive(Default)]
struct Parked {
	listeners: Vec<EventClosure>,
	timers: Vec<TimerClosure>,
}

struct WebInner {
	window: Window,
	document: Document,
	next_id: Cell<u64>,
	depth: Cell<usize>,
	listeners: RefCell<HashMap<ListenerId, Registration>>,
	timers: RefCell<HashMap<TimerId, PendingTimer>>,
	observers: RefCell<HashMap<ObserverId, Observation>>,
	parked: RefCell<Parked>,
}

impl WebInner {
	fn next_id(&self) -> u64 {
		let id = self.next_id.get() + 1;
		self.next_id.set(id);
		id
	}

	fn enter(self: &Rc<Self>) -> CallbackGuard {
		if self.depth.get() == 0 {
			self.release_parked();
		}
		self.depth.set(self.depth.get() + 1);
		CallbackGuard {
			inner: self.clone(),
		}
	}

	fn release_parked(&self) {
		let parked = std::mem::take(&mut *self.parked.borrow_mut());
		drop(parked);
	}

	fn finish_timer(&self, id: TimerId) {
		let finished = self.timers.borrow_mut().remove(&id);
		if let Some(timer) = finished {
			self.parked.borrow_mut().timers.push(timer.closure);
		}
	}
}

struct CallbackGuard {
	inner: Rc<WebInner>,
}

impl Drop for CallbackGuard {
	fn drop(&mut self) {
		self.inner.depth.set(self.inner.depth.get().saturating_sub(1));
	}
}

fn js_message(value: &JsValue) -> String {
	value
		.as_string()
		.or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
		.unwrap_or_else(|| format!("{value:?}"))
}

fn js_error(value: JsValue) -> HostError {
	HostError::Js(js_message(&value))
}

fn to_dom_event(kind: EventKind, event: &Event) -> DomEvent {
	let mut dom = DomEvent::new(kind);
	if let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() {
		dom = dom.with_key(keyboard.key());
	}
	if let Some(media) = event.dyn_ref::<MediaQueryListEvent>() {
		dom = dom.with_matches(media.matches());
	}
	dom
}

/// [`Host`] backed by the browser's `window` and `document`.
#[derive(Clone)]
pub struct WebHost {
	inner: Rc<WebInner>,
}

impl std::fmt::Debug for WebHost {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebHost")
			.field("listeners", &self.inner.listeners.borrow().len())
			.field("timers", &self.inner.timers.borrow().len())
			.field("observers", &self.inner.observers.borrow().len())
			.finish()
	}
}

impl WebHost {
	/// Binds to the global `window` and `document`.
	pub fn new() -> Result<Self, HostError> {
		let window = web_sys::window().ok_or(HostError::MissingGlobal("window"))?;
		let document = window.document().ok_or(HostError::MissingGlobal("document"))?;
		Ok(Self {
			inner: Rc::new(WebInner {
				window,
				document,
				next_id: Cell::new(0),
				depth: Cell::new(0),
				listeners: RefCell::new(HashMap::new()),
				timers: RefCell::new(HashMap::new()),
				observers: RefCell::new(HashMap::new()),
				parked: RefCell::new(Parked::default()),
			}),
		})
	}

	fn event_target(&self, target: Target<Element>) -> Result<EventTarget, HostError> {
		Ok(match target {
			Target::Document => self.inner.document.clone().into(),
			Target::Window => self.inner.window.clone().into(),
			Target::Element(element) => element.into(),
			Target::MediaQuery(query) => self
				.inner
				.window
				.match_media(&query)
				.map_err(js_error)?
				.ok_or(HostError::Unsupported("matchMedia"))?
				.into(),
		})
	}

	fn weak(&self) -> Weak<WebInner> {
		Rc::downgrade(&self.inner)
	}
}

impl Host for WebHost {
	type Node = Element;

	fn is_loading(&self) -> bool {
		self.inner.document.ready_state() == "loading"
	}

	fn is_complete(&self) -> bool {
		self.inner.document.ready_state() == "complete"
	}

	fn query_all(&self, selector: &str) -> Vec<Element> {
		let Ok(list) = self.inner.document.query_selector_all(selector) else {
			return Vec::new();
		};
		(0..list.length())
			.filter_map(|i| list.item(i))
			.filter_map(|node| node.dyn_into::<Element>().ok())
			.collect()
	}

	fn query(&self, selector: &str) -> Option<Element> {
		self.inner.document.query_selector(selector).ok().flatten()
	}

	fn query_within(&self, scope: &Element, selector: &str) -> Option<Element> {
		scope.query_selector(selector).ok().flatten()
	}

	fn element_by_id(&self, id: &str) -> Option<Element> {
		self.inner.document.get_element_by_id(id)
	}

	fn root_element(&self) -> Option<Element> {
		self.inner.document.document_element()
	}

	fn body(&self) -> Option<Element> {
		self.inner.document.body().map(Into::into)
	}

	fn attribute(&self, node: &Element, name: &str) -> Option<String> {
		node.get_attribute(name)
	}

	fn set_attribute(&self, node: &Element, name: &str, value: &str) -> Result<(), HostError> {
		node.set_attribute(name, value).map_err(js_error)
	}

	fn text_content(&self, node: &Element) -> Option<String> {
		node.text_content()
	}

	fn has_class(&self, node: &Element, class: &str) -> bool {
		node.class_list().contains(class)
	}

	fn set_class(&self, node: &Element, class: &str, on: bool) -> Result<(), HostError> {
		node.class_list()
			.toggle_with_force(class, on)
			.map(|_| ())
			.map_err(js_error)
	}

	fn set_style(&self, node: &Element, property: &str, value: &str) -> Result<(), HostError> {
		let element = node
			.dyn_ref::<HtmlElement>()
			.ok_or(HostError::Unsupported("inline style on non-HTML element"))?;
		element.style().set_property(property, value).map_err(js_error)
	}

	fn offset_top(&self, node: &Element) -> f64 {
		node.dyn_ref::<HtmlElement>()
			.map_or(0.0, |e| f64::from(e.offset_top()))
	}

	fn offset_height(&self, node: &Element) -> f64 {
		node.dyn_ref::<HtmlElement>()
			.map_or(0.0, |e| f64::from(e.offset_height()))
	}

	fn image_complete(&self, node: &Element) -> bool {
		node.dyn_ref::<HtmlImageElement>()
			.is_some_and(HtmlImageElement::complete)
	}

	fn viewport_height(&self) -> f64 {
		self.inner
			.window
			.inner_height()
			.ok()
			.and_then(|h| h.as_f64())
			.unwrap_or(0.0)
	}

	fn scroll_to(&self, top: f64, behavior: ScrollBehavior) {
		let options = ScrollToOptions::new();
		options.set_top(top);
		options.set_behavior(match behavior {
			ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
			ScrollBehavior::Instant => web_sys::ScrollBehavior::Instant,
		});
		self.inner.window.scroll_to_with_scroll_to_options(&options);
	}

	fn match_media(&self, query: &str) -> Option<bool> {
		self.inner
			.window
			.match_media(query)
			.ok()
			.flatten()
			.map(|list| list.matches())
	}

	fn supports_intersection(&self) -> bool {
		Reflect::has(&self.inner.window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
	}

	fn hostname(&self) -> String {
		self.inner.window.location().hostname().unwrap_or_default()
	}

	fn is_secure(&self) -> bool {
		self.inner
			.window
			.location()
			.protocol()
			.is_ok_and(|p| p == "https:")
	}

	fn now(&self) -> f64 {
		self.inner
			.window
			.performance()
			.map_or_else(js_sys::Date::now, |p| p.now())
	}

	fn listen(
		&self,
		target: Target<Element>,
		kind: EventKind,
		handler: Handler,
	) -> Result<ListenerId, HostError> {
		let target = self.event_target(target)?;
		let weak = self.weak();
		let closure = Closure::wrap(Box::new(move |event: Event| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			let _guard = inner.enter();
			let dom = to_dom_event(kind, &event);
			handler(&dom);
			if dom.default_prevented() {
				event.prevent_default();
			}
		}) as Box<dyn FnMut(Event)>);

		target
			.add_event_listener_with_callback(kind.as_str(), closure.as_ref().unchecked_ref())
			.map_err(js_error)?;

		let id = ListenerId(self.inner.next_id());
		self.inner.listeners.borrow_mut().insert(
			id,
			Registration {
				target,
				kind,
				closure,
			},
		);
		Ok(id)
	}

	fn unlisten(&self, id: ListenerId) {
		let removed = self.inner.listeners.borrow_mut().remove(&id);
		let Some(registration) = removed else {
			return;
		};
		let _ = registration.target.remove_event_listener_with_callback(
			registration.kind.as_str(),
			registration.closure.as_ref().unchecked_ref(),
		);
		self.inner
			.parked
			.borrow_mut()
			.listeners
			.push(registration.closure);
	}

	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Result<TimerId, HostError> {
		let id = TimerId(self.inner.next_id());
		let weak = self.weak();
		let mut callback = Some(callback);
		let closure = Closure::wrap(Box::new(move || {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			let _guard = inner.enter();
			inner.finish_timer(id);
			if let Some(callback) = callback.take() {
				callback();
			}
		}) as Box<dyn FnMut()>);

		let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
		let handle = self
			.inner
			.window
			.set_timeout_with_callback_and_timeout_and_arguments_0(
				closure.as_ref().unchecked_ref(),
				delay,
			)
			.map_err(js_error)?;

		self.inner
			.timers
			.borrow_mut()
			.insert(id, PendingTimer { handle, closure });
		Ok(id)
	}

	fn clear_timeout(&self, id: TimerId) {
		let removed = self.inner.timers.borrow_mut().remove(&id);
		if let Some(timer) = removed {
			self.inner.window.clear_timeout_with_handle(timer.handle);
			self.inner.parked.borrow_mut().timers.push(timer.closure);
		}
	}

	fn observe(
		&self,
		nodes: &[Element],
		options: &IntersectionOptions,
		callback: IntersectionCallback<Element>,
	) -> Result<ObserverId, HostError> {
		if !self.supports_intersection() {
			return Err(HostError::Unsupported("IntersectionObserver"));
		}

		let id = ObserverId(self.inner.next_id());
		let weak = self.weak();
		let closure = Closure::wrap(Box::new(move |entries: Array, _observer: IntersectionObserver| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			let _guard = inner.enter();
			for entry in entries.iter() {
				let entry: IntersectionObserverEntry = entry.unchecked_into();
				callback(&IntersectionEntry {
					observer: id,
					target: entry.target(),
					is_intersecting: entry.is_intersecting(),
				});
			}
		}) as Box<dyn FnMut(Array, IntersectionObserver)>);

		let init = IntersectionObserverInit::new();
		init.set_threshold(&JsValue::from_f64(options.threshold));
		init.set_root_margin(&options.root_margin);
		let observer = IntersectionObserver::new_with_options(closure.as_ref().unchecked_ref(), &init)
			.map_err(js_error)?;
		for node in nodes {
			observer.observe(node);
		}

		self.inner.observers.borrow_mut().insert(
			id,
			Observation {
				observer,
				_closure: closure,
			},
		);
		Ok(id)
	}

	fn unobserve(&self, observer: ObserverId, node: &Element) {
		if let Some(observation) = self.inner.observers.borrow().get(&observer) {
			observation.observer.unobserve(node);
		}
	}

	fn register_worker(&self, script: &str, done: WorkerCallback) -> Result<(), HostError> {
		let navigator = self.inner.window.navigator();
		if !Reflect::has(&navigator, &JsValue::from_str("serviceWorker")).unwrap_or(false) {
			return Err(HostError::Unsupported("serviceWorker"));
		}

		let promise = navigator.service_worker().register(script);
		wasm_bindgen_futures::spawn_local(async move {
			match JsFuture::from(promise).await {
				Ok(registration) => {
					let registration: ServiceWorkerRegistration = registration.unchecked_into();
					done(Ok(registration.scope()));
				}
				Err(err) => done(Err(js_message(&err))),
			}
		});
		Ok(())
	}
}

/// Starts enhancing the current page.
///
/// The returned enhancer lives as long as the page holds its listeners.
pub fn launch() -> Result<Rc<Enhancer<WebHost>>, HostError> {
	let host = Rc::new(WebHost::new()?);
	Ok(crate::init::launch(host))
}

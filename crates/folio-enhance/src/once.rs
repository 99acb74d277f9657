//! One-shot event handlers
//!
//! A [`OneShot`] arms one or more listeners that share a single action. The
//! first event on any of them runs the action, moves the machine from
//! [`OneShotState::Armed`] to [`OneShotState::Fired`] and deregisters every
//! listener of the group. Image load/error pairs use this to make the two
//! terminal states mutually exclusive.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::HostError;
use crate::host::{DomEvent, EventKind, Host, ListenerId, Target};

/// Lifecycle of a [`OneShot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneShotState {
	/// Waiting for the first event.
	Armed,
	/// The action ran; listeners are gone.
	Fired,
}

type Action = Box<dyn FnOnce(&DomEvent)>;

/// A group of listeners that fires its action at most once.
pub struct OneShot<H: Host> {
	host: Rc<H>,
	state: Cell<OneShotState>,
	listeners: RefCell<Vec<ListenerId>>,
	action: RefCell<Option<Action>>,
}

impl<H: Host> std::fmt::Debug for OneShot<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OneShot")
			.field("state", &self.state.get())
			.field("listeners", &self.listeners.borrow().len())
			.finish()
	}
}

impl<H: Host> OneShot<H> {
	/// Arms `action` on every `(target, kind)` pair.
	///
	/// If registering any listener fails, the ones already registered are
	/// removed and the error is returned.
	pub fn arm<F>(
		host: &Rc<H>,
		triggers: Vec<(Target<H::Node>, EventKind)>,
		action: F,
	) -> Result<Rc<Self>, HostError>
	where
		F: FnOnce(&DomEvent) + 'static,
	{
		let once = Rc::new(Self {
			host: host.clone(),
			state: Cell::new(OneShotState::Armed),
			listeners: RefCell::new(Vec::with_capacity(triggers.len())),
			action: RefCell::new(Some(Box::new(action))),
		});

		for (target, kind) in triggers {
			let handle = once.clone();
			match host.listen(target, kind, Rc::new(move |event| handle.fire(event))) {
				Ok(id) => once.listeners.borrow_mut().push(id),
				Err(err) => {
					once.disarm();
					return Err(err);
				}
			}
		}

		Ok(once)
	}

	/// Arms a single listener.
	pub fn arm_single<F>(
		host: &Rc<H>,
		target: Target<H::Node>,
		kind: EventKind,
		action: F,
	) -> Result<Rc<Self>, HostError>
	where
		F: FnOnce(&DomEvent) + 'static,
	{
		Self::arm(host, vec![(target, kind)], action)
	}

	/// Current state.
	pub fn state(&self) -> OneShotState {
		self.state.get()
	}

	/// Returns true once the action ran or the group was disarmed.
	pub fn is_fired(&self) -> bool {
		self.state.get() == OneShotState::Fired
	}

	fn fire(&self, event: &DomEvent) {
		if self.is_fired() {
			return;
		}
		self.disarm();
		let action = self.action.borrow_mut().take();
		if let Some(action) = action {
			action(event);
		}
	}

	/// Transitions to `Fired` without running the action.
	pub fn disarm(&self) {
		self.state.set(OneShotState::Fired);
		for id in self.listeners.borrow_mut().drain(..) {
			self.host.unlisten(id);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockElement, MockHost};
	use rstest::rstest;

	#[rstest]
	fn test_fires_once_and_deregisters() {
		let host = Rc::new(MockHost::new());
		let link = host.append_to_body(MockElement::new("a"));
		let hits = Rc::new(Cell::new(0));
		let counter = hits.clone();

		let once = OneShot::arm_single(&host, Target::Element(link), EventKind::MouseEnter, move |_| {
			counter.set(counter.get() + 1)
		})
		.unwrap();
		assert_eq!(once.state(), OneShotState::Armed);
		assert_eq!(host.listener_count(), 1);

		host.mouse_enter(link);
		host.mouse_enter(link);

		assert_eq!(hits.get(), 1);
		assert_eq!(once.state(), OneShotState::Fired);
		assert_eq!(host.listener_count(), 0);
	}

	#[rstest]
	fn test_group_is_mutually_exclusive() {
		let host = Rc::new(MockHost::new());
		let img = host.append_to_body(MockElement::new("img"));
		let seen = Rc::new(RefCell::new(Vec::new()));
		let log = seen.clone();

		let once = OneShot::arm(
			&host,
			vec![
				(Target::Element(img), EventKind::Load),
				(Target::Element(img), EventKind::Error),
			],
			move |event| log.borrow_mut().push(event.kind),
		)
		.unwrap();
		assert_eq!(host.listener_count(), 2);

		host.fail_image(img);
		host.load_image(img);

		assert_eq!(*seen.borrow(), vec![EventKind::Error]);
		assert!(once.is_fired());
		assert_eq!(host.listener_count(), 0);
	}

	#[rstest]
	fn test_disarm_skips_action() {
		let host = Rc::new(MockHost::new());
		let hits = Rc::new(Cell::new(0));
		let counter = hits.clone();

		let once = OneShot::arm_single(&host, Target::Window, EventKind::Load, move |_| {
			counter.set(counter.get() + 1)
		})
		.unwrap();
		once.disarm();
		host.finish_loading();

		assert_eq!(hits.get(), 0);
		assert_eq!(host.listener_count(), 0);
	}

	#[rstest]
	fn test_failed_registration_rolls_back() {
		let host = Rc::new(MockHost::new());
		host.set_media_supported(false);

		let result = OneShot::arm(
			&host,
			vec![
				(Target::Window, EventKind::Load),
				(Target::MediaQuery("(min-width: 1px)".to_string()), EventKind::Change),
			],
			|_| {},
		);

		assert!(result.is_err());
		assert_eq!(host.listener_count(), 0);
	}
}

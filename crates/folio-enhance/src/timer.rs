//! Cancellable timers
//!
//! [`CancellableTimer`] wraps the host's `setTimeout` with two scheduling
//! policies:
//!
//! - [`TimerPolicy::Debounce`]: scheduling cancels whatever is pending, so only
//!   the last call of a burst runs (trailing edge). Used for `resize`.
//! - [`TimerPolicy::Independent`]: every call runs on its own. Used for
//!   `orientationchange`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::HostError;
use crate::host::{Host, TimerId};

/// How [`CancellableTimer::schedule`] treats timers that are still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPolicy {
	/// Cancel pending timers before scheduling.
	Debounce,
	/// Leave pending timers alone.
	Independent,
}

/// Host timer with `schedule`/`cancel`.
pub struct CancellableTimer<H: Host> {
	host: Rc<H>,
	policy: TimerPolicy,
	pending: Rc<RefCell<Vec<TimerId>>>,
}

impl<H: Host> std::fmt::Debug for CancellableTimer<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CancellableTimer")
			.field("policy", &self.policy)
			.field("pending", &self.pending.borrow().len())
			.finish()
	}
}

impl<H: Host> CancellableTimer<H> {
	/// Creates a timer with the given policy.
	pub fn new(host: Rc<H>, policy: TimerPolicy) -> Self {
		Self {
			host,
			policy,
			pending: Rc::new(RefCell::new(Vec::new())),
		}
	}

	/// Trailing-edge debouncer.
	pub fn debounce(host: Rc<H>) -> Self {
		Self::new(host, TimerPolicy::Debounce)
	}

	/// Timer whose schedules never cancel each other.
	pub fn independent(host: Rc<H>) -> Self {
		Self::new(host, TimerPolicy::Independent)
	}

	/// The scheduling policy.
	pub fn policy(&self) -> TimerPolicy {
		self.policy
	}

	/// Runs `f` after `delay_ms`, applying the policy first.
	pub fn schedule<F>(&self, delay_ms: u32, f: F) -> Result<TimerId, HostError>
	where
		F: FnOnce() + 'static,
	{
		if self.policy == TimerPolicy::Debounce {
			self.cancel();
		}

		// The id is only known after scheduling; the callback reads it from here.
		let slot: Rc<RefCell<Option<TimerId>>> = Rc::new(RefCell::new(None));
		let pending = self.pending.clone();
		let own_id = slot.clone();
		let id = self.host.set_timeout(
			delay_ms,
			Box::new(move || {
				if let Some(id) = *own_id.borrow() {
					pending.borrow_mut().retain(|p| *p != id);
				}
				f();
			}),
		)?;
		*slot.borrow_mut() = Some(id);
		self.pending.borrow_mut().push(id);
		Ok(id)
	}

	/// Cancels every pending timer.
	pub fn cancel(&self) {
		let pending: Vec<TimerId> = self.pending.borrow_mut().drain(..).collect();
		for id in pending {
			self.host.clear_timeout(id);
		}
	}

	/// Number of scheduled callbacks that have not run yet.
	pub fn pending(&self) -> usize {
		self.pending.borrow().len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockHost;
	use rstest::rstest;
	use std::cell::Cell;

	fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Box<dyn FnOnce()>) {
		let hits = Rc::new(Cell::new(0));
		let handle = hits.clone();
		(hits, move || {
			let hits = handle.clone();
			Box::new(move || hits.set(hits.get() + 1)) as Box<dyn FnOnce()>
		})
	}

	#[rstest]
	fn test_debounce_runs_only_last_of_burst() {
		let host = Rc::new(MockHost::new());
		let timer = CancellableTimer::debounce(host.clone());
		let (hits, make) = counter();

		for _ in 0..5 {
			timer.schedule(100, make()).unwrap();
			host.advance(20);
		}
		assert_eq!(timer.pending(), 1);
		assert_eq!(hits.get(), 0);

		host.advance(100);
		assert_eq!(hits.get(), 1);
		assert_eq!(timer.pending(), 0);
		assert_eq!(host.pending_timers(), 0);
	}

	#[rstest]
	fn test_independent_runs_every_schedule() {
		let host = Rc::new(MockHost::new());
		let timer = CancellableTimer::independent(host.clone());
		let (hits, make) = counter();

		timer.schedule(100, make()).unwrap();
		host.advance(50);
		timer.schedule(100, make()).unwrap();
		assert_eq!(timer.pending(), 2);

		host.advance(50);
		assert_eq!(hits.get(), 1);
		host.advance(50);
		assert_eq!(hits.get(), 2);
		assert_eq!(timer.pending(), 0);
	}

	#[rstest]
	#[case(TimerPolicy::Debounce)]
	#[case(TimerPolicy::Independent)]
	fn test_cancel_clears_pending(#[case] policy: TimerPolicy) {
		let host = Rc::new(MockHost::new());
		let timer = CancellableTimer::new(host.clone(), policy);
		let (hits, make) = counter();

		timer.schedule(100, make()).unwrap();
		timer.cancel();
		host.advance(200);

		assert_eq!(hits.get(), 0);
		assert_eq!(timer.pending(), 0);
		assert_eq!(timer.policy(), policy);
	}
}

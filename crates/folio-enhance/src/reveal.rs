//! Visibility-triggered entrance animations
//!
//! Every element carrying the `data-animate` marker starts `pending` and
//! becomes `revealed` (gains the `animate-in` class) exactly once. Two
//! strategies implement the transition:
//!
//! - [`LazyReveal`] watches the elements with a visibility observer and
//!   reveals each one when it first crosses the threshold, then stops
//!   watching it.
//! - [`ImmediateReveal`] reveals everything synchronously; it is the fallback
//!   when the environment has no visibility observer.
//!
//! [`select_strategy`] checks the host once and picks between them.
//!
//! Project cards additionally get a staggered `transition-delay`, see
//! [`stagger_cards`].

use std::rc::Rc;
use std::time::Duration;

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::{Host, IntersectionOptions};
use crate::warn_log;

/// Lifecycle of an animated element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
	/// Not yet shown.
	Pending,
	/// Entrance animation triggered.
	Revealed,
}

/// Reads the state of `node` from its class list.
pub fn reveal_state<H: Host>(host: &H, node: &H::Node, class: &str) -> RevealState {
	if host.has_class(node, class) {
		RevealState::Revealed
	} else {
		RevealState::Pending
	}
}

/// Moves `node` from `pending` to `revealed`.
///
/// Returns `true` only when the transition happened; revealing an element a
/// second time is a no-op.
pub fn reveal<H: Host>(host: &H, node: &H::Node, class: &str) -> EnhanceResult<bool> {
	if reveal_state(host, node, class) == RevealState::Revealed {
		return Ok(false);
	}
	host.set_class(node, class, true)?;
	Ok(true)
}

/// A way of turning pending elements into revealed ones.
pub trait RevealStrategy<H: Host> {
	/// Short name used in logs.
	fn name(&self) -> &'static str;

	/// Takes responsibility for revealing `nodes`.
	fn attach(&self, host: &Rc<H>, config: &EnhanceConfig, nodes: Vec<H::Node>) -> EnhanceResult<()>;
}

/// Reveals elements as they scroll into view.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyReveal;

impl LazyReveal {
	/// Observer options derived from the configuration.
	pub fn options(config: &EnhanceConfig) -> IntersectionOptions {
		IntersectionOptions {
			threshold: config.reveal.threshold,
			root_margin: config.reveal.root_margin(),
		}
	}
}

impl<H: Host> RevealStrategy<H> for LazyReveal {
	fn name(&self) -> &'static str {
		"lazy"
	}

	fn attach(&self, host: &Rc<H>, config: &EnhanceConfig, nodes: Vec<H::Node>) -> EnhanceResult<()> {
		if nodes.is_empty() {
			return Ok(());
		}

		let class = config.classes.revealed.clone();
		let observer_host = host.clone();
		host.observe(
			&nodes,
			&Self::options(config),
			Rc::new(move |entry| {
				if !entry.is_intersecting {
					return;
				}
				if let Err(err) = reveal(observer_host.as_ref(), &entry.target, &class) {
					warn_log!("Failed to reveal element: {}", err);
				}
				observer_host.unobserve(entry.observer, &entry.target);
			}),
		)?;
		Ok(())
	}
}

/// Reveals every element right away.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateReveal;

impl<H: Host> RevealStrategy<H> for ImmediateReveal {
	fn name(&self) -> &'static str {
		"immediate"
	}

	fn attach(&self, host: &Rc<H>, config: &EnhanceConfig, nodes: Vec<H::Node>) -> EnhanceResult<()> {
		// One element refusing the class must not leave the rest hidden.
		let mut first_error = None;
		for node in &nodes {
			if let Err(err) = reveal(host.as_ref(), node, &config.classes.revealed) {
				warn_log!("Failed to reveal element: {}", err);
				first_error.get_or_insert(err);
			}
		}
		match first_error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}

/// Picks [`LazyReveal`] when visibility observers exist, else [`ImmediateReveal`].
pub fn select_strategy<H: Host>(host: &H) -> Box<dyn RevealStrategy<H>> {
	if host.supports_intersection() {
		Box::new(LazyReveal)
	} else {
		Box::new(ImmediateReveal)
	}
}

/// Reveals every marked element immediately, regardless of visibility.
///
/// Returns the number of elements that changed state.
pub fn reveal_all<H: Host>(host: &H, config: &EnhanceConfig) -> EnhanceResult<usize> {
	let mut revealed = 0;
	for node in host.query_all(&config.selectors.animate) {
		if reveal(host, &node, &config.classes.revealed)? {
			revealed += 1;
		}
	}
	Ok(revealed)
}

/// Hands every still-pending marked element to the selected strategy.
///
/// Elements already revealed (e.g. by reduced-motion compliance) are skipped
/// so no observer is attached to them. Returns the number of elements handed
/// over.
pub fn watch_animations<H: Host>(host: &Rc<H>, config: &EnhanceConfig) -> EnhanceResult<usize> {
	let pending: Vec<H::Node> = host
		.query_all(&config.selectors.animate)
		.into_iter()
		.filter(|node| {
			reveal_state(host.as_ref(), node, &config.classes.revealed) == RevealState::Pending
		})
		.collect();
	let count = pending.len();

	let strategy = select_strategy(host.as_ref());
	crate::debug_log!(
		"Revealing {} element(s) with the {} strategy",
		count,
		strategy.name()
	);
	strategy.attach(host, config, pending)?;
	Ok(count)
}

/// Delay of the card at `index`, saturating at [`Duration::MAX`].
pub fn stagger_delay(index: usize, step: Duration) -> Duration {
	step.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

/// Formats a duration as CSS seconds (`0.3s`).
///
/// Divides the whole nanosecond count once, so `2.7s` never prints as
/// `2.6999999999999997s`.
pub fn css_seconds(delay: Duration) -> String {
	format!("{}s", delay.as_nanos() as f64 / 1e9)
}

/// Applies `transition-delay: index × step` to every project card.
///
/// Returns the number of cards.
pub fn stagger_cards<H: Host>(host: &H, config: &EnhanceConfig) -> EnhanceResult<usize> {
	let step = config.reveal.stagger_step();
	let cards = host.query_all(&config.selectors.project_card);
	for (index, card) in cards.iter().enumerate() {
		host.set_style(card, "transition-delay", &css_seconds(stagger_delay(index, step)))?;
	}
	Ok(cards.len())
}

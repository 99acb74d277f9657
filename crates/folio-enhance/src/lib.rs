//! Folio Enhance - progressive enhancement for a static portfolio page
//!
//! The page is complete without this crate. Once loaded, it layers behavior on
//! top of the server-rendered markup: scroll-triggered reveals, smooth fragment
//! navigation, image load marking, external link hardening, keyboard focus
//! styling and a stable viewport height unit.
//!
//! ## Architecture
//!
//! - [`host`]: the [`Host`] trait every enhancement talks to
//! - [`web`]: the browser host, built on wasm-bindgen and web-sys (wasm32 only)
//! - [`testing`]: an in-memory host for native tests
//! - [`state`]: document-level state and its projection onto classes and styles
//! - [`once`] / [`timer`]: one-shot listeners and cancellable timers
//! - [`init`]: the [`Enhancer`] that runs every step in order
//!
//! Each enhancement lives in its own module: [`motion`], [`reveal`],
//! [`anchor`], [`images`], [`links`], [`keyboard`], [`viewport`] and
//! [`worker`].
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use folio_enhance::{Enhancer, EnhanceConfig, web::WebHost};
//!
//! let host = Rc::new(WebHost::new()?);
//! let enhancer = Enhancer::new(host, EnhanceConfig::default())?;
//! enhancer.start()?;
//! ```

#![warn(missing_docs)]

pub mod anchor;
pub mod config;
pub mod error;
pub mod host;
pub mod images;
pub mod init;
pub mod keyboard;
pub mod links;
pub mod logging;
pub mod motion;
pub mod once;
pub mod reveal;
pub mod state;
pub mod timer;
pub mod viewport;
pub mod worker;

// In-memory host, usable from downstream tests
pub mod testing;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[doc(hidden)]
pub mod __private {
	pub use tracing;
	#[cfg(target_arch = "wasm32")]
	pub use web_sys;
}

pub use anchor::{AnchorOutcome, scroll_target, wire_smooth_scroll};
pub use config::{
	CONFIG_ELEMENT_ID, ClassNames, EnhanceConfig, MAX_STAGGER_STEP_MS, RevealSettings, Selectors,
	ViewportSettings, WorkerSettings,
};
pub use error::{EnhanceError, EnhanceResult, HostError};
pub use host::{DomEvent, EventKind, Host, ScrollBehavior, Target};
pub use init::{Enhancer, StartPhase, StartupReport, Step, StepRecord, launch, load_config};
pub use once::{OneShot, OneShotState};
pub use reveal::{ImmediateReveal, LazyReveal, RevealState, RevealStrategy};
pub use state::{AppState, SharedState};
pub use timer::{CancellableTimer, TimerPolicy};
pub use worker::{LoadTiming, WorkerRegistration};

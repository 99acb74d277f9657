//! Image load marking and hover preloading

use std::rc::Rc;

use crate::config::EnhanceConfig;
use crate::error::EnhanceResult;
use crate::host::{EventKind, Host, Target};
use crate::once::OneShot;
use crate::warn_log;

/// Outcome of [`optimize_images`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSummary {
	/// Images already complete and marked `loaded`.
	pub already_loaded: usize,
	/// Images waiting for `load`/`error`.
	pub armed: usize,
}

/// Marks every project image `loaded` or `error`.
///
/// Complete images are marked right away. The others get a one-shot
/// load/error pair: whichever fires first marks the image and disarms the
/// other, so the two classes never coexist. Failures are logged, never
/// retried.
pub fn optimize_images<H: Host>(host: &Rc<H>, config: &Rc<EnhanceConfig>) -> EnhanceResult<ImageSummary> {
	let mut summary = ImageSummary::default();

	for image in host.query_all(&config.selectors.project_image) {
		if host.image_complete(&image) {
			host.set_class(&image, &config.classes.loaded, true)?;
			summary.already_loaded += 1;
			continue;
		}

		let handler_host = host.clone();
		let handler_config = config.clone();
		let handler_image = image.clone();
		OneShot::arm(
			host,
			vec![
				(Target::Element(image.clone()), EventKind::Load),
				(Target::Element(image), EventKind::Error),
			],
			move |event| {
				let class = if event.kind == EventKind::Load {
					&handler_config.classes.loaded
				} else {
					let src = handler_host.attribute(&handler_image, "src");
					warn_log!("Failed to load image: {}", src.as_deref().unwrap_or("<no src>"));
					&handler_config.classes.error
				};
				if let Err(err) = handler_host.set_class(&handler_image, class, true) {
					warn_log!("Failed to mark image: {}", err);
				}
			},
		)?;
		summary.armed += 1;
	}

	Ok(summary)
}

/// Restarts an image by clearing and restoring its `src`.
///
/// Returns `false` when the image has no `src`.
pub fn force_reload<H: Host>(host: &H, image: &H::Node) -> EnhanceResult<bool> {
	let Some(src) = host.attribute(image, "src") else {
		return Ok(false);
	};
	host.set_attribute(image, "src", "")?;
	host.set_attribute(image, "src", &src)?;
	Ok(true)
}

/// Warms the animated image of each project link on its first hover.
///
/// Only links that contain an animated image are wired. Returns that number.
pub fn wire_hover_preload<H: Host>(host: &Rc<H>, config: &EnhanceConfig) -> EnhanceResult<usize> {
	let mut wired = 0;

	for link in host.query_all(&config.selectors.project_link) {
		let Some(image) = host.query_within(&link, &config.selectors.animated_image) else {
			continue;
		};

		let handler_host = host.clone();
		OneShot::arm_single(host, Target::Element(link), EventKind::MouseEnter, move |_| {
			if let Err(err) = force_reload(handler_host.as_ref(), &image) {
				warn_log!("Failed to preload animated image: {}", err);
			}
		})?;
		wired += 1;
	}

	Ok(wired)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockElement, MockHost};
	use rstest::{fixture, rstest};

	#[fixture]
	fn host() -> Rc<MockHost> {
		Rc::new(MockHost::new())
	}

	#[fixture]
	fn config() -> Rc<EnhanceConfig> {
		Rc::new(EnhanceConfig::default())
	}

	#[rstest]
	fn test_complete_image_is_marked_immediately(host: Rc<MockHost>, config: Rc<EnhanceConfig>) {
		let img = host.append_to_body(
			MockElement::new("img")
				.class("project-image")
				.attr("src", "/a.png")
				.complete(),
		);

		let summary = optimize_images(&host, &config).unwrap();

		assert_eq!(summary, ImageSummary { already_loaded: 1, armed: 0 });
		assert!(host.has_class(&img, "loaded"));
		assert_eq!(host.listener_count(), 0);
	}

	#[rstest]
	fn test_load_then_error_keeps_loaded(host: Rc<MockHost>, config: Rc<EnhanceConfig>) {
		let img = host.append_to_body(MockElement::new("img").class("project-image"));

		let summary = optimize_images(&host, &config).unwrap();
		assert_eq!(summary.armed, 1);

		host.load_image(img);
		host.fail_image(img);

		assert!(host.has_class(&img, "loaded"));
		assert!(!host.has_class(&img, "error"));
		assert_eq!(host.listener_count(), 0);
	}

	#[rstest]
	fn test_error_marks_without_retry(host: Rc<MockHost>, config: Rc<EnhanceConfig>) {
		let img = host.append_to_body(
			MockElement::new("img")
				.class("project-image")
				.attr("src", "/broken.png"),
		);
		optimize_images(&host, &config).unwrap();

		host.fail_image(img);
		host.load_image(img);

		assert!(host.has_class(&img, "error"));
		assert!(!host.has_class(&img, "loaded"));
		assert!(host.attribute_writes(img, "src").is_empty());
	}

	#[rstest]
	fn test_hover_preload_reloads_once(host: Rc<MockHost>, config: Rc<EnhanceConfig>) {
		let link = host.append_to_body(MockElement::new("a").class("project-link"));
		let gif = host.append(
			link,
			MockElement::new("img")
				.class("animated-image")
				.attr("src", "/demo.gif"),
		);

		assert_eq!(wire_hover_preload(&host, &config).unwrap(), 1);
		host.mouse_enter(link);
		host.mouse_enter(link);

		assert_eq!(host.attribute_writes(gif, "src"), vec!["", "/demo.gif"]);
		assert_eq!(host.attribute(&gif, "src").as_deref(), Some("/demo.gif"));
	}

	#[rstest]
	fn test_links_without_animated_image_are_skipped(host: Rc<MockHost>, config: Rc<EnhanceConfig>) {
		let link = host.append_to_body(MockElement::new("a").class("project-link"));
		host.append(link, MockElement::new("img").attr("src", "/still.png"));

		assert_eq!(wire_hover_preload(&host, &config).unwrap(), 0);
		assert_eq!(host.listener_count(), 0);
	}

	#[rstest]
	fn test_force_reload_without_src(host: Rc<MockHost>) {
		let img = host.append_to_body(MockElement::new("img"));
		assert!(!force_reload(host.as_ref(), &img).unwrap());
		assert!(host.attribute_writes(img, "src").is_empty());
	}
}
